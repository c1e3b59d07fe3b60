/// Route Guard Middleware
///
/// Classifies every request, resolves the caller's identity from the session
/// cookie and either forwards the request or redirects it.
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{Uri, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use super::classifier::{Decision, Route, decide, normalize_path};
use super::cookie;
use super::state::GatewayState;
use super::token::{self, Claims};

/// Caller identity as seen by downstream handlers.
///
/// Inserted into request extensions by [`route_guard`] for every request,
/// anonymous or not.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    claims: Option<Claims>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_claims(claims: Claims) -> Self {
        Self {
            claims: Some(claims),
        }
    }

    /// Resolve from the raw session cookie value, if any.
    pub fn from_session(raw: Option<&str>) -> Self {
        Self {
            claims: raw.and_then(token::decode),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.claims.is_some()
    }

    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }

    pub fn subject(&self) -> Option<&str> {
        self.claims.as_ref().map(Claims::subject)
    }

    pub fn role(&self) -> Option<&str> {
        self.claims.as_ref().and_then(Claims::role)
    }

    pub fn permissions(&self) -> &[String] {
        self.claims.as_ref().map(Claims::permissions).unwrap_or(&[])
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.claims
            .as_ref()
            .is_some_and(|c| c.has_permission(permission))
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Identity>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Login page URL carrying the requested path and query.
///
/// The path is normalized first, so the return target always starts with a
/// single `/` and can never name another host.
pub fn login_redirect_target(login_path: &str, original: &Uri) -> String {
    let mut target = normalize_path(original.path());
    if let Some(query) = original.query() {
        target.push('?');
        target.push_str(query);
    }
    format!("{}?returnUrl={}", login_path, urlencoding::encode(&target))
}

/// Guard applied in front of every route.
pub async fn route_guard(
    State(state): State<Arc<GatewayState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let raw = cookie::read(req.headers(), state.cookie_name());
    let identity = Identity::from_session(raw.as_deref());
    let authenticated = identity.is_authenticated();
    req.extensions_mut().insert(identity);

    let class = match state.routes.classify(req.uri().path()) {
        Route::Excluded => return next.run(req).await,
        Route::Classified(class) => class,
    };

    match decide(class, authenticated) {
        Decision::PassThrough => next.run(req).await,
        Decision::RedirectHome => {
            debug!(path = %req.uri().path(), ?class, "signed-in caller sent home");
            Redirect::temporary(&state.config.routes.home_path).into_response()
        }
        Decision::RedirectLogin => {
            let target = login_redirect_target(&state.config.routes.login_path, req.uri());
            debug!(
                path = %req.uri().path(),
                pattern = state.routes.matched_pattern(req.uri().path()),
                had_cookie = raw.is_some(),
                "missing session, redirecting to login"
            );
            Redirect::temporary(&target).into_response()
        }
    }
}
