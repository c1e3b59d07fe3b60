/// Authentication Routes
///
/// Login proxy, logout and session status endpoints mounted under `/api/auth`.
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Serialize;
use tracing::{debug, info};

use super::cookie;
use super::error::GatewayError;
use super::middleware::Identity;
use super::proxy::Credentials;
use super::state::GatewayState;

/// JSON view of the caller's identity for the browser
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub permissions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl From<&Identity> for SessionStatus {
    fn from(identity: &Identity) -> Self {
        Self {
            authenticated: identity.is_authenticated(),
            subject: identity.subject().map(str::to_string),
            role: identity.role().map(str::to_string),
            permissions: identity.permissions().to_vec(),
            expires_at: identity.claims().map(|c| c.expires_at()),
        }
    }
}

/// Forward credentials to the identity service and relay its answer.
async fn login(
    State(state): State<Arc<GatewayState>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, GatewayError> {
    let Json(credentials) = payload.map_err(|e| {
        debug!(error = %e, "rejected login payload");
        GatewayError::InvalidRequest(e.body_text())
    })?;

    if credentials.identifier.trim().is_empty() || credentials.secret.is_empty() {
        return Err(GatewayError::InvalidRequest(
            "identifier and secret are required".to_string(),
        ));
    }

    let success = state.proxy.login(&credentials).await?;

    let mut response = (success.status, Json(success.body)).into_response();
    cookie::write(response.headers_mut(), &success.cookies);
    Ok(response)
}

/// Clear the session cookie and send the browser to the login page.
async fn logout(State(state): State<Arc<GatewayState>>, identity: Identity) -> Response {
    match identity.subject() {
        Some(subject) => info!(subject, "session cleared"),
        None => debug!("logout without an active session"),
    }

    let mut response = Redirect::to(&state.config.routes.login_path).into_response();
    cookie::clear(response.headers_mut(), state.cookie_name());
    response
}

async fn session_status(identity: Identity) -> Json<SessionStatus> {
    Json(SessionStatus::from(&identity))
}

/// Create authentication router with all routes
pub fn create_auth_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(session_status))
        .with_state(state)
}
