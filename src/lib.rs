use std::sync::Arc;

use axum::{
    Json, Router,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

pub mod auth;
pub mod config;
pub mod middleware;

use auth::{GatewayState, create_auth_router, route_guard};

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "Not found" })))
}

/// Builds the gateway router with no front-end pages of its own.
pub fn build_app(state: Arc<GatewayState>) -> Router {
    build_app_with_pages(state, Router::new())
}

/// Builds the gateway router around `pages`, the front end being guarded.
///
/// Requests no route matches fall through to the configured static root, or a
/// JSON 404 when none is set. Every request, matched or not, passes the route
/// guard first.
pub fn build_app_with_pages(state: Arc<GatewayState>, pages: Router) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .nest("/api/auth", create_auth_router(Arc::clone(&state)))
        .merge(pages);

    let router = match &state.config.frontend.root {
        Some(root) => router.fallback_service(ServeDir::new(root)),
        None => router.fallback(not_found),
    };

    router
        .layer(from_fn_with_state(Arc::clone(&state), route_guard))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(middleware::request_id_middleware))
}

/// Binds the configured address and serves until `shutdown_rx` fires.
///
/// Returns the bound port, which matters when the configured port is 0.
pub async fn start_server_with_config(
    config: config::GatewayConfig,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> anyhow::Result<u16> {
    let addr = config.server_addr();
    let state = Arc::new(GatewayState::from_config(config)?);
    let app = build_app(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let port = listener.local_addr()?.port();

    info!(
        %addr,
        port,
        upstream = %state.proxy.login_url(),
        "edge gateway listening"
    );

    tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await;

        if let Err(e) = result {
            tracing::error!(error = %e, "gateway server stopped with error");
        } else {
            info!("gateway server stopped");
        }
    });

    Ok(port)
}
