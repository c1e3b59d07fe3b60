#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    extract::State,
    http::{HeaderValue, Request, Response, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use edge_gate::auth::{GatewayState, Identity};
use edge_gate::config::GatewayConfig;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use tokio::sync::{Mutex, oneshot};

/// Signing secret of the fake identity service. The gateway never sees it.
pub const ISSUER_SECRET: &[u8] = b"identity-service-signing-secret";

/// Set-Cookie emitted by the mock identity service on a good login
pub const UPSTREAM_SET_COOKIE: &str =
    "sess=xyz; Path=/; Expires=Wed, 21 Oct 2026 07:28:00 GMT; HttpOnly; Secure; SameSite=Lax";

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Mint a signed token the way the identity service would.
pub fn mint_token(claims: &Value) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(ISSUER_SECRET),
    )
    .expect("token should encode")
}

pub fn admin_token(expires_at: i64) -> String {
    mint_token(&json!({
        "sub": "user-1",
        "role": "ADMIN",
        "permissions": ["A", "B"],
        "iat": now(),
        "exp": expires_at,
        "jti": "tok-1",
    }))
}

pub fn valid_token() -> String {
    admin_token(now() + 3600)
}

pub fn expired_token() -> String {
    admin_token(now() - 60)
}

/// Fake identity service. Behaviour is keyed on the submitted identifier.
#[derive(Clone)]
pub struct MockUpstream {
    pub port: u16,
    hits: Arc<AtomicUsize>,
    last_body: Arc<Mutex<Option<Value>>>,
    shutdown_tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

#[derive(Clone)]
struct UpstreamState {
    hits: Arc<AtomicUsize>,
    last_body: Arc<Mutex<Option<Value>>>,
}

impl MockUpstream {
    pub async fn start() -> anyhow::Result<Self> {
        let hits = Arc::new(AtomicUsize::new(0));
        let last_body = Arc::new(Mutex::new(None));
        let state = UpstreamState {
            hits: Arc::clone(&hits),
            last_body: Arc::clone(&last_body),
        };

        let app = Router::new()
            .route("/auth/login", post(handle_login))
            .with_state(state);

        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed to start");
        });

        Ok(Self {
            port,
            hits,
            last_body,
            shutdown_tx: Arc::new(Mutex::new(Some(shutdown_tx))),
        })
    }

    pub fn login_url(&self) -> String {
        format!("http://127.0.0.1:{}/auth/login", self.port)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub async fn last_body(&self) -> Option<Value> {
        self.last_body.lock().await.clone()
    }

    pub async fn shutdown(self) {
        if let Some(tx) = self.shutdown_tx.lock().await.take() {
            let _ = tx.send(());
        }
    }
}

async fn handle_login(State(state): State<UpstreamState>, body: String) -> Response<Body> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    *state.last_body.lock().await = Some(parsed.clone());

    let identifier = parsed
        .get("identifier")
        .and_then(Value::as_str)
        .unwrap_or_default();

    match identifier {
        "good" => (
            [(header::SET_COOKIE, HeaderValue::from_static(UPSTREAM_SET_COOKIE))],
            Json(json!({"token": "abc"})),
        )
            .into_response(),
        "created" => (
            StatusCode::CREATED,
            [(header::SET_COOKIE, HeaderValue::from_static("sess=new; HttpOnly"))],
            Json(json!({"token": "fresh", "firstLogin": true})),
        )
            .into_response(),
        "two-cookies" => {
            let mut response = Json(json!({"token": "abc"})).into_response();
            let headers = response.headers_mut();
            headers.append(header::SET_COOKIE, HeaderValue::from_static("sess=xyz; HttpOnly"));
            headers.append(
                header::SET_COOKIE,
                HeaderValue::from_static("csrf=k1;Path=/;SameSite=Strict"),
            );
            response
        }
        "bad" => (
            StatusCode::UNAUTHORIZED,
            [(header::SET_COOKIE, HeaderValue::from_static("sess=leak; HttpOnly"))],
            Json(json!({"message": "bad credentials"})),
        )
            .into_response(),
        "invalid-fields" => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"message": "validation failed", "errors": {"secret": "too short"}})),
        )
            .into_response(),
        "html-error" => (StatusCode::BAD_GATEWAY, "<html>upstream down</html>").into_response(),
        "not-json" => (
            [(header::SET_COOKIE, HeaderValue::from_static("sess=xyz; HttpOnly"))],
            "plain text welcome",
        )
            .into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(json!({"token": "late"})).into_response()
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "unknown user"})),
        )
            .into_response(),
    }
}

pub fn test_config(login_url: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.upstream.login_url = login_url.to_string();
    config.upstream.timeout_ms = 1_000;
    config.session.cookie_name = "sess".to_string();
    config
}

pub fn gateway_state(config: GatewayConfig) -> Arc<GatewayState> {
    Arc::new(GatewayState::from_config(config).expect("test config should be valid"))
}

/// Counts how often guarded pages were actually reached.
#[derive(Clone, Default)]
pub struct PageHits(pub Arc<AtomicUsize>);

impl PageHits {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

async fn page(State(hits): State<PageHits>, identity: Identity) -> Json<Value> {
    hits.0.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "page": true,
        "subject": identity.subject(),
        "role": identity.role(),
    }))
}

/// Stand-in front end: a handful of pages across every route class.
pub fn pages(hits: PageHits) -> Router {
    Router::new()
        .route("/", get(page))
        .route("/about", get(page))
        .route("/login", get(page))
        .route("/register", get(page))
        .route("/dashboard", get(page))
        .route("/dashboard/users", get(page))
        .route("/vehicles/{id}", get(page))
        .route("/api/resources", get(page))
        .with_state(hits)
}

pub fn app_with_pages(state: Arc<GatewayState>) -> (Router, PageHits) {
    let hits = PageHits::default();
    let app = edge_gate::build_app_with_pages(state, pages(hits.clone()));
    (app, hits)
}

pub fn get_request(path: &str, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(path);
    if let Some(token) = session {
        builder = builder.header(header::COOKIE, format!("theme=dark; sess={token}"));
    }
    builder.body(Body::empty()).expect("request should build")
}

pub fn json_request(method: &str, path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().expect("ascii cookie").to_string())
        .collect()
}

/// A local port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local addr").port()
}
