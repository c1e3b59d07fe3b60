// Gateway Error Types
// Failures surfaced by the login and logout endpoints

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

/// Message returned whenever the identity service cannot be reached.
pub const UNAVAILABLE_MESSAGE: &str = "Authentication service unavailable";

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The identity service answered with a non-2xx status. The body is relayed.
    #[error("identity service rejected the request with status {status}")]
    UpstreamRejected { status: StatusCode, body: Value },

    /// Transport failure or timeout. The detail is for logs only.
    #[error("identity service unreachable: {0}")]
    UpstreamUnreachable(String),

    /// A 2xx answer whose body was not JSON.
    #[error("identity service returned an unreadable response: {0}")]
    UpstreamMalformed(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    /// Build the relayed error for a non-2xx upstream response.
    ///
    /// JSON objects pass through untouched so field-level detail survives;
    /// anything else is replaced by a synthesized message.
    pub fn rejected(status: StatusCode, body: &[u8]) -> Self {
        let body = match serde_json::from_slice::<Value>(body) {
            Ok(value @ Value::Object(_)) => value,
            _ => json!({ "message": format!("Backend error: {}", status.as_u16()) }),
        };
        GatewayError::UpstreamRejected { status, body }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::UpstreamRejected { status, .. } => *status,
            GatewayError::UpstreamUnreachable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::UpstreamMalformed(_) => StatusCode::BAD_GATEWAY,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn body(self) -> Value {
        match self {
            GatewayError::UpstreamRejected { body, .. } => body,
            GatewayError::UpstreamUnreachable(_) => json!({ "message": UNAVAILABLE_MESSAGE }),
            GatewayError::UpstreamMalformed(_) => {
                json!({ "message": "Invalid response from authentication service" })
            }
            GatewayError::InvalidRequest(_) => json!({ "message": "Invalid login request" }),
        }
    }
}

// Conversion from reqwest errors
impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::UpstreamUnreachable("request timed out".to_string())
        } else {
            GatewayError::UpstreamUnreachable(err.to_string())
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self.body())).into_response()
    }
}
