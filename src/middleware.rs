use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::{Instrument, info_span};

/// Header name for request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest inbound request id that is trusted as-is
const MAX_INBOUND_ID_LEN: usize = 128;

/// Middleware that assigns a request id, runs the request inside a span
/// carrying it, and echoes it in the response headers.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = extract_or_generate_request_id(request.headers());

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), header_value);
    }

    response
}

pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Reuse a well-formed inbound request id (from a load balancer) or mint one.
pub fn extract_or_generate_request_id(headers: &HeaderMap) -> String {
    if let Some(request_id) = headers.get(REQUEST_ID_HEADER)
        && let Ok(id) = request_id.to_str()
        && !id.is_empty()
        && id.len() <= MAX_INBOUND_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return id.to_string();
    }

    generate_request_id()
}
