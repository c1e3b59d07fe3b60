// Session Token Codec
// Reads identity claims out of the upstream-issued session token

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::Deserialize;
use tracing::debug;

/// Payload segments are base64url; issuers disagree on padding, so accept both.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Identity claims carried in the session token payload.
///
/// The signature segment is never checked. The token arrives in a cookie set by
/// the identity service over the backend channel, and its claims are trusted as
/// issued.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Claims {
    #[serde(rename = "sub")]
    subject: String,

    #[serde(default)]
    role: Option<String>,

    #[serde(default)]
    permissions: Vec<String>,

    #[serde(rename = "iat", default)]
    issued_at: Option<i64>,

    #[serde(rename = "exp")]
    expires_at: i64,

    #[serde(rename = "jti", default)]
    token_id: Option<String>,
}

impl Claims {
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    pub fn issued_at(&self) -> Option<i64> {
        self.issued_at
    }

    /// Expiry in epoch seconds. The token is usable while `now < expires_at`.
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// Revocation bookkeeping id; not enforced by the gateway.
    pub fn token_id(&self) -> Option<&str> {
        self.token_id.as_deref()
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

/// Why a raw token was treated as absent. Only used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    Malformed,
    BadEncoding,
    BadClaims,
    Expired,
}

/// Decode a raw session token against the current wall clock.
pub fn decode(raw: &str) -> Option<Claims> {
    decode_at(raw, chrono::Utc::now().timestamp())
}

/// Decode a raw session token as of `now` (epoch seconds).
///
/// Every failure collapses to `None`: structure, encoding, missing claims and
/// expiry are indistinguishable to callers.
pub fn decode_at(raw: &str, now: i64) -> Option<Claims> {
    match inspect(raw, now) {
        Ok(claims) => Some(claims),
        Err(reason) => {
            debug!(?reason, "session token treated as absent");
            None
        }
    }
}

fn inspect(raw: &str, now: i64) -> Result<Claims, TokenRejection> {
    let payload = payload_segment(raw.trim()).ok_or(TokenRejection::Malformed)?;

    let bytes = PAYLOAD_ENGINE
        .decode(payload)
        .map_err(|_| TokenRejection::BadEncoding)?;

    let claims: Claims =
        serde_json::from_slice(&bytes).map_err(|_| TokenRejection::BadClaims)?;

    if claims.subject.is_empty() {
        return Err(TokenRejection::BadClaims);
    }

    if claims.is_expired_at(now) {
        return Err(TokenRejection::Expired);
    }

    Ok(claims)
}

/// Returns the middle segment of a `header.payload.signature` token.
fn payload_segment(raw: &str) -> Option<&str> {
    let mut parts = raw.split('.');
    let header = parts.next()?;
    let payload = parts.next()?;
    let signature = parts.next()?;

    if parts.next().is_some() || header.is_empty() || payload.is_empty() || signature.is_empty()
    {
        return None;
    }

    Some(payload)
}

/// Role claim of a raw token, if the token is usable.
pub fn role(raw: &str) -> Option<String> {
    decode(raw).and_then(|c| c.role)
}

/// Permission claims of a raw token; empty when the token is unusable.
pub fn permissions(raw: &str) -> Vec<String> {
    decode(raw).map(|c| c.permissions).unwrap_or_default()
}

/// Subject claim of a raw token, if the token is usable.
pub fn subject(raw: &str) -> Option<String> {
    decode(raw).map(|c| c.subject)
}
