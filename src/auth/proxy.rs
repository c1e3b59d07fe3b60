// Credential Proxy
// Forwards login credentials to the identity service and relays its answer

use std::time::Duration;

use axum::http::StatusCode;
use reqwest::redirect::Policy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use super::cookie::{self, SetCookie};
use super::error::GatewayError;

/// Login form submitted by the browser and forwarded unchanged in shape.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub identifier: String,
    pub secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remember_me: Option<bool>,
}

// Keep the secret out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .field("remember_me", &self.remember_me)
            .finish()
    }
}

/// A successful exchange: the upstream 2xx status and body plus the cookies it set.
#[derive(Debug, Clone)]
pub struct LoginSuccess {
    pub status: StatusCode,
    pub body: Value,
    pub cookies: Vec<SetCookie>,
}

/// Client for the identity service login endpoint.
///
/// Holds one pooled `reqwest::Client`; clone freely across requests.
#[derive(Debug, Clone)]
pub struct CredentialProxy {
    client: reqwest::Client,
    login_url: Url,
}

impl CredentialProxy {
    pub fn new(login_url: Url, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|e| GatewayError::UpstreamUnreachable(e.to_string()))?;

        Ok(Self { client, login_url })
    }

    pub fn login_url(&self) -> &Url {
        &self.login_url
    }

    /// One round trip to the identity service. Never retries.
    ///
    /// Cookies are only returned on a 2xx with a JSON body; every failure
    /// path carries no session material.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginSuccess, GatewayError> {
        let response = self
            .client
            .post(self.login_url.clone())
            .json(credentials)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, timeout = e.is_timeout(), "identity service request failed");
                GatewayError::from(e)
            })?;

        let status = response.status();
        let cookies = cookie::from_upstream(response.headers());
        let bytes = response.bytes().await.map_err(|e| {
            warn!(error = %e, "failed to read identity service response");
            GatewayError::from(e)
        })?;

        if !status.is_success() {
            info!(
                status = status.as_u16(),
                identifier = %credentials.identifier,
                "identity service rejected login"
            );
            return Err(GatewayError::rejected(status, &bytes));
        }

        let body: Value = serde_json::from_slice(&bytes).map_err(|e| {
            warn!(error = %e, "identity service returned non-JSON success body");
            GatewayError::UpstreamMalformed(e.to_string())
        })?;

        info!(
            status = status.as_u16(),
            identifier = %credentials.identifier,
            cookies = cookies.len(),
            "login accepted by identity service"
        );

        Ok(LoginSuccess {
            status,
            body,
            cookies,
        })
    }
}
