// Gateway Configuration
// Loaded once at startup from defaults, an optional TOML file and the environment

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::auth::classifier::{Route, RouteClass, RouteTable};

/// Prefix for environment overrides, e.g. `EDGE_GATE_UPSTREAM__LOGIN_URL`.
pub const ENV_PREFIX: &str = "EDGE_GATE_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid configuration value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    fn invalid(key: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Top-level gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub session: SessionConfig,
    pub routes: RoutesConfig,
    pub frontend: FrontendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Identity service the login endpoint forwards to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Absolute URL of the identity service login endpoint
    pub login_url: String,

    /// Bound on the whole upstream round trip
    pub timeout_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            login_url: "http://127.0.0.1:8080/api/auth/login".to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the cookie the identity service sets. The gateway only reads and clears it.
    pub cookie_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "session".to_string(),
        }
    }
}

/// Route classification table. Patterns are globs over the normalized path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutesConfig {
    pub login_path: String,
    pub home_path: String,
    pub excluded: Vec<String>,
    pub auth_only: Vec<String>,
    pub protected: Vec<String>,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            home_path: "/dashboard".to_string(),
            excluded: strings(&[
                "/_next/**",
                "/static/**",
                "/assets/**",
                "/api",
                "/api/**",
                "/favicon.ico",
                "/robots.txt",
                "/*.{css,js,map,png,jpg,jpeg,gif,svg,ico,webp,woff,woff2,ttf}",
            ]),
            auth_only: strings(&["/login", "/login/**", "/register", "/register/**"]),
            protected: strings(&[
                "/dashboard",
                "/dashboard/**",
                "/admin",
                "/admin/**",
                "/users",
                "/users/**",
                "/roles",
                "/roles/**",
                "/organizations",
                "/organizations/**",
                "/devices",
                "/devices/**",
                "/vehicles",
                "/vehicles/**",
                "/subscriptions",
                "/subscriptions/**",
            ]),
        }
    }
}

/// Built front-end assets served behind the guard
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendConfig {
    pub root: Option<PathBuf>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl GatewayConfig {
    /// Layer defaults, the optional TOML file and `EDGE_GATE_*` variables, then validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(GatewayConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: GatewayConfig = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let login_url = Url::parse(&self.upstream.login_url)
            .map_err(|e| ConfigError::invalid("upstream.login_url", e.to_string()))?;
        if !matches!(login_url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "upstream.login_url",
                "must start with http:// or https://",
            ));
        }

        if !(100..=60_000).contains(&self.upstream.timeout_ms) {
            return Err(ConfigError::invalid(
                "upstream.timeout_ms",
                "must be between 100 and 60000",
            ));
        }

        let name = &self.session.cookie_name;
        if name.is_empty()
            || name
                .chars()
                .any(|c| c.is_whitespace() || c.is_control() || ";,=\"".contains(c))
        {
            return Err(ConfigError::invalid(
                "session.cookie_name",
                "must be a non-empty cookie token",
            ));
        }

        for (key, path) in [
            ("routes.login_path", &self.routes.login_path),
            ("routes.home_path", &self.routes.home_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::invalid(key, "must be an absolute path"));
            }
        }

        let table = RouteTable::from_config(&self.routes)
            .map_err(|e| ConfigError::invalid("routes", e.to_string()))?;

        // A login page that itself requires a session, or a home page that
        // rejects one, would redirect forever.
        if table.classify(&self.routes.login_path) == Route::Classified(RouteClass::Protected) {
            return Err(ConfigError::invalid(
                "routes.login_path",
                "must not be a protected route",
            ));
        }
        if table.classify(&self.routes.home_path) == Route::Classified(RouteClass::AuthOnly) {
            return Err(ConfigError::invalid(
                "routes.home_path",
                "must not be an auth-only route",
            ));
        }

        Ok(())
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream.timeout_ms)
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
