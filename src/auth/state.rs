use anyhow::Context;
use url::Url;

use super::classifier::RouteTable;
use super::proxy::CredentialProxy;
use crate::config::GatewayConfig;

/// Read-only state shared by every request.
#[derive(Debug, Clone)]
pub struct GatewayState {
    pub config: GatewayConfig,
    pub routes: RouteTable,
    pub proxy: CredentialProxy,
}

impl GatewayState {
    pub fn from_config(config: GatewayConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let routes = RouteTable::from_config(&config.routes).context("building route table")?;
        let login_url =
            Url::parse(&config.upstream.login_url).context("parsing upstream login url")?;
        let proxy = CredentialProxy::new(login_url, config.upstream_timeout())
            .context("building identity service client")?;

        Ok(Self {
            config,
            routes,
            proxy,
        })
    }

    pub fn cookie_name(&self) -> &str {
        &self.config.session.cookie_name
    }
}
