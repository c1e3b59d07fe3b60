use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use edge_gate::{config::GatewayConfig, start_server_with_config};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Edge authentication gateway for the admin front end
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML configuration file; EDGE_GATE_* variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override server.host
    #[arg(long)]
    host: Option<String>,

    /// Override server.port
    #[arg(short, long)]
    port: Option<u16>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let mut config = GatewayConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    start_server_with_config(config, shutdown_rx).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested, stopping server...");

    let _ = shutdown_tx.send(());
    // Grace period for in-flight requests to finish
    tokio::time::sleep(Duration::from_millis(200)).await;

    Ok(())
}
