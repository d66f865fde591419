mod api;
mod assets;
mod config;
mod deeplink;
mod manifest;
mod pages;
mod server;
mod telemetry;
mod widget;

use crate::config::AppConfig;
use crate::server::AppState;
use crate::telemetry::TracingTelemetrySink;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = AppConfig::from_env()?;
    let telemetry: Arc<dyn crate::telemetry::TelemetrySink> = Arc::new(TracingTelemetrySink);

    let addr: SocketAddr = config.bind_addr;
    tracing::info!(
        %addr,
        site_root = %config.site_root.display(),
        position = %config.widget.position,
        enabled = config.widget.validate().is_ok(),
        "starting whatsapp-widget server"
    );
    let state = AppState::new(config, telemetry);
    server::run(addr, state).await?;
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
