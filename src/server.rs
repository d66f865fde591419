use crate::api;
use crate::config::AppConfig;
use crate::telemetry::TelemetrySink;
use axum::Router;
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Routes owned by the host; manifest assets may not shadow them.
pub const RESERVED_ROUTES: &[&str] = &[
    "/healthz",
    "/whatsapp",
    "/api/widget/config",
    "/api/widget/manifest",
    "/api/widget/events",
];

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub asset_paths: Arc<Vec<String>>,
    pub telemetry: Arc<dyn TelemetrySink>,
}

impl AppState {
    pub fn new(config: AppConfig, telemetry: Arc<dyn TelemetrySink>) -> Self {
        let asset_paths = config
            .manifest
            .routable_frontend_assets(RESERVED_ROUTES)
            .unwrap_or_else(|err| {
                tracing::warn!(%err, "ignoring manifest frontend bundle");
                Vec::new()
            });
        Self {
            config: Arc::new(config),
            asset_paths: Arc::new(asset_paths),
            telemetry,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/healthz", get(api::healthz))
        .route("/whatsapp", get(api::open_whatsapp))
        .route("/api/widget/config", get(api::get_widget_config))
        .route("/api/widget/manifest", get(api::get_manifest))
        .route("/api/widget/events", post(api::post_events));
    for path in state.asset_paths.iter() {
        router = router.route(path, get(api::serve_asset));
    }
    let mut router = router
        .fallback(api::serve_page)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());
    if state.config.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }
    router.with_state(state)
}

pub async fn run(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(?err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
