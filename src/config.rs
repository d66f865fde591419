use crate::manifest::ModuleManifest;
use crate::server::RESERVED_ROUTES;
use crate::widget::{Position, WidgetConfig};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::warn;

/// Runtime configuration for the widget host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub site_root: PathBuf,
    pub assets_dir: Option<PathBuf>,
    pub enable_cors: bool,
    pub manifest: ModuleManifest,
    pub widget: WidgetConfig,
}

/// Optional TOML file pointed to by `WIDGET_CONFIG_PATH`.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    widget: Option<WidgetConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr: SocketAddr = var("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .context("failed to parse BIND_ADDR")?;

        let site_root = PathBuf::from(var("SITE_ROOT").unwrap_or_else(|| "site".to_string()));
        let assets_dir = var("ASSETS_DIR").map(PathBuf::from);

        let enable_cors = var("ENABLE_CORS")
            .map(|v| parse_bool(&v))
            .unwrap_or(false);

        let manifest = match var("WIDGET_MANIFEST") {
            Some(path) => ModuleManifest::load(&PathBuf::from(path))?,
            None => ModuleManifest::default(),
        };
        manifest
            .routable_frontend_assets(RESERVED_ROUTES)
            .context("invalid WIDGET_MANIFEST")?;

        let mut widget = match var("WIDGET_CONFIG_PATH") {
            Some(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading widget config {path}"))?;
                let file: FileConfig = toml::from_str(&raw)
                    .with_context(|| format!("parsing widget config {path}"))?;
                file.widget.unwrap_or_default()
            }
            None => WidgetConfig::default(),
        };

        if let Some(phone) = var("WHATSAPP_PHONE") {
            widget.phone_number = phone.trim().to_string();
        }
        if let Some(message) = var("WHATSAPP_MESSAGE") {
            widget.message = message;
        }
        if let Some(position) = var("WHATSAPP_POSITION") {
            widget.position = position
                .parse::<Position>()
                .context("failed to parse WHATSAPP_POSITION")?;
        }
        if let Some(visible) = var("WHATSAPP_VISIBLE") {
            widget.visible = parse_bool(&visible);
        }

        if let Err(err) = widget.validate() {
            warn!(%err, "whatsapp widget disabled; set WHATSAPP_PHONE to a digits-only number");
        }

        Ok(Self {
            bind_addr,
            site_root,
            assets_dir,
            enable_cors,
            manifest,
            widget,
        })
    }
}

fn parse_bool(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes")
}
