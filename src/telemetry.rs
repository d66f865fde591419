use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn record_event(&self, event: WidgetEvent);
}

/// Front-end interaction reported by the widget script (e.g. `whatsapp.click`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetEvent {
    pub event_type: String,
    pub path: String,
    pub timestamp_ms: i64,
    pub metadata: serde_json::Value,
}

/// Emits widget events through `tracing`.
#[derive(Clone, Default)]
pub struct TracingTelemetrySink;

#[async_trait]
impl TelemetrySink for TracingTelemetrySink {
    async fn record_event(&self, event: WidgetEvent) {
        info!(
            target: "whatsapp_widget.telemetry",
            event_type = %event.event_type,
            path = %event.path,
            timestamp_ms = event.timestamp_ms,
            metadata = %event.metadata,
            "widget telemetry event"
        );
    }
}
