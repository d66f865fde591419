use crate::assets;
use crate::pages::{PageDecision, resolve_page};
use crate::server::AppState;
use crate::telemetry::WidgetEvent;
use crate::widget::{LinkOpener, OpenTarget, WidgetController};
use axum::Json;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use std::cell::RefCell;
use url::Url;

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn serve_asset(State(state): State<AppState>, uri: Uri) -> Response {
    match assets::resolve_asset(uri.path(), state.config.assets_dir.as_deref()).await {
        Some((kind, body)) => {
            let mut resp = Response::new(body.into());
            resp.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(kind.content_type()),
            );
            resp
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn get_widget_config(State(state): State<AppState>) -> impl IntoResponse {
    let widget = &state.config.widget;
    let deep_link = widget.deep_link().ok().map(|url| url.to_string());
    Json(json!({
        "phone_number": widget.phone_number,
        "message": widget.message,
        "position": widget.position,
        "visible": widget.visible,
        "enabled": deep_link.is_some(),
        "deep_link": deep_link,
    }))
}

pub async fn get_manifest(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.config.manifest.clone())
}

/// Captures the activation target so it can be answered with a redirect.
#[derive(Default)]
struct RedirectOpener {
    location: RefCell<Option<String>>,
}

impl LinkOpener for RedirectOpener {
    fn open(&self, url: &Url, target: OpenTarget) {
        tracing::debug!(%url, target = target.as_str(), "whatsapp activation");
        *self.location.borrow_mut() = Some(url.to_string());
    }
}

/// Activation without script: the anchor's new browsing context lands here.
pub async fn open_whatsapp(State(state): State<AppState>) -> Response {
    let opener = RedirectOpener::default();
    WidgetController::new(state.config.widget.clone()).on_activate(&opener);
    match opener.location.into_inner() {
        Some(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct EventRequest {
    pub event_type: String,
    pub path: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

pub async fn post_events(
    State(state): State<AppState>,
    Json(body): Json<EventRequest>,
) -> impl IntoResponse {
    let event = WidgetEvent {
        event_type: body.event_type,
        path: body.path,
        timestamp_ms: chrono::Utc::now().timestamp_millis(),
        metadata: body.metadata,
    };
    state.telemetry.record_event(event).await;
    StatusCode::ACCEPTED
}

pub async fn serve_page(State(state): State<AppState>, uri: Uri) -> Response {
    match resolve_page(
        &state.config.site_root,
        uri.path(),
        &state.config.widget,
        &state.asset_paths,
    )
    .await
    {
        Ok(PageDecision::Serve(html)) => {
            let mut resp = Response::new(html.into());
            resp.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            );
            resp
        }
        Ok(PageDecision::NotFound) => (StatusCode::NOT_FOUND, "not found").into_response(),
        Err(err) => {
            tracing::error!(?err, path = %uri.path(), "failed to render page");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}
