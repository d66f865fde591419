use kuchiki::NodeRef;
use kuchiki::traits::*;
use std::path::Path;
use tracing::{debug, warn};

pub const STYLESHEET_PATH: &str = "/whatsapp_widget/static/src/css/whatsapp_widget.css";
pub const SCRIPT_PATH: &str = "/whatsapp_widget/static/src/js/whatsapp_widget.js";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Stylesheet,
    Script,
}

impl AssetKind {
    pub fn content_type(&self) -> &'static str {
        match self {
            AssetKind::Stylesheet => "text/css; charset=utf-8",
            AssetKind::Script => "application/javascript; charset=utf-8",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        if path.ends_with(".css") {
            Some(AssetKind::Stylesheet)
        } else if path.ends_with(".js") {
            Some(AssetKind::Script)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Asset {
    pub path: &'static str,
    pub kind: AssetKind,
    pub body: &'static str,
}

impl Asset {
    pub fn file_name(&self) -> &'static str {
        self.path.rsplit('/').next().unwrap_or(self.path)
    }
}

/// Frontend bundle shipped with every page.
pub const FRONTEND_ASSETS: &[Asset] = &[
    Asset {
        path: STYLESHEET_PATH,
        kind: AssetKind::Stylesheet,
        body: STYLESHEET,
    },
    Asset {
        path: SCRIPT_PATH,
        kind: AssetKind::Script,
        body: SCRIPT,
    },
];

pub fn find_asset(path: &str) -> Option<&'static Asset> {
    FRONTEND_ASSETS.iter().find(|a| a.path == path)
}

/// Prefer an operator-supplied copy under `assets_dir`, falling back to the embedded body.
pub async fn load_asset_body(asset: &Asset, assets_dir: Option<&Path>) -> String {
    if let Some(dir) = assets_dir {
        let path = dir.join(asset.file_name());
        match tokio::fs::read_to_string(&path).await {
            Ok(body) => return body,
            Err(err) => debug!(?path, ?err, "asset override not found; using embedded copy"),
        }
    }
    asset.body.to_string()
}

/// Body for a bundle path: embedded assets (with disk override) or plain files under `assets_dir`.
pub async fn resolve_asset(path: &str, assets_dir: Option<&Path>) -> Option<(AssetKind, String)> {
    if let Some(asset) = find_asset(path) {
        return Some((asset.kind, load_asset_body(asset, assets_dir).await));
    }
    let kind = AssetKind::from_path(path)?;
    let dir = assets_dir?;
    let file_name = path.rsplit('/').next().filter(|f| !f.is_empty())?;
    match tokio::fs::read_to_string(dir.join(file_name)).await {
        Ok(body) => Some((kind, body)),
        Err(err) => {
            warn!(path, ?err, "bundle asset not found");
            None
        }
    }
}

/// Add `<link>`/`<script>` tags for each asset path to `<head>`, skipping ones already present.
pub fn inject_asset_tags(document: &NodeRef, paths: &[String]) {
    let Ok(head) = document.select_first("head") else {
        return;
    };
    for path in paths {
        let Some(kind) = AssetKind::from_path(path) else {
            continue;
        };
        let (tag_name, attr, markup) = match kind {
            AssetKind::Stylesheet => ("link", "href", "<link rel=\"stylesheet\">"),
            AssetKind::Script => ("script", "src", "<script defer></script>"),
        };
        if has_tag_with(head.as_node(), tag_name, attr, path) {
            continue;
        }
        let fragment = kuchiki::parse_html().one(format!("<html><head>{markup}</head></html>"));
        let Ok(tag) = fragment.select_first("head > *") else {
            continue;
        };
        let node = tag.as_node().clone();
        node.detach();
        tag.attributes.borrow_mut().insert(attr, path.clone());
        head.as_node().append(node);
    }
}

fn has_tag_with(head: &NodeRef, tag_name: &str, attr: &str, value: &str) -> bool {
    head.children().elements().any(|element| {
        &*element.name.local == tag_name
            && element.attributes.borrow().get(attr) == Some(value)
    })
}

pub const STYLESHEET: &str = r#"/* WhatsApp floating button */
.whatsapp-widget {
  position: fixed;
  bottom: 24px;
  z-index: 9999;
  display: flex;
  align-items: center;
  justify-content: center;
  width: 60px;
  height: 60px;
  border-radius: 50%;
  background-color: #25d366;
  color: #ffffff;
  box-shadow: 0 4px 12px rgba(0, 0, 0, 0.25);
  cursor: pointer;
  text-decoration: none;
  transition: transform 0.2s ease, box-shadow 0.2s ease, background-color 0.2s ease;
}

.whatsapp-widget--bottom-right {
  right: 24px;
}

.whatsapp-widget--bottom-left {
  left: 24px;
}

.whatsapp-widget:hover,
.whatsapp-widget:focus-visible {
  transform: scale(1.1);
  background-color: #128c7e;
  box-shadow: 0 6px 16px rgba(0, 0, 0, 0.3);
  color: #ffffff;
}

.whatsapp-widget[hidden] {
  display: none;
}

.whatsapp-widget__icon {
  width: 32px;
  height: 32px;
}

@media (max-width: 768px) {
  .whatsapp-widget {
    bottom: 16px;
    width: 52px;
    height: 52px;
  }
  .whatsapp-widget--bottom-right {
    right: 16px;
  }
  .whatsapp-widget--bottom-left {
    left: 16px;
  }
  .whatsapp-widget__icon {
    width: 28px;
    height: 28px;
  }
}
"#;

pub const SCRIPT: &str = r#"// WhatsApp floating button
(function(global) {
  const WIDGET_ID = "whatsapp-widget";
  const EVENTS_URL = "/api/widget/events";

  function element() {
    return document.getElementById(WIDGET_ID);
  }

  function sendEvent(eventType, metadata) {
    try {
      const body = JSON.stringify({
        event_type: eventType,
        path: window.location.pathname,
        metadata: metadata || {},
      });
      if (navigator.sendBeacon) {
        navigator.sendBeacon(EVENTS_URL, new Blob([body], { type: "application/json" }));
      } else {
        fetch(EVENTS_URL, {
          method: "POST",
          headers: { "Content-Type": "application/json" },
          body,
          keepalive: true,
        }).catch(function() {});
      }
    } catch (err) {
      // analytics never blocks the click
    }
  }

  function open() {
    const el = element();
    if (!el || !el.href) {
      return;
    }
    sendEvent("whatsapp.click", { phone: el.dataset.phone || "" });
    window.open(el.href, "_blank", "noopener");
  }

  function setVisible(visible) {
    const el = element();
    if (!el) {
      return;
    }
    el.hidden = !visible;
    el.dataset.state = visible ? "visible" : "hidden";
  }

  document.addEventListener("DOMContentLoaded", function() {
    const el = element();
    if (!el) {
      return;
    }
    el.addEventListener("click", function(event) {
      event.preventDefault();
      open();
    });
  });

  global.WhatsAppWidget = { open, setVisible };
})(window);
"#;
