use crate::assets::inject_asset_tags;
use crate::widget::{WidgetConfig, WidgetController};
use anyhow::Context;
use kuchiki::traits::*;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

#[derive(Debug)]
pub enum PageDecision {
    Serve(String),
    NotFound,
}

/// Look up the HTML file for `path` under `site_root` and return it with the widget mounted.
pub async fn resolve_page(
    site_root: &Path,
    path: &str,
    widget: &WidgetConfig,
    asset_paths: &[String],
) -> anyhow::Result<PageDecision> {
    let Some(candidates) = page_candidates(site_root, path) else {
        return Ok(PageDecision::NotFound);
    };
    for candidate in candidates {
        if fs::metadata(&candidate)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
        {
            let html = fs::read_to_string(&candidate)
                .await
                .with_context(|| format!("reading html {:?}", candidate))?;
            return Ok(PageDecision::Serve(render_page(&html, widget, asset_paths)));
        }
    }
    Ok(PageDecision::NotFound)
}

/// Parse `html`, add the asset tags and mount the floating button.
pub fn render_page(html: &str, widget: &WidgetConfig, asset_paths: &[String]) -> String {
    let document = kuchiki::parse_html().one(html);
    inject_asset_tags(&document, asset_paths);
    let mut controller = WidgetController::new(widget.clone());
    controller.mount(&document);
    document.to_string()
}

/// Files to try for a request path; `None` when the path escapes the site root.
fn page_candidates(site_root: &Path, path: &str) -> Option<Vec<PathBuf>> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Some(vec![site_root.join("index.html")]);
    }
    let relative = PathBuf::from(trimmed);
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }
    let base = site_root.join(&relative);
    if relative.extension().is_some_and(|ext| ext == "html") {
        return Some(vec![base]);
    }
    Some(vec![
        site_root.join(format!("{trimmed}.html")),
        base.join("index.html"),
    ])
}
