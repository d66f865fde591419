use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const FRONTEND_BUNDLE: &str = "web.assets_frontend";

/// Module identity plus the asset bundles the host should ship with every page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleManifest {
    pub name: String,
    pub version: String,
    pub summary: String,
    pub description: String,
    pub author: String,
    pub website: String,
    pub category: String,
    pub depends: Vec<String>,
    pub data: Vec<String>,
    pub assets: BTreeMap<String, Vec<String>>,
    pub installable: bool,
    pub auto_install: bool,
    pub application: bool,
    pub license: String,
}

impl Default for ModuleManifest {
    fn default() -> Self {
        let mut assets = BTreeMap::new();
        assets.insert(
            FRONTEND_BUNDLE.to_string(),
            vec![
                "whatsapp_widget/static/src/css/whatsapp_widget.css".to_string(),
                "whatsapp_widget/static/src/js/whatsapp_widget.js".to_string(),
            ],
        );
        Self {
            name: "WhatsApp Widget".to_string(),
            version: "18.0.1.0.0".to_string(),
            summary: "Floating WhatsApp button on the website".to_string(),
            description: "Adds a floating WhatsApp button to every website page so visitors \
                          can start a conversation with a pre-filled message."
                .to_string(),
            author: String::new(),
            website: String::new(),
            category: "Website".to_string(),
            depends: vec!["website".to_string()],
            data: vec!["views/website_templates.xml".to_string()],
            assets,
            installable: true,
            auto_install: false,
            application: false,
            license: "LGPL-3".to_string(),
        }
    }
}

impl ModuleManifest {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading manifest {}", path.display()))?;
        let manifest: Self =
            toml::from_str(&raw).with_context(|| format!("parsing manifest {}", path.display()))?;
        Ok(manifest)
    }

    /// Frontend bundle paths as absolute URL paths, first occurrence wins.
    pub fn frontend_assets(&self) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        for raw in self.assets.get(FRONTEND_BUNDLE).into_iter().flatten() {
            let raw = raw.trim().trim_start_matches('/');
            if raw.is_empty() {
                continue;
            }
            let path = format!("/{raw}");
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }

    /// Frontend bundle paths that can be mounted next to `reserved` routes.
    pub fn routable_frontend_assets(&self, reserved: &[&str]) -> anyhow::Result<Vec<String>> {
        let paths = self.frontend_assets();
        for path in &paths {
            if reserved.contains(&path.as_str()) {
                anyhow::bail!("frontend asset {path} collides with a built-in route");
            }
            if let Some(bad) = path.chars().find(|c| matches!(c, '{' | '}' | '*' | ':')) {
                anyhow::bail!("frontend asset {path} contains route syntax {bad:?}");
            }
        }
        Ok(paths)
    }
}
