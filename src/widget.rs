use kuchiki::NodeRef;
use kuchiki::traits::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

pub const WIDGET_ID: &str = "whatsapp-widget";
pub const E164_MAX_DIGITS: usize = 15;

const WIDGET_MARKUP: &str = r#"<a id="whatsapp-widget" class="whatsapp-widget" target="_blank" rel="noopener noreferrer" role="button" aria-label="WhatsApp" title="WhatsApp"><svg class="whatsapp-widget__icon" viewBox="0 0 32 32" width="32" height="32" aria-hidden="true" focusable="false"><path fill="currentColor" d="M16 3C8.8 3 3 8.7 3 15.8c0 2.5.7 4.9 2 7L3 29l6.4-2c2 1.1 4.3 1.7 6.6 1.7 7.2 0 13-5.7 13-12.8S23.2 3 16 3zm0 23.4c-2.1 0-4.1-.6-5.8-1.6l-.4-.2-3.8 1.2 1.2-3.7-.3-.4c-1.1-1.7-1.7-3.8-1.7-5.9C5.2 10 10 5.3 16 5.3S26.8 10 26.8 15.8 22 26.4 16 26.4zm5.9-7.9c-.3-.2-1.9-.9-2.2-1s-.5-.2-.7.2-.8 1-1 1.2-.4.2-.7.1c-.3-.2-1.4-.5-2.6-1.6-1-.9-1.6-1.9-1.8-2.2s0-.5.1-.7l.5-.6c.2-.2.2-.4.3-.6.1-.2 0-.4 0-.6l-1-2.4c-.3-.6-.5-.5-.7-.5h-.6c-.2 0-.6.1-.9.4s-1.2 1.1-1.2 2.8 1.2 3.2 1.4 3.5c.2.2 2.4 3.6 5.8 5 2.8 1.1 3.4.9 4 .8.6-.1 1.9-.8 2.2-1.5.3-.7.3-1.4.2-1.5-.1-.2-.3-.3-.6-.4z"/></svg></a>"#;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WidgetError {
    #[error("invalid widget configuration: {0}")]
    InvalidConfiguration(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    #[default]
    BottomRight,
    BottomLeft,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::BottomRight => "bottom-right",
            Position::BottomLeft => "bottom-left",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = WidgetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "bottom-right" | "right" => Ok(Position::BottomRight),
            "bottom-left" | "left" => Ok(Position::BottomLeft),
            other => Err(WidgetError::InvalidConfiguration(format!(
                "unknown position {other:?}"
            ))),
        }
    }
}

/// Static configuration for the floating button. Built once per page and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Country code + area code + subscriber number, digits only.
    pub phone_number: String,
    pub message: String,
    pub position: Position,
    pub visible: bool,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            phone_number: String::new(),
            message: String::new(),
            position: Position::default(),
            visible: true,
        }
    }
}

impl WidgetConfig {
    pub fn new(phone_number: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), WidgetError> {
        validate_phone_number(&self.phone_number)
    }

    pub fn deep_link(&self) -> Result<Url, WidgetError> {
        crate::deeplink::deep_link(&self.phone_number, &self.message)
    }
}

pub fn validate_phone_number(phone_number: &str) -> Result<(), WidgetError> {
    if phone_number.is_empty() {
        return Err(WidgetError::InvalidConfiguration(
            "phone number is empty".to_string(),
        ));
    }
    if let Some(bad) = phone_number.chars().find(|c| !c.is_ascii_digit()) {
        return Err(WidgetError::InvalidConfiguration(format!(
            "phone number must contain digits only, found {bad:?}"
        )));
    }
    if phone_number.len() > E164_MAX_DIGITS {
        return Err(WidgetError::InvalidConfiguration(format!(
            "phone number has {} digits, E.164 allows at most {E164_MAX_DIGITS}",
            phone_number.len()
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Hidden,
    Visible,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Hidden => "hidden",
            Visibility::Visible => "visible",
        }
    }
}

impl From<bool> for Visibility {
    fn from(visible: bool) -> Self {
        if visible {
            Visibility::Visible
        } else {
            Visibility::Hidden
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenTarget {
    /// New top-level browsing context.
    Blank,
}

impl OpenTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpenTarget::Blank => "_blank",
        }
    }
}

/// Whatever can open a URL in a browsing context. Failures stay on the opener's side.
pub trait LinkOpener {
    fn open(&self, url: &Url, target: OpenTarget);
}

/// Renders the floating button into a document and handles its activation.
pub struct WidgetController {
    config: WidgetConfig,
    state: Visibility,
    node: Option<NodeRef>,
}

impl WidgetController {
    pub fn new(config: WidgetConfig) -> Self {
        let state = Visibility::from(config.visible);
        Self {
            config,
            state,
            node: None,
        }
    }

    #[allow(dead_code)]
    pub fn state(&self) -> Visibility {
        self.state
    }

    #[allow(dead_code)]
    pub fn is_mounted(&self) -> bool {
        self.node.is_some()
    }

    /// Append the button to `<body>`. Invalid configuration mounts nothing.
    pub fn mount(&mut self, document: &NodeRef) {
        if self.node.is_some() {
            return;
        }
        let Ok(link) = self.config.deep_link() else {
            return;
        };
        if let Ok(existing) = document.select_first(&format!("#{WIDGET_ID}")) {
            self.node = Some(existing.as_node().clone());
            self.apply_state();
            return;
        }
        let Ok(body) = document.select_first("body") else {
            return;
        };
        let Some(node) = build_widget_node(&self.config, &link) else {
            return;
        };
        body.as_node().append(node.clone());
        self.node = Some(node);
        self.apply_state();
    }

    pub fn on_activate(&self, opener: &dyn LinkOpener) {
        if let Ok(url) = self.config.deep_link() {
            opener.open(&url, OpenTarget::Blank);
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.state = Visibility::from(visible);
        self.apply_state();
    }

    fn apply_state(&self) {
        let Some(element) = self.node.as_ref().and_then(|n| n.as_element()) else {
            return;
        };
        let mut attributes = element.attributes.borrow_mut();
        match self.state {
            Visibility::Hidden => {
                attributes.insert("hidden", String::new());
            }
            Visibility::Visible => {
                attributes.remove("hidden");
            }
        }
        attributes.insert("data-state", self.state.as_str().to_string());
    }
}

fn build_widget_node(config: &WidgetConfig, link: &Url) -> Option<NodeRef> {
    let template = kuchiki::parse_html().one(WIDGET_MARKUP);
    let anchor = template.select_first(&format!("a#{WIDGET_ID}")).ok()?;
    let node = anchor.as_node().clone();
    node.detach();
    {
        let mut attributes = anchor.attributes.borrow_mut();
        attributes.insert(
            "class",
            format!("whatsapp-widget whatsapp-widget--{}", config.position),
        );
        attributes.insert("href", link.to_string());
        attributes.insert("data-phone", config.phone_number.clone());
        attributes.insert("data-message", config.message.clone());
    }
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn page() -> NodeRef {
        kuchiki::parse_html().one("<html><head></head><body><main>hi</main></body></html>")
    }

    fn widget_count(document: &NodeRef) -> usize {
        document
            .select(&format!("#{WIDGET_ID}"))
            .map(|nodes| nodes.count())
            .unwrap_or(0)
    }

    fn is_hidden(document: &NodeRef) -> bool {
        let node = document.select_first(&format!("#{WIDGET_ID}")).unwrap();
        let hidden = node.attributes.borrow().contains("hidden");
        hidden
    }

    #[derive(Default)]
    struct RecordingOpener {
        opened: RefCell<Vec<(String, &'static str)>>,
    }

    impl LinkOpener for RecordingOpener {
        fn open(&self, url: &Url, target: OpenTarget) {
            self.opened
                .borrow_mut()
                .push((url.to_string(), target.as_str()));
        }
    }

    #[test]
    fn mounts_single_anchor_into_body() {
        let document = page();
        let mut controller = WidgetController::new(WidgetConfig::new("5511999998888", "Olá!"));
        controller.mount(&document);
        controller.mount(&document);
        assert!(controller.is_mounted());
        assert_eq!(widget_count(&document), 1);

        let anchor = document.select_first("body > a#whatsapp-widget").unwrap();
        let attributes = anchor.attributes.borrow();
        assert_eq!(
            attributes.get("href"),
            Some("https://wa.me/5511999998888?text=Ol%C3%A1%21")
        );
        assert_eq!(attributes.get("target"), Some("_blank"));
        assert_eq!(
            attributes.get("class"),
            Some("whatsapp-widget whatsapp-widget--bottom-right")
        );
        assert!(!attributes.contains("hidden"));
    }

    #[test]
    fn empty_phone_renders_nothing() {
        let document = page();
        let mut controller = WidgetController::new(WidgetConfig::new("", "hello"));
        controller.mount(&document);
        assert!(!controller.is_mounted());
        assert_eq!(widget_count(&document), 0);
    }

    #[test]
    fn malformed_phone_renders_nothing() {
        for phone in ["+5511999998888", "55 11 99999 8888", "(11)9999-8888", "1234567890123456"] {
            let document = page();
            let mut controller = WidgetController::new(WidgetConfig::new(phone, "hi"));
            controller.mount(&document);
            assert_eq!(widget_count(&document), 0, "{phone}");
        }
    }

    #[test]
    fn hidden_config_then_set_visible() {
        let document = page();
        let config = WidgetConfig {
            visible: false,
            ..WidgetConfig::new("5511999998888", "hi")
        };
        let mut controller = WidgetController::new(config);
        assert_eq!(controller.state(), Visibility::Hidden);
        controller.mount(&document);
        assert!(is_hidden(&document));

        controller.set_visible(true);
        assert_eq!(controller.state(), Visibility::Visible);
        assert!(!is_hidden(&document));
        let once = document.to_string();

        controller.set_visible(true);
        assert_eq!(document.to_string(), once);

        controller.set_visible(false);
        assert!(is_hidden(&document));
    }

    #[test]
    fn set_visible_before_mount_is_applied_on_mount() {
        let document = page();
        let mut controller = WidgetController::new(WidgetConfig::new("5511999998888", "hi"));
        controller.set_visible(false);
        controller.mount(&document);
        assert!(is_hidden(&document));
    }

    #[test]
    fn message_is_escaped_in_markup() {
        let document = page();
        let mut controller = WidgetController::new(WidgetConfig::new(
            "5511999998888",
            "<script>alert(\"x\")</script>",
        ));
        controller.mount(&document);
        let html = document.to_string();
        assert!(!html.contains("alert(\"x\")"));
        assert_eq!(document.select("script").unwrap().count(), 0);
        assert_eq!(widget_count(&document), 1);
    }

    #[test]
    fn left_position_sets_modifier_class() {
        let document = page();
        let config = WidgetConfig {
            position: Position::BottomLeft,
            ..WidgetConfig::new("5511999998888", "hi")
        };
        WidgetController::new(config).mount(&document);
        let anchor = document.select_first("#whatsapp-widget").unwrap();
        assert!(
            anchor
                .attributes
                .borrow()
                .get("class")
                .unwrap()
                .contains("whatsapp-widget--bottom-left")
        );
    }

    #[test]
    fn activation_opens_new_context() {
        let opener = RecordingOpener::default();
        let controller = WidgetController::new(WidgetConfig::new(
            "5511999998888",
            "Olá! Gostaria de mais informações.",
        ));
        controller.on_activate(&opener);
        let opened = opener.opened.borrow();
        assert_eq!(opened.len(), 1);
        assert_eq!(
            opened[0],
            (
                "https://wa.me/5511999998888?text=Ol%C3%A1%21%20Gostaria%20de%20mais%20informa%C3%A7%C3%B5es."
                    .to_string(),
                "_blank"
            )
        );
    }

    #[test]
    fn activation_with_invalid_phone_opens_nothing() {
        let opener = RecordingOpener::default();
        WidgetController::new(WidgetConfig::new("", "hi")).on_activate(&opener);
        assert!(opener.opened.borrow().is_empty());
    }

    #[test]
    fn parses_positions() {
        assert_eq!("bottom-left".parse::<Position>().unwrap(), Position::BottomLeft);
        assert_eq!("BOTTOM_RIGHT".parse::<Position>().unwrap(), Position::BottomRight);
        assert!("top".parse::<Position>().is_err());
    }
}
