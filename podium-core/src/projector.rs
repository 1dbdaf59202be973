//! Maps the recency window onto the overlay.

use crate::config::PresentationConfig;
use crate::normalizer::MessageRecord;
use std::collections::BTreeSet;
use std::fmt::Write as _;

pub const CONTAINER_ELEMENT_ID: &str = "whatsapp-presentation-container";
pub const MESSAGES_ELEMENT_ID: &str = "presentation-messages";
pub const STOP_FLASHING_ELEMENT_ID: &str = "stop-flashing-btn";
pub const EXIT_ELEMENT_ID: &str = "exit-presentation-btn";
pub const PLACEHOLDER_TEXT: &str = "Waiting for new messages...";

pub const BASE_BACKGROUND: &str = "#1f2c34";
pub const ALERT_ITEM_BACKGROUND: &str = "#b71c1c";
pub const OUTGOING_ITEM_BACKGROUND: &str = "#005c4b";
pub const INCOMING_ITEM_BACKGROUND: &str = "#202c33";
const SENDER_COLOR: &str = "#00a884";

const ALERT_FONT_FACTOR: f32 = 1.5;
const ALERT_SCALE: f32 = 1.2;
const SENDER_FONT_SIZE_PX: u32 = 24;
const ALERT_SENDER_FONT_SIZE_PX: u32 = 30;

/// One rendered message with its visual weight already decided.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayItem {
    pub id: Option<String>,
    pub sender: String,
    pub text: String,
    pub is_outgoing: bool,
    pub is_alert: bool,
    pub font_size_px: f32,
    pub sender_font_size_px: u32,
    pub scale: f32,
    pub max_width_percent: u8,
    pub background: &'static str,
    /// "{glyph} Alert Message {glyph}" line under alert items
    pub banner: Option<String>,
}

/// Oldest first, system rows dropped, alert ids boosted.
pub fn project(
    records: &[MessageRecord],
    alert_ids: &BTreeSet<String>,
    config: &PresentationConfig,
) -> Vec<OverlayItem> {
    let base_font = config.effective_font_size() as f32;
    let glyph = config.effective_alert_glyph();

    records
        .iter()
        .filter(|record| record.is_visible())
        .map(|record| {
            let is_alert = record
                .raw_id
                .as_ref()
                .is_some_and(|id| alert_ids.contains(id));
            let background = if is_alert {
                ALERT_ITEM_BACKGROUND
            } else if record.is_outgoing {
                OUTGOING_ITEM_BACKGROUND
            } else {
                INCOMING_ITEM_BACKGROUND
            };
            OverlayItem {
                id: record.raw_id.clone(),
                sender: record.sender.clone(),
                text: record.text.clone(),
                is_outgoing: record.is_outgoing,
                is_alert,
                font_size_px: if is_alert { base_font * ALERT_FONT_FACTOR } else { base_font },
                sender_font_size_px: if is_alert { ALERT_SENDER_FONT_SIZE_PX } else { SENDER_FONT_SIZE_PX },
                scale: if is_alert { ALERT_SCALE } else { 1.0 },
                max_width_percent: if is_alert { 90 } else { 80 },
                background,
                banner: is_alert.then(|| format!("{glyph} Alert Message {glyph}")),
            }
        })
        .collect()
}

/// The overlay mount point. Creation and removal belong to the shell; the session only drives
/// it through these calls.
pub trait OverlaySurface {
    fn mount(&mut self, title: &str);
    fn unmount(&mut self);
    fn is_mounted(&self) -> bool;
    fn render(&mut self, items: &[OverlayItem]);
    fn set_background(&mut self, color: &str);
    fn set_stop_flashing_visible(&mut self, visible: bool);
    fn apply_styles(&mut self, css: &str);
}

/// Overlay that keeps its state as markup. Used by the CLI replay and by tests.
#[derive(Debug, Clone, Default)]
pub struct HtmlOverlay {
    title: Option<String>,
    items: Vec<OverlayItem>,
    background: String,
    stop_flashing_visible: bool,
    styles: String,
    renders: usize,
}

impl HtmlOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn items(&self) -> &[OverlayItem] {
        &self.items
    }

    pub fn background(&self) -> &str {
        &self.background
    }

    pub fn stop_flashing_visible(&self) -> bool {
        self.stop_flashing_visible
    }

    pub fn styles(&self) -> &str {
        &self.styles
    }

    /// Number of `render` calls since the overlay was created.
    pub fn render_count(&self) -> usize {
        self.renders
    }

    /// Markup of the mounted overlay, empty when nothing is mounted.
    pub fn to_html(&self) -> String {
        let Some(title) = &self.title else {
            return String::new();
        };
        let mut html = String::new();
        let _ = writeln!(html, "<style>{}</style>", self.styles);
        let _ = writeln!(
            html,
            r#"<div id="{CONTAINER_ELEMENT_ID}" style="background-color: {};">"#,
            self.background
        );
        let _ = writeln!(html, "  <h1>{} - Presentation Mode</h1>", escape_html(title));
        let display = if self.stop_flashing_visible { "inline-block" } else { "none" };
        let _ = writeln!(
            html,
            r#"  <button id="{STOP_FLASHING_ELEMENT_ID}" style="display: {display};">Stop Flashing</button>"#
        );
        let _ = writeln!(html, r#"  <button id="{EXIT_ELEMENT_ID}">Exit</button>"#);
        let _ = writeln!(html, r#"  <div id="{MESSAGES_ELEMENT_ID}">"#);
        if self.items.is_empty() {
            let _ = writeln!(html, "    <div>{PLACEHOLDER_TEXT}</div>");
        }
        for item in &self.items {
            write_item(&mut html, item);
        }
        html.push_str("  </div>\n</div>\n");
        html
    }
}

fn write_item(html: &mut String, item: &OverlayItem) {
    let align = if item.is_outgoing { "flex-end" } else { "flex-start" };
    let _ = write!(
        html,
        r#"    <div style="background-color: {}; font-size: {}px; max-width: {}%; align-self: {align}; transform: scale({});">"#,
        item.background, item.font_size_px, item.max_width_percent, item.scale
    );
    if !item.sender.is_empty() {
        let _ = write!(
            html,
            r#"<div style="font-size: {}px; color: {SENDER_COLOR};">{}</div>"#,
            item.sender_font_size_px,
            escape_html(&item.sender)
        );
    }
    let _ = write!(html, "<div>{}</div>", escape_html(&item.text));
    if let Some(banner) = &item.banner {
        let _ = write!(html, "<div>{}</div>", escape_html(banner));
    }
    html.push_str("</div>\n");
}

impl OverlaySurface for HtmlOverlay {
    fn mount(&mut self, title: &str) {
        self.title = Some(title.to_string());
        self.items.clear();
        self.background = BASE_BACKGROUND.to_string();
        self.stop_flashing_visible = false;
    }

    fn unmount(&mut self) {
        self.title = None;
        self.items.clear();
        self.stop_flashing_visible = false;
    }

    fn is_mounted(&self) -> bool {
        self.title.is_some()
    }

    fn render(&mut self, items: &[OverlayItem]) {
        self.items = items.to_vec();
        self.renders += 1;
    }

    fn set_background(&mut self, color: &str) {
        self.background = color.to_string();
    }

    fn set_stop_flashing_visible(&mut self, visible: bool) {
        self.stop_flashing_visible = visible;
    }

    fn apply_styles(&mut self, css: &str) {
        self.styles = css.to_string();
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::{fingerprint, SYSTEM_SENTINEL};

    fn record(id: &str, text: &str, outgoing: bool) -> MessageRecord {
        MessageRecord {
            text: text.to_string(),
            sender: String::new(),
            is_outgoing: outgoing,
            is_system: text == SYSTEM_SENTINEL,
            raw_id: Some(id.to_string()),
            timestamp: String::new(),
            fingerprint: fingerprint(text, ""),
        }
    }

    #[test]
    fn system_rows_are_not_rendered() {
        let records = vec![
            record("a", "hi", false),
            record("d", SYSTEM_SENTINEL, false),
            record("b", "there", true),
        ];
        let items = project(&records, &BTreeSet::new(), &PresentationConfig::default());
        let texts: Vec<_> = items.iter().map(|item| item.text.as_str()).collect();
        assert_eq!(texts, ["hi", "there"]);
        assert_eq!(items[0].background, INCOMING_ITEM_BACKGROUND);
        assert_eq!(items[1].background, OUTGOING_ITEM_BACKGROUND);
    }

    #[test]
    fn alert_items_are_boosted() {
        let records = vec![record("a", "calm", true), record("b", "fire", true)];
        let alerts = BTreeSet::from(["b".to_string()]);
        let items = project(&records, &alerts, &PresentationConfig::default());

        assert!(!items[0].is_alert);
        assert_eq!(items[0].font_size_px, 45.0);
        assert_eq!(items[0].sender_font_size_px, 24);

        let alert = &items[1];
        assert!(alert.is_alert);
        assert_eq!(alert.background, ALERT_ITEM_BACKGROUND);
        assert_eq!(alert.font_size_px, 67.5);
        assert_eq!(alert.sender_font_size_px, 30);
        assert_eq!(alert.scale, 1.2);
        assert_eq!(alert.banner.as_deref(), Some("🚨 Alert Message 🚨"));
    }

    #[test]
    fn html_is_escaped_and_placeholder_shown() {
        let mut overlay = HtmlOverlay::new();
        assert_eq!(overlay.to_html(), "");

        overlay.mount("Team <Ops>");
        let html = overlay.to_html();
        assert!(html.contains("Team &lt;Ops&gt; - Presentation Mode"));
        assert!(html.contains(PLACEHOLDER_TEXT));

        let items = project(
            &[record("a", "<b>bold</b>", false)],
            &BTreeSet::new(),
            &PresentationConfig::default(),
        );
        overlay.render(&items);
        let html = overlay.to_html();
        assert!(html.contains("&lt;b&gt;bold&lt;/b&gt;"));
        assert!(!html.contains(PLACEHOLDER_TEXT));
        assert_eq!(overlay.render_count(), 1);
    }
}
