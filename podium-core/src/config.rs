use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_MESSAGES: usize = 5;
pub const DEFAULT_ALERT_GLYPH: &str = "🚨";
pub const DEFAULT_MESSAGE_FONT_SIZE_PX: u32 = 45;
/// Used when a pushed configuration carries a zero font size.
pub const FALLBACK_MESSAGE_FONT_SIZE_PX: u32 = 36;

/// Presentation settings. Owned by the shell and pushed to the overlay whenever they change;
/// the pipeline reads them on every pass instead of caching derived values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    /// Number of recent messages to show in presentation mode
    pub max_messages: usize,
    /// The glyph that triggers alert mode
    pub alert_glyph: String,
    /// Highlight messages carrying the alert glyph
    pub popup_alerts_enabled: bool,
    pub message_font_size_px: u32,
    /// Verbose mutation logging and element dumps
    pub inspection_mode: bool,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            max_messages: DEFAULT_MAX_MESSAGES,
            alert_glyph: DEFAULT_ALERT_GLYPH.to_string(),
            popup_alerts_enabled: true,
            message_font_size_px: DEFAULT_MESSAGE_FONT_SIZE_PX,
            inspection_mode: false,
        }
    }
}

impl PresentationConfig {
    pub fn effective_max_messages(&self) -> usize {
        if self.max_messages == 0 {
            DEFAULT_MAX_MESSAGES
        } else {
            self.max_messages
        }
    }

    pub fn effective_font_size(&self) -> u32 {
        if self.message_font_size_px == 0 {
            FALLBACK_MESSAGE_FONT_SIZE_PX
        } else {
            self.message_font_size_px
        }
    }

    /// An empty glyph would match every label, so it falls back to the default.
    pub fn effective_alert_glyph(&self) -> &str {
        let glyph = self.alert_glyph.trim();
        if glyph.is_empty() {
            DEFAULT_ALERT_GLYPH
        } else {
            glyph
        }
    }

    /// Stylesheet applied to the overlay so font changes take effect without a re-render.
    pub fn dynamic_styles(&self) -> String {
        format!(
            "#presentation-messages > div {{\n  font-size: {}px !important;\n  line-height: 1.4 !important;\n}}\n",
            self.effective_font_size()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values_fall_back() {
        let config = PresentationConfig {
            max_messages: 0,
            alert_glyph: "  ".to_string(),
            message_font_size_px: 0,
            ..Default::default()
        };
        assert_eq!(config.effective_max_messages(), 5);
        assert_eq!(config.effective_font_size(), 36);
        assert_eq!(config.effective_alert_glyph(), "🚨");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: PresentationConfig =
            serde_json::from_str(r#"{"max_messages": 8, "popup_alerts_enabled": false}"#).unwrap();
        assert_eq!(config.max_messages, 8);
        assert!(!config.popup_alerts_enabled);
        assert_eq!(config.message_font_size_px, 45);
        assert_eq!(config.alert_glyph, "🚨");
    }

    #[test]
    fn styles_follow_font_size() {
        let config = PresentationConfig {
            message_font_size_px: 60,
            ..Default::default()
        };
        assert!(config.dynamic_styles().contains("font-size: 60px !important"));
    }
}
