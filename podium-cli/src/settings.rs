use crate::cli::ConfigSetArgs;
use anyhow::{Context, Result};
use podium_core::{PresentationConfig, SelectorTable, SelectorTarget};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Settings persisted between runs. The shell owns them; sessions only get snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub presentation: PresentationConfig,
    /// Target name -> ordered selector strategies replacing the builtin ones
    pub selector_overrides: BTreeMap<String, Vec<String>>,
}

impl Settings {
    const APP_NAME: &'static str = "podium";
    const CONFIG_NAME: &'static str = "settings";

    pub fn load() -> Result<Self> {
        let settings: Self = confy::load(Self::APP_NAME, Some(Self::CONFIG_NAME))
            .context("failed to load podium settings")?;
        Ok(settings)
    }

    pub fn store(&self) -> Result<()> {
        confy::store(Self::APP_NAME, Some(Self::CONFIG_NAME), self)
            .context("failed to store podium settings")?;
        Ok(())
    }

    /// Apply the flags that were given. Returns whether anything changed.
    pub fn apply(&mut self, args: &ConfigSetArgs) -> bool {
        let before = self.presentation.clone();
        let config = &mut self.presentation;
        if let Some(max_messages) = args.max_messages {
            config.max_messages = max_messages;
        }
        if let Some(glyph) = &args.alert_glyph {
            config.alert_glyph = glyph.clone();
        }
        if let Some(popup) = args.popup_alerts {
            config.popup_alerts_enabled = popup;
        }
        if let Some(font_size) = args.font_size {
            config.message_font_size_px = font_size;
        }
        if let Some(inspection) = args.inspection {
            config.inspection_mode = inspection;
        }
        before != self.presentation
    }

    /// Merge overrides read from a JSON file over the saved ones.
    pub fn merge_selector_file(&mut self, path: &Path) -> Result<()> {
        let overrides = read_selector_file(path)?;
        self.selector_overrides.extend(overrides);
        Ok(())
    }

    /// Builtin strategies with the overrides applied. Unknown target names are skipped.
    pub fn selector_table(&self) -> SelectorTable {
        let mut typed = BTreeMap::new();
        for (name, strategies) in &self.selector_overrides {
            match name.parse::<SelectorTarget>() {
                Ok(target) => {
                    typed.insert(target, strategies.clone());
                }
                Err(err) => warn!(target = %name, error = %err, "ignoring selector override"),
            }
        }
        SelectorTable::builtin().with_overrides(&typed)
    }
}

pub fn read_selector_file(path: &Path) -> Result<BTreeMap<String, Vec<String>>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read selector file {}", path.display()))?;
    let overrides = serde_json::from_str(&raw)
        .with_context(|| format!("invalid selector file {}", path.display()))?;
    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn apply_only_touches_given_fields() {
        let mut settings = Settings::default();
        let changed = settings.apply(&ConfigSetArgs {
            max_messages: Some(8),
            font_size: Some(50),
            ..ConfigSetArgs::default()
        });
        assert!(changed);
        assert_eq!(settings.presentation.max_messages, 8);
        assert_eq!(settings.presentation.message_font_size_px, 50);
        assert_eq!(settings.presentation.alert_glyph, "🚨");

        assert!(!settings.apply(&ConfigSetArgs {
            max_messages: Some(8),
            ..ConfigSetArgs::default()
        }));
    }

    #[test]
    fn selector_file_overrides_known_targets_only() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"container": [".bubble"], "message-row": [".line"], "nonsense": ["div"]}}"#
        )
        .unwrap();

        let mut settings = Settings::default();
        settings.merge_selector_file(file.path()).unwrap();
        assert_eq!(settings.selector_overrides.len(), 3);

        let table = settings.selector_table();
        let container: Vec<_> = table
            .strategies(SelectorTarget::Container)
            .iter()
            .map(|s| s.as_str())
            .collect();
        assert_eq!(container, [".bubble"]);
        assert_eq!(table.strategies(SelectorTarget::MessageRow)[0].as_str(), ".line");
    }

    #[test]
    fn partial_settings_fill_in_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"presentation": {"max_messages": 3}}"#).unwrap();
        assert_eq!(settings.presentation.max_messages, 3);
        assert!(settings.presentation.popup_alerts_enabled);
        assert!(settings.selector_overrides.is_empty());
    }
}
