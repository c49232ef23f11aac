use std::collections::BTreeMap;
use std::str::FromStr;

use scribe_core::{EditorConfig, Mark};
use serde::{Deserialize, Serialize};

use crate::hotkey::{Hotkey, HotkeyParseError, Platform};
use crate::toolbar::ToolbarButton;

pub const DEFAULT_PLACEHOLDER: &str = "Say something...";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid widget config: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Hotkey(#[from] HotkeyParseError),
    #[error("unknown action {action:?} bound to {hotkey:?}")]
    UnknownAction { hotkey: String, action: String },
}

/// What a hotkey does once matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    ToggleMark(Mark),
    Undo,
    Redo,
    SelectAll,
}

impl FromStr for HotkeyAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "undo" => Ok(HotkeyAction::Undo),
            "redo" => Ok(HotkeyAction::Redo),
            "select-all" | "select_all" => Ok(HotkeyAction::SelectAll),
            other => other
                .parse::<Mark>()
                .map(HotkeyAction::ToggleMark)
                .map_err(|_| other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    pub placeholder: String,
    pub platform: Platform,
    pub toolbar: Vec<ToolbarButton>,
    /// Hotkey chord to action name (`bold`, `italic`, `underline`, `undo`,
    /// `redo`, `select-all`).
    pub hotkeys: BTreeMap<String, String>,
    pub editor: EditorConfig,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            platform: Platform::default(),
            toolbar: ToolbarButton::defaults(),
            hotkeys: default_hotkeys(),
            editor: EditorConfig::default(),
        }
    }
}

fn default_hotkeys() -> BTreeMap<String, String> {
    [
        ("mod+b", "bold"),
        ("mod+i", "italic"),
        ("mod+u", "underline"),
        ("mod+z", "undo"),
        ("mod+shift+z", "redo"),
        ("mod+a", "select-all"),
    ]
    .into_iter()
    .map(|(hotkey, action)| (hotkey.to_string(), action.to_string()))
    .collect()
}

impl WidgetConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Parses the hotkey table.
    pub fn bindings(&self) -> Result<Vec<(Hotkey, HotkeyAction)>, ConfigError> {
        self.hotkeys
            .iter()
            .map(|(hotkey, action)| -> Result<(Hotkey, HotkeyAction), ConfigError> {
                let parsed: Hotkey = hotkey.parse()?;
                let action = action
                    .parse::<HotkeyAction>()
                    .map_err(|action| ConfigError::UnknownAction {
                        hotkey: hotkey.clone(),
                        action,
                    })?;
                Ok((parsed, action))
            })
            .collect()
    }
}
