use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Decides what the `mod` modifier means: ⌘ on macOS, Ctrl elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Mac,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::Mac
        } else {
            Platform::Other
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Platform::current()
    }
}

/// A decoded key press. `key` is a single character for printable keys and
/// a name such as `Enter` or `Backspace` otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn has_command_modifier(&self) -> bool {
        self.ctrl || self.meta || self.alt
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HotkeyParseError {
    #[error("empty hotkey")]
    Empty,
    #[error("hotkey {0:?} has no key")]
    MissingKey(String),
    #[error("unknown modifier {modifier:?} in hotkey {hotkey:?}")]
    UnknownModifier { hotkey: String, modifier: String },
}

/// A key chord such as `mod+shift+z` (`cmd-shift-z` style is accepted too).
/// Matching is exact: every modifier not named must be released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hotkey {
    pub key: String,
    pub mod_key: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Hotkey {
    pub fn matches(&self, event: &KeyEvent, platform: Platform) -> bool {
        let ctrl = self.ctrl || (self.mod_key && platform != Platform::Mac);
        let meta = self.meta || (self.mod_key && platform == Platform::Mac);
        event.key.eq_ignore_ascii_case(&self.key)
            && event.ctrl == ctrl
            && event.meta == meta
            && event.shift == self.shift
            && event.alt == self.alt
    }

    /// The key event that triggers this hotkey on `platform`.
    pub fn to_event(&self, platform: Platform) -> KeyEvent {
        KeyEvent {
            key: self.key.clone(),
            ctrl: self.ctrl || (self.mod_key && platform != Platform::Mac),
            meta: self.meta || (self.mod_key && platform == Platform::Mac),
            shift: self.shift,
            alt: self.alt,
        }
    }
}

impl FromStr for Hotkey {
    type Err = HotkeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(HotkeyParseError::Empty);
        }
        let separator = if s.contains('+') { '+' } else { '-' };
        let mut parts: Vec<&str> = s.split(separator).collect();
        let key = parts
            .pop()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| HotkeyParseError::MissingKey(s.to_string()))?;

        let mut hotkey = Hotkey {
            key: key.to_ascii_lowercase(),
            mod_key: false,
            ctrl: false,
            meta: false,
            shift: false,
            alt: false,
        };
        for part in parts {
            match part.to_ascii_lowercase().as_str() {
                "mod" => hotkey.mod_key = true,
                "cmd" | "command" | "meta" => hotkey.meta = true,
                "ctrl" | "control" => hotkey.ctrl = true,
                "shift" => hotkey.shift = true,
                "alt" | "option" => hotkey.alt = true,
                other => {
                    return Err(HotkeyParseError::UnknownModifier {
                        hotkey: s.to_string(),
                        modifier: other.to_string(),
                    });
                }
            }
        }
        Ok(hotkey)
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let modifiers = [
            (self.mod_key, "mod"),
            (self.ctrl, "ctrl"),
            (self.meta, "cmd"),
            (self.alt, "alt"),
            (self.shift, "shift"),
        ];
        for (_, name) in modifiers.iter().filter(|(on, _)| *on) {
            write!(f, "{name}+")?;
        }
        f.write_str(&self.key)
    }
}
