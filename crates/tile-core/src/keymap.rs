use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::EditorConfig;
use crate::error::KeyParseError;

/// A key press as reported by the host. `Mod` is Cmd on macOS and Ctrl elsewhere;
/// hosts fold that distinction before calling in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyCombo {
    pub key: String,
    #[serde(default)]
    pub modifier: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub shift: bool,
}

impl KeyCombo {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            modifier: false,
            alt: false,
            shift: false,
        }
    }

    pub fn with_mod(mut self) -> Self {
        self.modifier = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }
}

impl FromStr for KeyCombo {
    type Err = KeyParseError;

    /// Parses `"Mod-b"`, `"Shift-Enter"`, `"Ctrl-Alt-x"` and plain keys.
    /// Single letters are lower-cased.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = input.split('-').collect();
        let Some((key, modifiers)) = parts.split_last() else {
            return Err(KeyParseError(input.to_string()));
        };
        // "Mod--" binds the minus key
        let key = if key.is_empty() && input.ends_with("--") {
            "-"
        } else {
            key
        };
        if key.is_empty() {
            return Err(KeyParseError(input.to_string()));
        }

        let mut combo = KeyCombo::new(normalize_key(key));
        for modifier in modifiers.iter().filter(|m| !m.is_empty()) {
            match modifier.to_ascii_lowercase().as_str() {
                "mod" | "ctrl" | "control" | "cmd" | "meta" => combo.modifier = true,
                "alt" | "option" => combo.alt = true,
                "shift" => combo.shift = true,
                _ => return Err(KeyParseError(input.to_string())),
            }
        }
        Ok(combo)
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifier {
            f.write_str("Mod-")?;
        }
        if self.alt {
            f.write_str("Alt-")?;
        }
        if self.shift {
            f.write_str("Shift-")?;
        }
        f.write_str(&self.key)
    }
}

fn normalize_key(key: &str) -> String {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c.to_lowercase().collect(),
        _ => key.to_string(),
    }
}

/// Key combo to command id bindings.
#[derive(Debug, Clone, Default)]
pub struct Keymap {
    bindings: HashMap<KeyCombo, String>,
}

impl Keymap {
    pub fn tile() -> Self {
        let mut keymap = Keymap::default();
        for (combo, command) in [
            ("Enter", "core.split_block"),
            ("Mod-b", "marks.toggle_bold"),
            ("Mod-i", "marks.toggle_italic"),
            ("Mod-u", "marks.toggle_underline"),
        ] {
            if let Ok(combo) = combo.parse() {
                keymap.bind(combo, command);
            }
        }
        keymap
    }

    /// The built-in keymap with the config's overrides layered on top.
    /// Unparsable combos are skipped.
    pub fn from_config(config: &EditorConfig) -> Self {
        let mut keymap = Self::tile();
        for (combo, command) in &config.keymap {
            match combo.parse::<KeyCombo>() {
                Ok(parsed) => keymap.bind(parsed, command.clone()),
                Err(err) => tracing::warn!(%err, %command, "ignoring keymap entry"),
            }
        }
        keymap
    }

    pub fn bind(&mut self, combo: KeyCombo, command: impl Into<String>) {
        self.bindings.insert(combo, command.into());
    }

    pub fn unbind(&mut self, combo: &KeyCombo) -> Option<String> {
        self.bindings.remove(combo)
    }

    pub fn lookup(&self, combo: &KeyCombo) -> Option<&str> {
        self.bindings.get(combo).map(String::as_str)
    }
}
