use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Pasted or inserted images wider than this are scaled down.
    pub max_image_width: u32,
    pub font_sizes: Vec<String>,
    pub default_font_size: String,
    /// Key combo (e.g. `"Mod-b"`) to command id, layered over the built-in keymap.
    pub keymap: BTreeMap<String, String>,
}

impl EditorConfig {
    pub fn with_defaults(mut self) -> Self {
        if self.max_image_width == 0 {
            self.max_image_width = 300;
        }
        if self.font_sizes.is_empty() {
            self.font_sizes = (1..=5).map(|n| n.to_string()).collect();
        }
        if self.default_font_size.is_empty() {
            self.default_font_size = "1".to_string();
        }
        self
    }

    pub fn from_json_str(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(input).map(Self::with_defaults)
    }
}
