use serde::{Deserialize, Serialize};

use crate::core::Document;
use crate::error::EditError;
use crate::schema::Schema;
use crate::structure::{ImportResult, Structure, export_document, import_document};

const DEFAULT_SCHEMA: &str = "tile";
const DEFAULT_VERSION: u32 = 1;

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

fn default_version() -> u32 {
    DEFAULT_VERSION
}

/// A document stored as its structural export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocValue {
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub content: Vec<Structure>,
}

impl DocValue {
    pub fn from_document(schema: &Schema, document: &Document) -> Self {
        Self {
            schema: default_schema(),
            version: default_version(),
            content: export_document(schema, document),
        }
    }

    pub fn into_document(self, schema: &Schema) -> Result<ImportResult, EditError> {
        import_document(schema, &self.content)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
