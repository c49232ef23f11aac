use serde::{Deserialize, Serialize};

use crate::core::Document;

pub const VALUE_SCHEMA: &str = "scribe";
pub const VALUE_VERSION: u32 = 1;

fn default_schema() -> String {
    VALUE_SCHEMA.to_string()
}

fn default_version() -> u32 {
    VALUE_VERSION
}

#[derive(Debug, thiserror::Error)]
pub enum ValueError {
    #[error("malformed document value: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported document schema {schema:?} version {version}")]
    Unsupported { schema: String, version: u32 },
}

/// The saved form of an editor value: the document plus a schema tag and
/// version so stored values can be told apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentValue {
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub document: Document,
}

impl DocumentValue {
    pub fn from_document(document: Document) -> Self {
        Self {
            schema: default_schema(),
            version: default_version(),
            document,
        }
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn to_json_pretty(&self) -> Result<String, ValueError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a saved value, rejecting other schemas and newer versions.
    pub fn from_json_str(s: &str) -> Result<Self, ValueError> {
        let value: Self = serde_json::from_str(s)?;
        if value.schema != VALUE_SCHEMA || value.version > VALUE_VERSION {
            return Err(ValueError::Unsupported {
                schema: value.schema,
                version: value.version,
            });
        }
        Ok(value)
    }
}
