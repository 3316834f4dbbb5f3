//! Engine configuration, loadable from JSON.
//!
//! ```json
//! { "scope": "budget202401", "binding": "total", "schema": { "paths": {} } }
//! ```
//!
//! Every field is optional; a missing `schema` means the budget schema.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::schema::Schema;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Namespace for bare cell names
    pub scope: String,
    /// Cell the formula result is stored in
    pub binding: String,
    pub schema: Schema,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            scope: "sheet".to_string(),
            binding: "result".to_string(),
            schema: Schema::budget(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "scope": "budget202401" }"#).unwrap();
        assert_eq!(config.scope, "budget202401");
        assert_eq!(config.binding, "result");
        assert_eq!(config.schema, Schema::budget());
    }

    #[test]
    fn test_custom_schema_replaces_budget() {
        let config = EngineConfig::from_json_str(r#"{ "schema": {} }"#).unwrap();
        assert_eq!(config.schema, Schema::empty());
        assert!(EngineConfig::from_json_str("{ scope }").is_err());
    }
}
