//! Engine configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Importer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImportOptions {
    /// Deepest custom-tag nesting imported structurally. Deeper spans are kept
    /// verbatim as paragraphs.
    pub max_nesting_depth: usize,
    /// Parse a leading `---` YAML block as frontmatter.
    pub parse_frontmatter: bool,
}

impl ImportOptions {
    /// Defaults used by [`crate::import`].
    pub const fn new() -> Self {
        Self {
            max_nesting_depth: 16,
            parse_frontmatter: true,
        }
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Exporter settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportOptions {
    /// Write the frontmatter block ahead of the body.
    pub include_frontmatter: bool,
    /// Precede orphaned tab panels with a comment marker.
    pub orphan_markers: bool,
}

impl ExportOptions {
    /// Defaults used by [`crate::export`].
    pub const fn new() -> Self {
        Self {
            include_frontmatter: true,
            orphan_markers: true,
        }
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Combined configuration, typically deserialized from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Importer settings.
    pub import: ImportOptions,
    /// Exporter settings.
    pub export: ExportOptions,
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON document did not match the configuration schema.
    #[error("Invalid engine configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineConfig {
    /// Parses configuration from JSON; missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.import.max_nesting_depth, 16);
        assert!(config.export.orphan_markers);
    }

    #[test]
    fn camel_case_keys_override_defaults() {
        let config =
            EngineConfig::from_json(r#"{"import":{"maxNestingDepth":2},"export":{"orphanMarkers":false}}"#)
                .unwrap();
        assert_eq!(config.import.max_nesting_depth, 2);
        assert!(config.import.parse_frontmatter);
        assert!(!config.export.orphan_markers);
        assert!(config.export.include_frontmatter);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = EngineConfig::from_json("{\"import\": 3}").unwrap_err();
        assert!(err.to_string().starts_with("Invalid engine configuration"));
    }
}
