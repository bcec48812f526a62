//! Engine configuration types.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of undo entries kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Default marker appended to copied items.
pub const DEFAULT_COPY_SUFFIX: &str = " - Copy";

/// Default maximum name length in bytes.
pub const DEFAULT_MAX_NAME_LEN: usize = 255;

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A value is out of range.
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Configuration for a virtual file system instance.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Maximum undo entries; the oldest is dropped beyond this.
    #[builder(default = "DEFAULT_HISTORY_LIMIT")]
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Text appended to the name of a copied item.
    #[builder(default = "DEFAULT_COPY_SUFFIX.to_string()")]
    #[serde(default = "default_copy_suffix")]
    pub copy_suffix: String,

    /// Longest accepted name, in bytes.
    #[builder(default = "DEFAULT_MAX_NAME_LEN")]
    #[serde(default = "default_max_name_len")]
    pub max_name_len: usize,

    /// Seed the root with the standard home folders.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub default_layout: bool,
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_copy_suffix() -> String {
    DEFAULT_COPY_SUFFIX.to_string()
}

fn default_max_name_len() -> usize {
    DEFAULT_MAX_NAME_LEN
}

fn default_true() -> bool {
    true
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.history_limit == Some(0) {
            return Err("History limit must be at least 1".to_string());
        }
        if self.max_name_len == Some(0) {
            return Err("Maximum name length must be at least 1".to_string());
        }
        if let Some(ref suffix) = self.copy_suffix {
            if suffix.is_empty() || suffix.contains('/') {
                return Err("Copy suffix must be non-empty and contain no '/'".to_string());
            }
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            copy_suffix: DEFAULT_COPY_SUFFIX.to_string(),
            max_name_len: DEFAULT_MAX_NAME_LEN,
            default_layout: true,
        }
    }
}

impl EngineConfig {
    /// Create a new config builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml(source: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.check()?;
        Ok(config)
    }

    /// Load a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&source, path)?;
        tracing::debug!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        EngineConfigBuilder {
            history_limit: Some(self.history_limit),
            copy_suffix: Some(self.copy_suffix.clone()),
            max_name_len: Some(self.max_name_len),
            default_layout: Some(self.default_layout),
        }
        .validate()
        .map_err(|message| ConfigError::Invalid { message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::builder()
            .history_limit(10usize)
            .copy_suffix(" copy")
            .default_layout(false)
            .build()
            .unwrap();

        assert_eq!(config.history_limit, 10);
        assert_eq!(config.copy_suffix, " copy");
        assert_eq!(config.max_name_len, DEFAULT_MAX_NAME_LEN);
        assert!(!config.default_layout);
    }

    #[test]
    fn test_config_builder_rejects_zero_history() {
        assert!(EngineConfig::builder().history_limit(0usize).build().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = EngineConfig::from_toml("history_limit = 5\n", Path::new("t.toml")).unwrap();
        assert_eq!(config.history_limit, 5);
        assert_eq!(config.copy_suffix, DEFAULT_COPY_SUFFIX);
        assert!(config.default_layout);
    }

    #[test]
    fn test_invalid_toml_value() {
        let err = EngineConfig::from_toml("copy_suffix = \"a/b\"\n", Path::new("t.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
