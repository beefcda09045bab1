//! Bridge configuration
//!
//! Loaded from TOML; every section and key is optional:
//!
//! ```toml
//! [pool]
//! initial_capacity = 16   # wrapper records pre-built per kind
//!
//! [marshal]
//! mode = "text"           # or "typed"
//!
//! [runtime]
//! chunk_name = "script"   # name reported in guest error messages
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub pool: PoolConfig,
    pub marshal: MarshalConfig,
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub initial_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarshalConfig {
    pub mode: MarshalMode,
}

/// How arguments with declared parameters reach the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarshalMode {
    /// Through a `Name=Value` parameter string
    #[default]
    Text,
    /// Straight to typed values
    Typed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub chunk_name: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            chunk_name: "script".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Parse and validate configuration text
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: BridgeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.runtime.chunk_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "runtime.chunk_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = BridgeConfig::from_toml_str("").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.pool.initial_capacity, 16);
        assert_eq!(config.marshal.mode, MarshalMode::Text);
        assert_eq!(config.runtime.chunk_name, "script");
    }

    #[test]
    fn test_partial_document() {
        let config = BridgeConfig::from_toml_str(
            r#"
            [marshal]
            mode = "typed"
            "#,
        )
        .unwrap();
        assert_eq!(config.marshal.mode, MarshalMode::Typed);
        assert_eq!(config.pool.initial_capacity, 16);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            BridgeConfig::from_toml_str("[marshal]\nmode = \"binary\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            BridgeConfig::from_toml_str("[runtime]\nchunk_name = \"  \""),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_serializes_back() {
        let mut config = BridgeConfig::default();
        config.pool.initial_capacity = 4;
        let text = toml::to_string(&config).unwrap();
        assert_eq!(BridgeConfig::from_toml_str(&text).unwrap(), config);
    }
}
