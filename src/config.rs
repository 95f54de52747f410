//! Configuration for recall
//!
//! Resolution priority: environment → TOML file → built-in defaults.
//!
//! ```toml
//! namespace = "bgde"
//! data_dir = "/home/me/.local/share/recall"
//! default_direction = "b-a"
//!
//! [language]
//! a = "bg"
//! b = "de"
//!
//! [session]
//! max_cards = 20
//! shuffle = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::direction::{Direction, LanguagePair};

/// Environment variable overriding the data directory
pub const ENV_DATA_DIR: &str = "RECALL_DATA_DIR";
/// Environment variable overriding the storage namespace
pub const ENV_NAMESPACE: &str = "RECALL_NAMESPACE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Data directory not found")]
    DataDirNotFound,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecallConfig {
    /// Prefix of every storage key
    pub namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Direction used when none has been persisted yet
    pub default_direction: Direction,
    pub language: LanguagePair,
    pub session: SessionConfig,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            namespace: "bgde".to_string(),
            data_dir: None,
            default_direction: Direction::BToA,
            language: LanguagePair::default(),
            session: SessionConfig::default(),
        }
    }
}

/// Session bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum cards per session; 0 means unbounded
    pub max_cards: usize,
    pub shuffle: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_cards: 20,
            shuffle: true,
        }
    }
}

impl RecallConfig {
    /// Default config file location (e.g. ~/.config/recall/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("recall").join("config.toml"))
    }

    /// Load from `path`, or the default location when `None`.
    /// A missing file yields the defaults. Environment overrides are applied.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).or_else(Self::default_path);

        let mut config = match path {
            Some(path) if path.exists() => {
                let content = fs::read_to_string(&path)?;
                let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
                    path: path.clone(),
                    source,
                })?;
                log::info!("Loaded config from {}", path.display());
                config
            }
            _ => Self::default(),
        };

        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply overrides from an environment-like lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(namespace) = lookup(ENV_NAMESPACE).filter(|v| !v.trim().is_empty()) {
            self.namespace = namespace;
        }
    }

    /// Directory holding review state documents
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_local_dir()
                .map(|p| p.join("recall"))
                .ok_or(ConfigError::DataDirNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = RecallConfig::default();
        assert_eq!(config.namespace, "bgde");
        assert_eq!(config.default_direction, Direction::BToA);
        assert_eq!(config.session.max_cards, 20);
        assert!(config.session.shuffle);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RecallConfig::from_toml(
            r#"
            default_direction = "a-b"

            [session]
            max_cards = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.default_direction, Direction::AToB);
        assert_eq!(config.session.max_cards, 5);
        assert!(config.session.shuffle);
        assert_eq!(config.namespace, "bgde");
        assert_eq!(config.language, LanguagePair::new("bg", "de"));
    }

    #[test]
    fn test_invalid_direction_rejected() {
        assert!(RecallConfig::from_toml("default_direction = \"up\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "namespace = \"deen\"\n[language]\na = \"de\"\nb = \"en\"\n").unwrap();

        let config = RecallConfig::load(Some(&path)).unwrap();
        assert_eq!(config.language.code(Direction::AToB), "de-en");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = RecallConfig::load(Some(&temp_dir.path().join("nope.toml"))).unwrap();
        assert_eq!(config.session, SessionConfig::default());
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "namespace = [").unwrap();

        let err = RecallConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut config = RecallConfig::from_toml("namespace = \"file\"").unwrap();
        let env: HashMap<&str, &str> = [(ENV_NAMESPACE, "env"), (ENV_DATA_DIR, "/tmp/recall")]
            .into_iter()
            .collect();

        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.namespace, "env");
        assert_eq!(config.resolve_data_dir().unwrap(), PathBuf::from("/tmp/recall"));
    }
}
