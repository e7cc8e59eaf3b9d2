//! Configuration file management.
//!
//! - `config.toml`: model backend, logging filter, storage location
//! - `secret.json`: API keys (`GEMINI_API_KEY` is used when absent)

use crate::paths::MnemoPaths;
use mnemo_core::error::{MnemoError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Which HTTP backend serves chat requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    #[default]
    Ollama,
    Gemini,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub backend: ModelBackend,
    /// Model name; the backend's default when unset
    pub model: Option<String>,
    /// Base URL override (Ollama host or Gemini API root)
    pub base_url: Option<String>,
    /// HTTP request timeout
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: ModelBackend::default(),
            model: None,
            base_url: None,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Key-value store directory; `MnemoPaths::store_dir()` when unset
    pub data_dir: Option<PathBuf>,
}

/// Root structure of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Loads `config.toml` from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(&MnemoPaths::config_file()?)
    }

    /// Loads configuration from `path`.
    ///
    /// A missing or empty file yields the defaults; a malformed file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("[Config] {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        toml::from_str(&content).map_err(|e| {
            MnemoError::config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Directory for the key-value store.
    pub fn store_dir(&self) -> Result<PathBuf> {
        match &self.storage.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => MnemoPaths::store_dir(),
        }
    }
}

/// Gemini API credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiSecret {
    pub api_key: String,
    #[serde(default)]
    pub model_name: Option<String>,
}

/// Root structure of `secret.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecretConfig {
    #[serde(default)]
    pub gemini: Option<GeminiSecret>,
}

impl SecretConfig {
    /// Loads `secret.json` from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(&MnemoPaths::secret_file()?)
    }

    /// Loads secrets from `path`; a missing file yields no secrets.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            MnemoError::config(format!(
                "Failed to parse configuration file at {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// The Gemini API key from the file, falling back to `GEMINI_API_KEY`.
    pub fn gemini_api_key(&self) -> Option<String> {
        self.gemini
            .as_ref()
            .map(|g| g.api_key.clone())
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::load_from(&temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.model.backend, ModelBackend::Ollama);
        assert_eq!(config.model.timeout_secs, 120);
    }

    #[test]
    fn test_partial_config_is_merged_with_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[model]
backend = "gemini"
model = "gemini-2.0-flash"

[storage]
data_dir = "/tmp/mnemo-store"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();

        assert_eq!(config.model.backend, ModelBackend::Gemini);
        assert_eq!(config.model.model.as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(config.model.timeout_secs, 120);
        assert_eq!(config.logging.filter, "warn");
        assert_eq!(config.store_dir().unwrap(), PathBuf::from("/tmp/mnemo-store"));
    }

    #[test]
    fn test_malformed_config_is_a_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[model\nbackend = ").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_secret_file_provides_gemini_key() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("secret.json");
        fs::write(&path, r#"{"gemini": {"api_key": "abc123"}}"#).unwrap();

        let secrets = SecretConfig::load_from(&path).unwrap();

        assert_eq!(secrets.gemini_api_key().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_missing_secret_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let secrets = SecretConfig::load_from(&temp_dir.path().join("secret.json")).unwrap();
        assert!(secrets.gemini.is_none());
    }
}
