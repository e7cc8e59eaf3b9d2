//! Unified path management for mnemo files.
//!
//! ```text
//! ~/.config/mnemo/             # Config directory
//! ├── config.toml              # Application configuration
//! └── secret.json              # API keys
//!
//! ~/.local/share/mnemo/        # Data directory
//! └── store/                   # Key-value store (sessions, settings)
//! ```

use mnemo_core::error::{MnemoError, Result};
use std::path::PathBuf;

const APP_DIR: &str = "mnemo";

/// Resolves platform-specific mnemo directories via `dirs`.
pub struct MnemoPaths;

impl MnemoPaths {
    /// Returns the mnemo configuration directory (e.g. `~/.config/mnemo/`).
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| MnemoError::config("Cannot find config directory"))
    }

    /// Returns the mnemo data directory (e.g. `~/.local/share/mnemo/`).
    pub fn data_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| MnemoError::config("Cannot find data directory"))
    }

    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the path to the secrets file.
    ///
    /// # Security Note
    ///
    /// Ensure this file has appropriate permissions (e.g., 600).
    pub fn secret_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("secret.json"))
    }

    /// Default root of the file-backed key-value store.
    pub fn store_dir() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("store"))
    }
}
