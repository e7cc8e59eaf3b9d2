//! Infrastructure layer for Mnemo: file-backed persistence, paths and
//! configuration loading.

pub mod config;
pub mod paths;
pub mod storage;

pub use crate::config::{AppConfig, LoggingConfig, ModelBackend, ModelConfig, SecretConfig};
pub use crate::paths::MnemoPaths;
pub use crate::storage::FileKeyValueStore;
