//! Key-value persistence interface.
//!
//! Session state is persisted as a handful of string values under fixed keys.
//! The store is synchronous: writes happen on the same call that mutates the
//! in-memory state.

use crate::error::{MnemoError, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// Key holding the serialized map of all sessions.
pub const SESSIONS_KEY: &str = "mnemo_chat_sessions";
/// Key holding the serialized [`Settings`](crate::session::Settings).
pub const SETTINGS_KEY: &str = "mnemo_chat_settings";
/// Key holding the id of the session that was active last.
pub const ACTIVE_SESSION_KEY: &str = "mnemo_active_session";

/// A synchronous string key to string value store.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// A process-local store, used by tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|e| MnemoError::data_access(format!("In-memory store poisoned: {}", e)))
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
