//! Session store.
//!
//! Owns every session in memory together with the single active session id,
//! and writes the whole map back to the key-value store after each mutation.

use super::message::Turn;
use super::model::{DEFAULT_SESSION_TITLE, Session, SessionFlags};
use super::settings::Settings;
use crate::error::{MnemoError, Result};
use crate::storage::{ACTIVE_SESSION_KEY, KeyValueStore, SESSIONS_KEY, SETTINGS_KEY};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// CRUD over sessions with write-through persistence.
///
/// Exactly one session is active at any time. Deleting the active session
/// moves the selection to the most recently updated remaining session, or to
/// a freshly created one when none remain.
pub struct SessionStore {
    sessions: HashMap<String, Session>,
    active_id: String,
    settings: Settings,
    kv: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    /// Loads sessions, settings and the active id from `kv`.
    ///
    /// Missing or corrupt values are discarded and replaced by defaults.
    /// If no session exists afterwards, an empty one is created.
    pub fn load(kv: Arc<dyn KeyValueStore>) -> Self {
        let mut sessions: HashMap<String, Session> =
            read_json(kv.as_ref(), SESSIONS_KEY).unwrap_or_default();
        for session in sessions.values_mut() {
            session.normalize();
        }
        let settings: Settings = read_json(kv.as_ref(), SETTINGS_KEY).unwrap_or_default();
        let stored_active = read_raw(kv.as_ref(), ACTIVE_SESSION_KEY);

        let mut store = Self {
            sessions,
            active_id: String::new(),
            settings,
            kv,
        };

        match stored_active {
            Some(id) if store.sessions.contains_key(&id) => store.active_id = id,
            _ => store.select_fallback(),
        }

        tracing::info!(
            "[SessionStore] Loaded {} session(s), active: {}",
            store.sessions.len(),
            store.active_id
        );

        if let Err(e) = store.persist_sessions() {
            tracing::error!("[SessionStore] Failed to persist after load: {}", e);
        }
        store
    }

    /// Creates an empty session and makes it active.
    pub fn create_session(&mut self) -> Result<&Session> {
        let id = self.transact(|store| {
            let id = store.insert_new_session();
            store.active_id = id.clone();
            Ok(id)
        })?;
        tracing::info!("[SessionStore] Created session {}", id);
        self.get(&id)
    }

    pub fn active_id(&self) -> &str {
        &self.active_id
    }

    pub fn active(&self) -> Result<&Session> {
        self.get(&self.active_id)
    }

    pub fn get(&self, session_id: &str) -> Result<&Session> {
        self.sessions
            .get(session_id)
            .ok_or_else(|| MnemoError::not_found("session", session_id))
    }

    /// All sessions, most recently updated first.
    pub fn list(&self) -> Vec<&Session> {
        let mut sessions: Vec<&Session> = self.sessions.values().collect();
        sessions.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        sessions
    }

    /// Makes `session_id` the active session.
    pub fn switch_to(&mut self, session_id: &str) -> Result<()> {
        self.get(session_id)?;
        self.kv.set(ACTIVE_SESSION_KEY, session_id)?;
        self.active_id = session_id.to_string();
        Ok(())
    }

    pub fn append_turn(&mut self, session_id: &str, turn: Turn) -> Result<()> {
        self.transact(|store| {
            store.session_mut(session_id)?.append_turn(turn);
            Ok(())
        })
    }

    /// Applies `update` to the session's flags and returns the new flags.
    pub fn update_flags<F>(&mut self, session_id: &str, update: F) -> Result<SessionFlags>
    where
        F: FnOnce(&mut SessionFlags),
    {
        self.transact(|store| {
            let session = store.session_mut(session_id)?;
            update(&mut session.flags);
            session.touch();
            Ok(session.flags)
        })
    }

    pub fn rename(&mut self, session_id: &str, title: impl Into<String>) -> Result<()> {
        let title = title.into();
        self.transact(|store| {
            let session = store.session_mut(session_id)?;
            session.title = title;
            session.touch();
            Ok(())
        })
    }

    pub fn set_summary(&mut self, session_id: &str, summary: Option<String>) -> Result<()> {
        self.transact(|store| {
            let session = store.session_mut(session_id)?;
            session.summary = summary;
            session.touch();
            Ok(())
        })
    }

    /// Appends insights not already known to the session; returns those added.
    pub fn merge_insights(
        &mut self,
        session_id: &str,
        insights: Vec<String>,
    ) -> Result<Vec<String>> {
        self.transact(|store| Ok(store.session_mut(session_id)?.merge_insights(insights)))
    }

    pub fn mark_learned(&mut self, session_id: &str) -> Result<()> {
        self.transact(|store| {
            store.session_mut(session_id)?.mark_learned();
            Ok(())
        })
    }

    /// Deletes one session, keeping the active selection valid.
    pub fn delete(&mut self, session_id: &str) -> Result<()> {
        self.transact(|store| {
            if store.sessions.remove(session_id).is_none() {
                return Err(MnemoError::not_found("session", session_id));
            }
            if store.active_id == session_id {
                store.select_fallback();
            }
            Ok(())
        })?;
        tracing::info!(
            "[SessionStore] Deleted session {}, active: {}",
            session_id,
            self.active_id
        );
        Ok(())
    }

    /// Deletes every session and starts over with one empty session.
    pub fn delete_all(&mut self) -> Result<&Session> {
        let removed = self.sessions.len();
        self.transact(|store| {
            store.sessions.clear();
            store.select_fallback();
            Ok(())
        })?;
        tracing::info!("[SessionStore] Deleted {} session(s)", removed);
        self.active()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Applies `update` to the global settings and persists them.
    pub fn update_settings<F>(&mut self, update: F) -> Result<Settings>
    where
        F: FnOnce(&mut Settings) -> Result<()>,
    {
        let mut next = self.settings.clone();
        update(&mut next)?;
        let json = serde_json::to_string(&next)?;
        self.kv.set(SETTINGS_KEY, &json)?;
        self.settings = next;
        Ok(self.settings.clone())
    }

    fn session_mut(&mut self, session_id: &str) -> Result<&mut Session> {
        self.sessions
            .get_mut(session_id)
            .ok_or_else(|| MnemoError::not_found("session", session_id))
    }

    fn insert_new_session(&mut self) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions
            .insert(id.clone(), Session::new(id.clone(), DEFAULT_SESSION_TITLE));
        id
    }

    /// Points the active id at the most recently updated session, creating
    /// one when the store is empty.
    fn select_fallback(&mut self) {
        let next = self.list().first().map(|s| s.id.clone());
        self.active_id = match next {
            Some(id) => id,
            None => self.insert_new_session(),
        };
    }

    /// Runs `mutate` and persists the result. On any error the in-memory
    /// sessions and active id are restored, so memory never runs ahead of
    /// what was written.
    fn transact<T, F>(&mut self, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let sessions = self.sessions.clone();
        let active_id = self.active_id.clone();

        let result = mutate(self).and_then(|value| self.persist_sessions().map(|()| value));
        if let Err(e) = &result {
            tracing::debug!("[SessionStore] Rolling back unsaved change: {}", e);
            self.sessions = sessions;
            self.active_id = active_id;
        }
        result
    }

    fn persist_sessions(&self) -> Result<()> {
        let json = serde_json::to_string(&self.sessions)?;
        self.kv.set(SESSIONS_KEY, &json)?;
        self.kv.set(ACTIVE_SESSION_KEY, &self.active_id)
    }
}

fn read_raw(kv: &dyn KeyValueStore, key: &str) -> Option<String> {
    match kv.get(key) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("[SessionStore] Failed to read '{}', using defaults: {}", key, e);
            None
        }
    }
}

fn read_json<T: DeserializeOwned>(kv: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = read_raw(kv, key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("[SessionStore] Discarding corrupt value under '{}': {}", key, e);
            None
        }
    }
}
