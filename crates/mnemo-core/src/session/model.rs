//! Session domain model.
//!
//! A session is one named conversation plus the memory state derived from it:
//! learned insights, an optional rolling summary and the per-session toggles
//! that control how context is assembled.

use super::message::Turn;
use serde::{Deserialize, Serialize};

/// Title given to sessions until the first prompt names them.
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

/// Per-session switches controlling context assembly and learning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionFlags {
    /// Send prior turns as context at all.
    pub use_memory: bool,
    /// Let the model pick the most relevant prior turns instead of the latest ones.
    pub prioritized_memory: bool,
    /// Skip every form of context for the lowest latency.
    pub fast_mode: bool,
    /// Periodically distill recent turns into insights.
    pub learning_mode: bool,
}

impl Default for SessionFlags {
    fn default() -> Self {
        Self {
            use_memory: true,
            prioritized_memory: false,
            fast_mode: false,
            learning_mode: false,
        }
    }
}

impl SessionFlags {
    /// Whether any history at all may be sent with the next prompt.
    pub fn sends_context(&self) -> bool {
        self.use_memory && !self.fast_mode
    }
}

/// Represents a chat session.
///
/// Turns are append-only: the only way to remove them is to delete the
/// whole session through the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Unique session identifier (UUID format)
    pub id: String,
    /// Human-readable session title
    pub title: String,
    #[serde(default, rename = "messages")]
    turns: Vec<Turn>,
    /// Rolling summary of the conversation, if one was generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(flatten)]
    pub flags: SessionFlags,
    #[serde(default)]
    insights: Vec<String>,
    #[serde(default)]
    last_learned_message_count: usize,
    /// Timestamp when the session was created (RFC 3339)
    pub created_at: String,
    /// Timestamp of the last mutation (RFC 3339)
    pub updated_at: String,
}

impl Session {
    /// Creates an empty session with default flags.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: id.into(),
            title: title.into(),
            turns: Vec::new(),
            summary: None,
            flags: SessionFlags::default(),
            insights: Vec::new(),
            last_learned_message_count: 0,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    pub fn insights(&self) -> &[String] {
        &self.insights
    }

    pub fn last_learned_message_count(&self) -> usize {
        self.last_learned_message_count
    }

    /// Number of turns appended since insights were last extracted.
    pub fn unlearned_turn_count(&self) -> usize {
        self.turns
            .len()
            .saturating_sub(self.last_learned_message_count)
    }

    pub fn append_turn(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.touch();
    }

    /// Appends every insight not already present (exact string match) and
    /// returns the ones that were added.
    pub fn merge_insights<I>(&mut self, candidates: I) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut added = Vec::new();
        for insight in candidates {
            if self.insights.contains(&insight) {
                continue;
            }
            self.insights.push(insight.clone());
            added.push(insight);
        }
        if !added.is_empty() {
            self.touch();
        }
        added
    }

    /// Records that every current turn has been processed for learning.
    pub fn mark_learned(&mut self) {
        self.last_learned_message_count = self.turns.len();
        self.touch();
    }

    /// Restores invariants on data that came from storage.
    pub(crate) fn normalize(&mut self) {
        if self.last_learned_message_count > self.turns.len() {
            self.last_learned_message_count = self.turns.len();
        }
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_defaults() {
        let session = Session::new("s1", DEFAULT_SESSION_TITLE);
        assert_eq!(session.turn_count(), 0);
        assert!(session.insights().is_empty());
        assert!(session.flags.use_memory);
        assert!(!session.flags.prioritized_memory);
        assert!(!session.flags.fast_mode);
        assert!(!session.flags.learning_mode);
        assert_eq!(session.last_learned_message_count(), 0);
    }

    #[test]
    fn test_merge_insights_skips_exact_duplicates() {
        let mut session = Session::new("s1", "t");
        let added = session.merge_insights(vec!["Likes Rust".to_string()]);
        assert_eq!(added, vec!["Likes Rust".to_string()]);

        let added = session.merge_insights(vec![
            "Likes Rust".to_string(),
            "likes rust".to_string(),
        ]);
        assert_eq!(added, vec!["likes rust".to_string()]);
        assert_eq!(session.insights().len(), 2);

        let before = session.insights().to_vec();
        let added = session.merge_insights(vec!["Likes Rust".to_string()]);
        assert!(added.is_empty());
        assert_eq!(session.insights(), before.as_slice());
    }

    #[test]
    fn test_unlearned_turn_count_tracks_mark_learned() {
        let mut session = Session::new("s1", "t");
        for i in 0..4 {
            session.append_turn(Turn::user(format!("m{}", i)));
        }
        assert_eq!(session.unlearned_turn_count(), 4);
        session.mark_learned();
        assert_eq!(session.unlearned_turn_count(), 0);
        session.append_turn(Turn::assistant("reply"));
        assert_eq!(session.unlearned_turn_count(), 1);
    }

    #[test]
    fn test_json_uses_camel_case_flags() {
        let mut session = Session::new("s1", "t");
        session.flags.fast_mode = true;
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["fastMode"], true);
        assert_eq!(value["useMemory"], true);
        assert_eq!(value["lastLearnedMessageCount"], 0);
        assert!(value["messages"].is_array());
    }

    #[test]
    fn test_normalize_clamps_learned_count() {
        let json = r#"{
            "id": "s1",
            "title": "t",
            "messages": [{"role": "user", "content": "hi"}],
            "lastLearnedMessageCount": 9,
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        }"#;
        let mut session: Session = serde_json::from_str(json).unwrap();
        session.normalize();
        assert_eq!(session.last_learned_message_count(), 1);
        assert!(session.flags.use_memory);
    }
}
