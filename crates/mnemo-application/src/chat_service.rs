//! Chat use case.
//!
//! One `submit` call is one logical turn: context assembly, the user turn,
//! the streamed model response, the assistant turn and the learning hook,
//! strictly in that order. `submit` takes `&mut self`, so a second prompt
//! cannot be sent while one is outstanding.

use futures::StreamExt;
use mnemo_core::agent::{AgentRequest, ChatAgent};
use mnemo_core::context::{ContextBuilder, ContextInput, ContextStrategy};
use mnemo_core::error::{MnemoError, Result};
use mnemo_core::insight::{InsightExtractor, should_extract};
use mnemo_core::session::{
    DEFAULT_SESSION_TITLE, Session, SessionFlags, SessionStore, Settings, Turn,
};
use mnemo_core::summary::SummaryGenerator;
use std::sync::Arc;

/// Maximum characters of the first prompt used as a session title.
const TITLE_CHARS: usize = 40;

/// Result of a successful [`ChatService::submit`].
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub session_id: String,
    /// Full assistant response
    pub response: String,
    /// How the context window was chosen
    pub strategy: ContextStrategy,
    /// Number of context turns sent ahead of the prompt
    pub context_len: usize,
    /// Insights added by the learning hook during this turn
    pub learned: Vec<String>,
}

/// Coordinates the session store with the model backend.
pub struct ChatService {
    store: SessionStore,
    agent: Arc<dyn ChatAgent>,
    context_builder: ContextBuilder,
    extractor: InsightExtractor,
    summarizer: SummaryGenerator,
}

impl ChatService {
    pub fn new(store: SessionStore, agent: Arc<dyn ChatAgent>) -> Self {
        Self {
            store,
            agent,
            context_builder: ContextBuilder::new(),
            extractor: InsightExtractor::new(),
            summarizer: SummaryGenerator::new(),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn agent_name(&self) -> &str {
        self.agent.name()
    }

    pub fn active(&self) -> Result<&Session> {
        self.store.active()
    }

    pub fn sessions(&self) -> Vec<&Session> {
        self.store.list()
    }

    pub fn settings(&self) -> &Settings {
        self.store.settings()
    }

    pub fn new_session(&mut self) -> Result<&Session> {
        self.store.create_session()
    }

    pub fn switch_session(&mut self, session_id: &str) -> Result<()> {
        self.store.switch_to(session_id)
    }

    pub fn delete_session(&mut self, session_id: &str) -> Result<()> {
        self.store.delete(session_id)
    }

    pub fn delete_all(&mut self) -> Result<&Session> {
        self.store.delete_all()
    }

    /// Updates the flags of the active session.
    pub fn update_flags<F>(&mut self, update: F) -> Result<SessionFlags>
    where
        F: FnOnce(&mut SessionFlags),
    {
        let session_id = self.store.active_id().to_string();
        self.store.update_flags(&session_id, update)
    }

    pub fn update_settings<F>(&mut self, update: F) -> Result<Settings>
    where
        F: FnOnce(&mut Settings) -> Result<()>,
    {
        self.store.update_settings(update)
    }

    /// Sends `prompt` in the active session, forwarding response chunks to
    /// `on_chunk` as they arrive.
    ///
    /// Context selection and learning degrade silently. A failure of the main
    /// model call is returned; the user turn stays recorded.
    pub async fn submit<F>(&mut self, prompt: &str, mut on_chunk: F) -> Result<SubmitOutcome>
    where
        F: FnMut(&str),
    {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(MnemoError::invalid_input("Prompt must not be empty"));
        }

        let session_id = self.store.active_id().to_string();
        let settings = self.store.settings().clone();

        let (window, is_first_turn) = {
            let session = self.store.get(&session_id)?;
            let window = self
                .context_builder
                .build(
                    ContextInput::from_session(session, prompt),
                    &settings,
                    self.agent.as_ref(),
                )
                .await;
            let is_first_turn =
                session.turn_count() == 0 && session.title == DEFAULT_SESSION_TITLE;
            (window, is_first_turn)
        };

        self.store.append_turn(&session_id, Turn::user(prompt))?;
        if is_first_turn {
            self.store.rename(&session_id, derive_title(prompt))?;
        }

        let strategy = window.strategy.clone();
        let context_len = window.len();
        tracing::debug!(
            "[ChatService] Sending prompt with {} context turn(s) ({:?})",
            context_len,
            strategy
        );

        let mut turns = window.into_turns();
        turns.push(Turn::user(prompt));
        let request = AgentRequest::new(turns, settings.generation_params());

        let mut stream = self.agent.stream(request).await?;
        let mut response = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            on_chunk(&chunk);
            response.push_str(&chunk);
        }

        if response.trim().is_empty() {
            return Err(MnemoError::model("Model returned an empty response"));
        }
        self.store
            .append_turn(&session_id, Turn::assistant(response.clone()))?;

        let learned = self.run_learning_hook(&session_id).await;

        Ok(SubmitOutcome {
            session_id,
            response,
            strategy,
            context_len,
            learned,
        })
    }

    /// Generates a summary of the active session and stores it.
    pub async fn summarize_active(&mut self) -> Result<String> {
        let session_id = self.store.active_id().to_string();
        let params = self.store.settings().generation_params();

        let summary = {
            let session = self.store.get(&session_id)?;
            self.summarizer
                .summarize(session.turns(), self.agent.as_ref(), params)
                .await?
        };

        self.store.set_summary(&session_id, Some(summary.clone()))?;
        Ok(summary)
    }

    /// Post-response hook: extracts insights when the session is due.
    ///
    /// Failures are logged and leave the learned-turn counter untouched, so
    /// the next completed turn tries again.
    async fn run_learning_hook(&mut self, session_id: &str) -> Vec<String> {
        let params = self.store.settings().generation_params();

        let candidates = {
            let Ok(session) = self.store.get(session_id) else {
                return Vec::new();
            };
            if !should_extract(session) {
                return Vec::new();
            }
            match self
                .extractor
                .extract(session, self.agent.as_ref(), params)
                .await
            {
                Ok(candidates) => candidates,
                Err(e) => {
                    tracing::warn!("[ChatService] Insight extraction failed: {}", e);
                    return Vec::new();
                }
            }
        };

        let added = match self.store.merge_insights(session_id, candidates) {
            Ok(added) => added,
            Err(e) => {
                tracing::warn!("[ChatService] Failed to store insights: {}", e);
                return Vec::new();
            }
        };
        if let Err(e) = self.store.mark_learned(session_id) {
            tracing::warn!("[ChatService] Failed to record learning progress: {}", e);
        }

        tracing::info!(
            "[ChatService] Learned {} new insight(s) in session {}",
            added.len(),
            session_id
        );
        added
    }
}

fn derive_title(prompt: &str) -> String {
    let first_line = prompt.lines().next().unwrap_or(prompt).trim();
    let mut chars = first_line.chars();
    let head: String = chars.by_ref().take(TITLE_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head.trim_end())
    } else {
        head
    }
}
