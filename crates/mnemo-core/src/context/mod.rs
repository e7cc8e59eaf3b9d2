//! Context assembly for the next model call.
//!
//! Decides which prior turns accompany a new prompt. The rules, in order:
//!
//! 1. Fast mode or memory disabled: no context at all.
//! 2. Learned insights become a synthetic user/assistant exchange at the front.
//! 3. Without prioritized memory, the last `context_message_count` turns follow.
//! 4. With prioritized memory and enough history, the model picks the
//!    `prioritized_context_count` most relevant turns. Any failure there falls
//!    back to rule 3.

mod relevance;

pub use relevance::{PREVIEW_CHARS, RelevanceParse, parse_relevance, relevance_prompt};

use crate::agent::{AgentRequest, ChatAgent};
use crate::session::{Session, SessionFlags, Settings, Turn};

/// Which rule produced a [`ContextWindow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextStrategy {
    /// Fast mode or memory disabled.
    Disabled,
    /// Sliding window over the most recent turns.
    Recent,
    /// Turns chosen by the relevance side request.
    Prioritized,
    /// Relevance selection failed; sliding window used instead.
    RecentFallback { reason: String },
}

/// The turns to send ahead of a new prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextWindow {
    /// Synthetic exchange carrying learned insights (empty or two turns).
    pub insight_turns: Vec<Turn>,
    /// Selected prior turns, chronological.
    pub history: Vec<Turn>,
    pub strategy: ContextStrategy,
}

impl ContextWindow {
    fn disabled() -> Self {
        Self {
            insight_turns: Vec::new(),
            history: Vec::new(),
            strategy: ContextStrategy::Disabled,
        }
    }

    pub fn len(&self) -> usize {
        self.insight_turns.len() + self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All context turns in send order: insights first, then history.
    pub fn into_turns(self) -> Vec<Turn> {
        let mut turns = self.insight_turns;
        turns.extend(self.history);
        turns
    }
}

/// What the builder needs to know about the conversation.
#[derive(Debug, Clone, Copy)]
pub struct ContextInput<'a> {
    /// The prompt about to be sent.
    pub prompt: &'a str,
    /// Every prior turn, excluding `prompt`.
    pub history: &'a [Turn],
    pub flags: SessionFlags,
    pub insights: &'a [String],
}

impl<'a> ContextInput<'a> {
    /// Input for sending `prompt` in `session` before it has been appended.
    pub fn from_session(session: &'a Session, prompt: &'a str) -> Self {
        Self {
            prompt,
            history: session.turns(),
            flags: session.flags,
            insights: session.insights(),
        }
    }
}

/// Returns the last `count` turns of `history`, oldest first.
pub fn recent_window(history: &[Turn], count: usize) -> Vec<Turn> {
    let start = history.len().saturating_sub(count);
    history[start..].to_vec()
}

/// Builds the synthetic exchange that carries learned insights.
pub fn insight_turns(insights: &[String]) -> Vec<Turn> {
    if insights.is_empty() {
        return Vec::new();
    }

    let listed: Vec<String> = insights.iter().map(|i| format!("- {}", i)).collect();
    vec![
        Turn::user(format!(
            "Here is what you have learned about me from our earlier conversation:\n{}",
            listed.join("\n")
        )),
        Turn::assistant("Understood. I will keep these points in mind."),
    ]
}

/// Assembles context windows.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContextBuilder;

impl ContextBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Builds the context for `input`.
    ///
    /// Never fails: a failed or unusable relevance request degrades to the
    /// recent-turns window and is only logged.
    pub async fn build(
        &self,
        input: ContextInput<'_>,
        settings: &Settings,
        agent: &dyn ChatAgent,
    ) -> ContextWindow {
        if !input.flags.sends_context() {
            tracing::debug!(
                "[ContextBuilder] Context disabled (fast_mode={}, use_memory={})",
                input.flags.fast_mode,
                input.flags.use_memory
            );
            return ContextWindow::disabled();
        }

        let insight_turns = insight_turns(input.insights);
        let history = input.history;
        let recent = || recent_window(history, settings.context_message_count);

        if !input.flags.prioritized_memory
            || history.len() <= settings.prioritized_context_count
        {
            return ContextWindow {
                insight_turns,
                history: recent(),
                strategy: ContextStrategy::Recent,
            };
        }

        match self.select_relevant(&input, settings, agent).await {
            RelevanceParse::Selected(indices) => {
                tracing::debug!("[ContextBuilder] Prioritized turns: {:?}", indices);
                ContextWindow {
                    insight_turns,
                    history: indices.into_iter().map(|i| history[i].clone()).collect(),
                    strategy: ContextStrategy::Prioritized,
                }
            }
            RelevanceParse::Rejected(reason) => {
                tracing::warn!(
                    "[ContextBuilder] Relevance selection failed, using recent turns: {}",
                    reason
                );
                ContextWindow {
                    insight_turns,
                    history: recent(),
                    strategy: ContextStrategy::RecentFallback { reason },
                }
            }
        }
    }

    async fn select_relevant(
        &self,
        input: &ContextInput<'_>,
        settings: &Settings,
        agent: &dyn ChatAgent,
    ) -> RelevanceParse {
        let count = settings.prioritized_context_count;
        let prompt = match relevance_prompt(input.prompt, input.history, count) {
            Ok(prompt) => prompt,
            Err(e) => return RelevanceParse::Rejected(e.to_string()),
        };

        let request = AgentRequest::prompt(prompt, settings.generation_params().deterministic());
        match agent.complete(request).await {
            Ok(reply) => parse_relevance(&reply, input.history.len(), count),
            Err(e) => RelevanceParse::Rejected(format!("relevance request failed: {}", e)),
        }
    }
}
