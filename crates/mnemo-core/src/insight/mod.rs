//! Insight extraction.
//!
//! When learning mode is on, every time at least [`LEARNING_THRESHOLD`] new
//! turns have accumulated, the latest turns are distilled by the model into a
//! few short insights that are kept for the lifetime of the session.

use crate::agent::{AgentRequest, ChatAgent, GenerationParams};
use crate::error::Result;
use crate::prompt::render;
use crate::session::Session;

/// Number of unprocessed turns that triggers an extraction.
pub const LEARNING_THRESHOLD: usize = 6;

const INSIGHT_TEMPLATE: &str = r#"Analyze this conversation excerpt and extract 1 to 3 short, durable insights about the user (goals, preferences, facts worth remembering):

{% for turn in turns -%}
{{ turn.role }}: {{ turn.content }}
{% endfor %}
Requirements:
- One insight per line
- No numbering, bullets, headings or any other formatting
- Output ONLY the insights"#;

/// Whether `session` is due for insight extraction.
pub fn should_extract(session: &Session) -> bool {
    session.flags.learning_mode && session.unlearned_turn_count() >= LEARNING_THRESHOLD
}

/// Splits a model reply into insight candidates: one per non-empty line.
pub fn parse_insights(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Distills recent turns into insights.
#[derive(Debug, Default, Clone, Copy)]
pub struct InsightExtractor;

impl InsightExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Asks the model for insights over the last [`LEARNING_THRESHOLD`] turns.
    ///
    /// Returns the raw candidates; deduplication against the session's
    /// existing insights happens when they are merged.
    pub async fn extract(
        &self,
        session: &Session,
        agent: &dyn ChatAgent,
        params: GenerationParams,
    ) -> Result<Vec<String>> {
        let turns = session.turns();
        let recent = &turns[turns.len().saturating_sub(LEARNING_THRESHOLD)..];
        let prompt = render(INSIGHT_TEMPLATE, minijinja::context! { turns => recent })?;

        tracing::debug!(
            "[InsightExtractor] Extracting from {} turn(s) of session {}",
            recent.len(),
            session.id
        );
        let reply = agent.complete(AgentRequest::prompt(prompt, params)).await?;
        Ok(parse_insights(&reply))
    }
}
