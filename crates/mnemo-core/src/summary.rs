//! Rolling conversation summaries.

use crate::agent::{AgentRequest, ChatAgent, GenerationParams};
use crate::error::{MnemoError, Result};
use crate::prompt::render;
use crate::session::Turn;

const SUMMARY_TEMPLATE: &str = r#"Summarize this conversation in a short paragraph (at most 5 sentences):

{% for turn in turns -%}
{{ turn.role }}: {{ turn.content }}
{% endfor %}
Requirements:
- Capture the topics discussed and any decisions or open questions
- Write plain prose, no markdown
- Output ONLY the summary"#;

/// Generates a short summary of a whole conversation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SummaryGenerator;

impl SummaryGenerator {
    pub fn new() -> Self {
        Self
    }

    pub async fn summarize(
        &self,
        turns: &[Turn],
        agent: &dyn ChatAgent,
        params: GenerationParams,
    ) -> Result<String> {
        if turns.is_empty() {
            return Err(MnemoError::invalid_input("Nothing to summarize yet"));
        }

        let prompt = render(SUMMARY_TEMPLATE, minijinja::context! { turns => turns })?;
        let reply = agent.complete(AgentRequest::prompt(prompt, params)).await?;
        let summary = reply.trim();
        if summary.is_empty() {
            return Err(MnemoError::model("Model returned an empty summary"));
        }
        Ok(summary.to_string())
    }
}
