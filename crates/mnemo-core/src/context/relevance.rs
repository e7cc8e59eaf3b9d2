//! Relevance selection: the side request that asks the model which prior
//! turns matter for a new prompt, and the parser for its reply.

use crate::error::Result;
use crate::prompt::render;
use crate::session::Turn;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Maximum characters of each prior turn shown to the model.
pub const PREVIEW_CHARS: usize = 100;

static JSON_ARRAY: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\[[^\[\]]*\]").expect("static regex is valid")
});

const RELEVANCE_TEMPLATE: &str = r#"You are selecting conversation history for a chat assistant.

New user message:
{{ prompt }}

Previous messages:
{% for item in previews -%}
[{{ item.index }}] {{ item.role }}: {{ item.preview }}
{% endfor %}
Return the indices of the {{ count }} previous messages most relevant to the new user message as a JSON array of integers, for example [0, 3, 4].
IMPORTANT: Output ONLY the JSON array, no explanation."#;

#[derive(Serialize)]
struct Preview {
    index: usize,
    role: &'static str,
    preview: String,
}

/// Outcome of interpreting the model's relevance reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelevanceParse {
    /// Usable history indices, ascending.
    Selected(Vec<usize>),
    /// The reply could not be used; the reason is for logs.
    Rejected(String),
}

/// Renders the relevance side request for `prompt` over `history`.
pub fn relevance_prompt(prompt: &str, history: &[Turn], count: usize) -> Result<String> {
    let previews: Vec<Preview> = history
        .iter()
        .enumerate()
        .map(|(index, turn)| Preview {
            index,
            role: turn.role().as_str(),
            preview: turn.preview(PREVIEW_CHARS),
        })
        .collect();

    render(
        RELEVANCE_TEMPLATE,
        minijinja::context! { prompt => prompt, previews => previews, count => count },
    )
}

/// Parses the index array in `reply` into history indices.
///
/// Non-integer, negative and out-of-range entries are dropped, as are
/// repeats. At most `limit` indices are kept, in the order the model listed
/// them, and the result is sorted ascending so chronology is preserved.
pub fn parse_relevance(reply: &str, history_len: usize, limit: usize) -> RelevanceParse {
    let (values, source) = match extract_array(reply) {
        Ok(found) => found,
        Err(reason) => return RelevanceParse::Rejected(reason),
    };

    let mut seen = HashSet::new();
    let mut indices: Vec<usize> = values
        .iter()
        .filter_map(|v| v.as_u64())
        .filter_map(|v| usize::try_from(v).ok())
        .filter(|&i| i < history_len && seen.insert(i))
        .take(limit)
        .collect();

    if indices.is_empty() {
        return RelevanceParse::Rejected(format!("no valid indices in {}", source));
    }

    indices.sort_unstable();
    RelevanceParse::Selected(indices)
}

/// Reads the index array out of a reply.
///
/// A reply that is exactly a JSON array is used as is. Otherwise the last
/// bracketed group in the reply is taken.
fn extract_array(reply: &str) -> std::result::Result<(Vec<serde_json::Value>, String), String> {
    let trimmed = reply.trim();
    if let Ok(values) = serde_json::from_str::<Vec<serde_json::Value>>(trimmed) {
        return Ok((values, trimmed.to_string()));
    }

    let array = JSON_ARRAY
        .find_iter(reply)
        .last()
        .ok_or_else(|| "reply contains no JSON array".to_string())?;
    serde_json::from_str(array.as_str())
        .map(|values| (values, array.as_str().to_string()))
        .map_err(|e| format!("invalid index array: {}", e))
}
