//! Model backends for Mnemo.
//!
//! Concrete [`ChatAgent`] implementations over HTTP, and the factory that
//! picks one from configuration.

pub mod gemini_api_agent;
pub mod ollama_api_agent;

pub use gemini_api_agent::GeminiApiAgent;
pub use ollama_api_agent::OllamaApiAgent;

use mnemo_core::agent::ChatAgent;
use mnemo_core::error::{MnemoError, Result};
use mnemo_infrastructure::config::{DEFAULT_GEMINI_MODEL, DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL};
use mnemo_infrastructure::{ModelBackend, ModelConfig, SecretConfig};
use std::sync::Arc;
use std::time::Duration;

/// Builds the agent selected by `config`.
///
/// Gemini requires an API key from `secret.json` or `GEMINI_API_KEY`.
pub fn build_agent(config: &ModelConfig, secrets: &SecretConfig) -> Result<Arc<dyn ChatAgent>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| MnemoError::config(format!("Failed to build HTTP client: {}", e)))?;

    let agent: Arc<dyn ChatAgent> = match config.backend {
        ModelBackend::Ollama => {
            let base_url = config.base_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL);
            let model = config.model.as_deref().unwrap_or(DEFAULT_OLLAMA_MODEL);
            Arc::new(OllamaApiAgent::new(base_url, model).with_client(client))
        }
        ModelBackend::Gemini => {
            let api_key = secrets.gemini_api_key().ok_or_else(|| {
                MnemoError::config(
                    "Gemini API key not found in secret.json or GEMINI_API_KEY",
                )
            })?;
            let model = config
                .model
                .clone()
                .or_else(|| secrets.gemini.as_ref().and_then(|g| g.model_name.clone()))
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
            let mut agent = GeminiApiAgent::new(api_key, model).with_client(client);
            if let Some(base_url) = &config.base_url {
                agent = agent.with_base_url(base_url.clone());
            }
            Arc::new(agent)
        }
    };

    tracing::info!(
        "[Interaction] Using {:?} backend with model {}",
        config.backend,
        agent.name()
    );
    Ok(agent)
}
