//! Process-wide generation and context settings.

use crate::agent::GenerationParams;
use crate::error::{MnemoError, Result};
use serde::{Deserialize, Serialize};

/// Settings shared by every session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Sampling temperature for chat responses
    pub temperature: f32,
    /// Nucleus sampling probability mass
    pub top_p: f32,
    /// Number of highest-probability tokens considered
    pub top_k: u32,
    /// Size of the recent-context window
    pub context_message_count: usize,
    /// Number of turns selected when prioritized memory is enabled
    pub prioritized_context_count: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            context_message_count: 10,
            prioritized_context_count: 5,
        }
    }
}

impl Settings {
    /// Sampling parameters for the main chat call.
    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
        }
    }

    /// Sets a single setting from its camelCase or snake_case name.
    pub fn set_field(&mut self, key: &str, value: &str) -> Result<()> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
            value.trim().parse::<T>().map_err(|_| {
                MnemoError::invalid_input(format!("Invalid value for {}: '{}'", key, value))
            })
        }

        match key {
            "temperature" => self.temperature = parse(key, value)?,
            "topP" | "top_p" => self.top_p = parse(key, value)?,
            "topK" | "top_k" => self.top_k = parse(key, value)?,
            "contextMessageCount" | "context_message_count" => {
                self.context_message_count = parse(key, value)?
            }
            "prioritizedContextCount" | "prioritized_context_count" => {
                self.prioritized_context_count = parse(key, value)?
            }
            _ => {
                return Err(MnemoError::invalid_input(format!(
                    "Unknown setting: {}",
                    key
                )));
            }
        }
        Ok(())
    }
}
