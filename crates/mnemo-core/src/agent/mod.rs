//! Model invocation interface.
//!
//! The context builder, insight extractor and summary generator only consume
//! this trait; concrete HTTP backends live in `mnemo-interaction`.

use crate::error::Result;
use crate::session::Turn;
use async_trait::async_trait;
use futures::stream::{self, BoxStream};

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Incremental text chunks of a streamed response.
pub type TextStream = BoxStream<'static, Result<String>>;

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
}

impl GenerationParams {
    /// Same sampling window with temperature forced to zero, for side requests
    /// whose output is parsed.
    pub fn deterministic(self) -> Self {
        Self {
            temperature: 0.0,
            ..self
        }
    }
}

/// A single request to a chat model.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRequest {
    /// Role-tagged turns, oldest first. The last turn is the prompt.
    pub turns: Vec<Turn>,
    pub params: GenerationParams,
}

impl AgentRequest {
    pub fn new(turns: Vec<Turn>, params: GenerationParams) -> Self {
        Self { turns, params }
    }

    /// A request consisting of one user prompt.
    pub fn prompt(text: impl Into<String>, params: GenerationParams) -> Self {
        Self::new(vec![Turn::user(text)], params)
    }
}

/// A chat model backend.
#[async_trait]
pub trait ChatAgent: Send + Sync {
    /// Human-readable backend/model name for logs.
    fn name(&self) -> &str;

    /// Runs the request and returns the full response text.
    async fn complete(&self, request: AgentRequest) -> Result<String>;

    /// Runs the request and yields the response as it is produced.
    ///
    /// Backends without native streaming return the complete response as a
    /// single chunk.
    async fn stream(&self, request: AgentRequest) -> Result<TextStream> {
        let text = self.complete(request).await?;
        Ok(Box::pin(stream::once(async move { Ok(text) })))
    }
}
