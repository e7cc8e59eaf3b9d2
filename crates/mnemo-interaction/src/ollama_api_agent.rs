//! OllamaApiAgent - REST client for a local Ollama server.
//!
//! Uses `/api/chat`. Streaming responses arrive as newline-delimited JSON
//! objects, each carrying a piece of `message.content`, the last one with
//! `done: true`.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use mnemo_core::agent::{AgentRequest, ChatAgent, GenerationParams, TextStream};
use mnemo_core::error::{MnemoError, Result};
use mnemo_core::session::Turn;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Agent implementation that talks to the Ollama HTTP API.
#[derive(Clone)]
pub struct OllamaApiAgent {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaApiAgent {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    /// Replaces the HTTP client (for timeouts or proxies).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    fn build_request<'a>(&'a self, request: &'a AgentRequest, stream: bool) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: request.turns.iter().map(ChatMessage::from).collect(),
            stream,
            options: Options::from(request.params),
        }
    }

    async fn post(&self, body: &ChatRequest<'_>) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.chat_url())
            .json(body)
            .send()
            .await
            .map_err(|err| MnemoError::Model {
                status_code: None,
                message: format!("Ollama request failed: {err}"),
                is_retryable: err.is_connect() || err.is_timeout(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(MnemoError::Model {
                status_code: Some(status.as_u16()),
                message: format!("Ollama returned {status}: {message}"),
                is_retryable: status.is_server_error(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatAgent for OllamaApiAgent {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: AgentRequest) -> Result<String> {
        let body = self.build_request(&request, false);
        let response = self.post(&body).await?;
        let parsed: ChatChunk = response
            .json()
            .await
            .map_err(|err| MnemoError::model(format!("Failed to parse Ollama response: {err}")))?;
        parsed.into_text()
    }

    async fn stream(&self, request: AgentRequest) -> Result<TextStream> {
        let body = self.build_request(&request, true);
        let response = self.post(&body).await?;

        let bytes = response.bytes_stream().map(|chunk| {
            chunk.map_err(|err| MnemoError::Model {
                status_code: None,
                message: format!("Ollama stream interrupted: {err}"),
                is_retryable: true,
            })
        });

        let lines = stream::unfold(
            (Box::pin(bytes), LineBuffer::default(), false),
            |(mut bytes, mut buffer, finished)| async move {
                loop {
                    if let Some(line) = buffer.next_line() {
                        return Some((Ok(line), (bytes, buffer, finished)));
                    }
                    if finished {
                        return None;
                    }
                    match bytes.next().await {
                        Some(Ok(chunk)) => buffer.push(&chunk),
                        Some(Err(e)) => return Some((Err(e), (bytes, buffer, true))),
                        None => {
                            buffer.finish();
                            return buffer
                                .next_line()
                                .map(|line| (Ok(line), (bytes, buffer, true)));
                        }
                    }
                }
            },
        );

        let texts = lines.filter_map(|line| async move {
            match line.and_then(|l| parse_stream_line(&l)) {
                Ok(Some(text)) if !text.is_empty() => Some(Ok(text)),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            }
        });

        Ok(Box::pin(texts))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: Options,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a Turn> for ChatMessage<'a> {
    fn from(turn: &'a Turn) -> Self {
        Self {
            role: turn.role().as_str(),
            content: turn.content(),
        }
    }
}

#[derive(Serialize)]
struct Options {
    temperature: f32,
    top_p: f32,
    top_k: u32,
}

impl From<GenerationParams> for Options {
    fn from(params: GenerationParams) -> Self {
        Self {
            temperature: params.temperature,
            top_p: params.top_p,
            top_k: params.top_k,
        }
    }
}

#[derive(Deserialize)]
struct ChatChunk {
    message: Option<ChunkMessage>,
    #[serde(default)]
    error: Option<String>,
}

impl ChatChunk {
    fn into_text(self) -> Result<String> {
        if let Some(error) = self.error {
            return Err(MnemoError::model(format!("Ollama error: {error}")));
        }
        self.message
            .map(|m| m.content)
            .ok_or_else(|| MnemoError::model("Ollama response has no message"))
    }
}

#[derive(Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Parses one NDJSON line of a streamed chat response.
///
/// Returns `None` for blank lines and for chunks without message content.
fn parse_stream_line(line: &str) -> Result<Option<String>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let chunk: ChatChunk = serde_json::from_str(line)?;
    if let Some(error) = chunk.error {
        return Err(MnemoError::model(format!("Ollama error: {error}")));
    }
    Ok(chunk.message.map(|m| m.content))
}

/// Accumulates raw bytes and hands out complete lines.
#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    fn next_line(&mut self) -> Option<String> {
        let pos = self.pending.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=pos).collect();
        Some(String::from_utf8_lossy(&line[..pos]).into_owned())
    }

    /// Terminates a trailing line that has no newline.
    fn finish(&mut self) {
        if !self.pending.is_empty() {
            self.pending.push(b'\n');
        }
    }
}
