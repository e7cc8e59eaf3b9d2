//! A scripted in-process agent for tests.

use super::{AgentRequest, ChatAgent, TextStream};
use crate::error::{MnemoError, Result};
use async_trait::async_trait;
use futures::stream;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum Scripted {
    Reply(String),
    Chunks(Vec<String>),
    Error(String),
    /// Chunks followed by a mid-stream failure.
    Interrupted(Vec<String>, String),
}

/// Replays queued replies in order and records every request it receives.
///
/// Once the queue is empty every call fails with a model error.
#[derive(Debug, Default)]
pub struct ScriptedAgent {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<AgentRequest>>,
}

impl ScriptedAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.push(Scripted::Reply(reply.into()));
    }

    /// Queues a reply that `stream` delivers as the given chunks.
    pub fn push_chunks<I, S>(&self, chunks: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(Scripted::Chunks(chunks.into_iter().map(Into::into).collect()));
    }

    pub fn push_error(&self, message: impl Into<String>) {
        self.push(Scripted::Error(message.into()));
    }

    /// Queues a stream that delivers `chunks` and then fails with `message`.
    pub fn push_interrupted<I, S>(&self, chunks: I, message: impl Into<String>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(Scripted::Interrupted(
            chunks.into_iter().map(Into::into).collect(),
            message.into(),
        ));
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<AgentRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    /// Number of scripted replies not consumed yet.
    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or_default()
    }

    fn push(&self, item: Scripted) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(item);
        }
    }

    /// Pops the next scripted item as the sequence of stream items it yields.
    fn next(&self, request: AgentRequest) -> Result<Vec<Result<String>>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        let item = self
            .script
            .lock()
            .map_err(|e| MnemoError::internal(e.to_string()))?
            .pop_front();
        match item {
            Some(Scripted::Error(message)) => Err(retryable(message)),
            Some(Scripted::Reply(text)) => Ok(vec![Ok(text)]),
            Some(Scripted::Chunks(chunks)) => Ok(chunks.into_iter().map(Ok).collect()),
            Some(Scripted::Interrupted(chunks, message)) => {
                let mut items: Vec<Result<String>> = chunks.into_iter().map(Ok).collect();
                items.push(Err(retryable(message)));
                Ok(items)
            }
            None => Err(MnemoError::model("no scripted reply left")),
        }
    }
}

fn retryable(message: String) -> MnemoError {
    MnemoError::Model {
        status_code: None,
        message,
        is_retryable: true,
    }
}

#[async_trait]
impl ChatAgent for ScriptedAgent {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: AgentRequest) -> Result<String> {
        self.next(request)?.into_iter().collect()
    }

    async fn stream(&self, request: AgentRequest) -> Result<TextStream> {
        Ok(Box::pin(stream::iter(self.next(request)?)))
    }
}
