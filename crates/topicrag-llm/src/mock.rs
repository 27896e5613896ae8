//! Scripted transport for exercising the client without a network.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::prompt::ChatRequest;
use crate::transport::{ChatTransport, TransportError, TransportResponse};

type Step = Result<TransportResponse, TransportError>;

/// Replays a fixed sequence of outcomes, one per `send`, and records every
/// request it receives. Sends past the end of the script fail at the
/// transport level.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn respond(self, status: u16, body: impl Into<String>) -> Self {
        self.push(Ok(TransportResponse { status, body: body.into() }))
    }

    /// Queue a 200 whose completion text is `text`.
    #[must_use]
    pub fn complete(self, text: &str) -> Self {
        self.respond(200, completion_body(text))
    }

    #[must_use]
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.push(Err(TransportError(message.into())))
    }

    fn push(self, step: Step) -> Self {
        self.script.lock().unwrap_or_else(PoisonError::into_inner).push_back(step);
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn send(&self, _api_key: &str, request: &ChatRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).push(request.clone());
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(TransportError("script exhausted".to_string())))
    }
}

/// Minimal chat-completions success body.
pub fn completion_body(text: &str) -> String {
    serde_json::json!({
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": text } }]
    })
    .to_string()
}
