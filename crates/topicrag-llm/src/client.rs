//! Grounded answer generation with bounded retry.
//!
//! One call walks a small state machine: attempt, and on a rate limit or a
//! transport failure wait `2^n` seconds (n counts from 0) before the next
//! attempt, for at most `max_retries` attempts. Unauthorized and any other
//! non-success status end the call immediately.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use topicrag_core::config::GenerationSettings;

use crate::error::GenerationError;
use crate::prompt::{build_request, ChatRequest};
use crate::transport::{ChatTransport, HttpTransport, TransportResponse};

const PLACEHOLDER_KEYS: &[&str] = &["dummy_key", "your_api_key", "your-api-key", "changeme"];

#[derive(Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

pub struct GenerationClient {
    transport: Arc<dyn ChatTransport>,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
    deadline: Option<Duration>,
}

impl GenerationClient {
    /// Client talking to `settings.api_base` over HTTP.
    pub fn from_settings(settings: &GenerationSettings) -> anyhow::Result<Self> {
        let transport = HttpTransport::new(&settings.api_base, Duration::from_secs(settings.request_timeout_secs))?;
        info!(endpoint = transport.endpoint(), model = %settings.model, "generation client ready");
        Ok(Self::with_transport(Arc::new(transport), settings))
    }

    pub fn with_transport(transport: Arc<dyn ChatTransport>, settings: &GenerationSettings) -> Self {
        let api_key = settings.api_key.as_deref().map(str::trim).filter(|k| !is_placeholder(k));
        match api_key {
            None => warn!("OPENAI_API_KEY is not set; generation requests will fail"),
            Some(key) if !key.starts_with("sk-") => {
                warn!("OPENAI_API_KEY does not start with 'sk-'; it may be invalid");
            }
            Some(_) => {}
        }
        Self {
            transport,
            api_key: api_key.map(str::to_string),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            max_retries: settings.max_retries,
            deadline: settings.deadline_secs.map(Duration::from_secs),
        }
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate with the configured retry count and deadline.
    pub async fn answer(&self, query: &str, context: &[String]) -> Result<String, GenerationError> {
        match self.deadline {
            Some(deadline) => self.generate_within(query, context, self.max_retries, deadline).await,
            None => self.generate(query, context, self.max_retries).await,
        }
    }

    /// Like [`generate`](Self::generate) but gives up once `deadline` has
    /// elapsed, including time spent waiting between attempts.
    pub async fn generate_within(
        &self,
        query: &str,
        context: &[String],
        max_retries: u32,
        deadline: Duration,
    ) -> Result<String, GenerationError> {
        tokio::time::timeout(deadline, self.generate(query, context, max_retries))
            .await
            .unwrap_or(Err(GenerationError::DeadlineExceeded(deadline)))
    }

    pub async fn generate(&self, query: &str, context: &[String], max_retries: u32) -> Result<String, GenerationError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(GenerationError::MissingCredentials);
        };
        let request = build_request(&self.model, self.temperature, self.max_tokens, query, context);
        self.run(api_key, &request, max_retries.max(1)).await
    }

    async fn run(&self, api_key: &str, request: &ChatRequest, attempts: u32) -> Result<String, GenerationError> {
        let mut attempt = 0u32;
        loop {
            let retry_left = attempt + 1 < attempts;
            debug!(attempt = attempt + 1, attempts, model = %request.model, "sending completion request");
            match self.transport.send(api_key, request).await {
                Ok(TransportResponse { status, body }) => match status {
                    200..=299 => return parse_completion(&body),
                    401 => return Err(GenerationError::Auth { detail: error_detail(&body) }),
                    429 if retry_left => {
                        warn!(attempt = attempt + 1, "rate limited");
                    }
                    429 => {
                        return Err(GenerationError::RateLimitExceeded { attempts, detail: error_detail(&body) });
                    }
                    _ => return Err(GenerationError::Upstream { status, detail: error_detail(&body) }),
                },
                Err(e) if retry_left => {
                    warn!(attempt = attempt + 1, error = %e, "request failed");
                }
                Err(e) => return Err(GenerationError::TransportExhausted { attempts, detail: e.to_string() }),
            }
            let wait = backoff(attempt);
            info!(secs = wait.as_secs(), "waiting before retry");
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }
}

/// Wait before attempt `attempt + 1`: 1s, 2s, 4s, ...
pub fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt))
}

fn is_placeholder(key: &str) -> bool {
    key.is_empty() || PLACEHOLDER_KEYS.iter().any(|p| key.eq_ignore_ascii_case(p))
}

fn parse_completion(body: &str) -> Result<String, GenerationError> {
    let completion: Completion =
        serde_json::from_str(body).map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;
    completion
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| GenerationError::MalformedResponse("no choices".to_string()))
}

fn error_detail(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.error.message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Unknown error".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}
