use std::time::Duration;
use thiserror::Error;

/// Terminal failure of one generation call.
///
/// Every variant is final: the client has already done whatever retrying the
/// variant allows before returning it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("API key not configured; set OPENAI_API_KEY")]
    MissingCredentials,

    #[error("invalid API key: {detail}")]
    Auth { detail: String },

    #[error("rate limit exceeded after {attempts} attempt(s): {detail}")]
    RateLimitExceeded { attempts: u32, detail: String },

    #[error("request failed with status {status}: {detail}")]
    Upstream { status: u16, detail: String },

    #[error("request failed after {attempts} attempt(s): {detail}")]
    TransportExhausted { attempts: u32, detail: String },

    #[error("no answer within {0:?}")]
    DeadlineExceeded(Duration),

    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
}
