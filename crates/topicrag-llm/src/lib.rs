//! Generation client for OpenAI-compatible chat-completions services.

pub mod client;
pub mod error;
pub mod mock;
pub mod prompt;
pub mod transport;

pub use client::GenerationClient;
pub use error::GenerationError;
pub use mock::ScriptedTransport;
pub use transport::{ChatTransport, HttpTransport, TransportError, TransportResponse};
