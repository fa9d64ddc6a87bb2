//! selfedit-llm: HTTP collaborators for the self-edit lifecycle
//!
//! One [`OpenAiClient`] implements the embedding, generation and response
//! traits of `selfedit-core` against any OpenAI-compatible server.

pub mod client;
pub mod config;
pub mod error;

pub use client::{ChatMessage, OpenAiClient};
pub use config::LlmConfig;
pub use error::{LlmError, Result};
