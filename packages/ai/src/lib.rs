#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Summarizer adapters for the signal pipeline.
//!
//! [`llm::LlmSummarizer`] talks to Anthropic Claude, `OpenAI`, or any
//! `OpenAI`-compatible local/self-hosted server (Ollama, vLLM, llama.cpp,
//! LM Studio) via the `AI_BASE_URL` environment variable.
//! [`rules::RuleBasedSummarizer`] answers from fixed keyword rules and
//! needs no network, which makes it the offline default and the test
//! double of choice.

pub mod llm;
pub mod providers;
pub mod retry;
pub mod rules;

use city_pulse_signal::SummarizerError;
use thiserror::Error;

pub use llm::LlmSummarizer;
pub use rules::RuleBasedSummarizer;

/// Errors that can occur during AI operations.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to LLM provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// The model answered with something that could not be used.
    #[error("Invalid model output: {message}")]
    InvalidOutput {
        /// Description of what went wrong.
        message: String,
    },

    /// The request did not complete in time.
    #[error("Request timed out after {seconds}s")]
    Timeout {
        /// The configured limit.
        seconds: u64,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

impl From<AiError> for SummarizerError {
    fn from(value: AiError) -> Self {
        match value {
            AiError::Timeout { .. } => Self::Timeout,
            AiError::Json(e) => Self::InvalidResponse {
                message: e.to_string(),
            },
            AiError::InvalidOutput { message } => Self::InvalidResponse { message },
            other => Self::Provider {
                message: other.to_string(),
            },
        }
    }
}
