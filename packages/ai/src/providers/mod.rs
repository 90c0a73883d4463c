//! Completion backends behind [`LlmProvider`].
//!
//! Anthropic Messages and `OpenAI` chat-completions are supported. The
//! latter also covers self-hosted servers that speak the same protocol.

pub mod anthropic;
pub mod openai;

use serde::{Deserialize, Serialize};

use crate::AiError;

/// Token cap for one completion. Summaries and predictions are short.
pub const MAX_COMPLETION_TOKENS: u32 = 1024;

/// A text-in, text-out completion backend.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Runs one completion and returns the model's text.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] on transport failures, non-success statuses or
    /// unreadable bodies.
    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String, AiError>;

    /// Provider name used in log lines.
    fn name(&self) -> &'static str;
}

/// One role/content pair, shared by both wire formats.
#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// `{"error": {"message": ...}}`, the error shape of both APIs.
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Builds an [`AiError::Provider`] from a failed response, preferring the
/// API's own error message over the raw body.
fn provider_error(status: reqwest::StatusCode, body: &str) -> AiError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map_or_else(|_| format!("HTTP {status}: {body}"), |e| e.error.message);
    AiError::Provider { message }
}

/// Which backend to build, resolved from environment-style settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSettings {
    /// Anthropic Messages API.
    Anthropic {
        /// `ANTHROPIC_API_KEY`.
        api_key: String,
        /// Model name.
        model: String,
    },
    /// `OpenAI` or a compatible server.
    OpenAi {
        /// `OPENAI_API_KEY`; optional when a base URL is given.
        api_key: Option<String>,
        /// Model name.
        model: String,
        /// `AI_BASE_URL` override.
        base_url: Option<String>,
    },
}

impl ProviderSettings {
    /// Resolves settings through `lookup`, which returns the value of a
    /// variable or `None` when unset or blank.
    ///
    /// `AI_PROVIDER` picks the backend explicitly (`anthropic`/`claude` or
    /// `openai`/`gpt`). Otherwise an Anthropic key wins, then an `OpenAI`
    /// key or base URL. `AI_MODEL` overrides the backend's default model.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Config`] when the chosen backend lacks
    /// credentials or `AI_PROVIDER` names an unknown backend.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AiError> {
        let anthropic_key = lookup("ANTHROPIC_API_KEY");
        let openai_key = lookup("OPENAI_API_KEY");
        let base_url = lookup("AI_BASE_URL");
        let model = lookup("AI_MODEL");

        let backend = match lookup("AI_PROVIDER") {
            Some(explicit) => explicit.to_lowercase(),
            None if anthropic_key.is_some() => "anthropic".to_string(),
            None if openai_key.is_some() || base_url.is_some() => "openai".to_string(),
            None => {
                return Err(AiError::Config {
                    message: "no AI credentials found; set ANTHROPIC_API_KEY, \
                              OPENAI_API_KEY or AI_BASE_URL"
                        .to_string(),
                });
            }
        };

        match backend.as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic {
                api_key: anthropic_key.ok_or_else(|| AiError::Config {
                    message: "ANTHROPIC_API_KEY is not set".to_string(),
                })?,
                model: model.unwrap_or_else(|| anthropic::DEFAULT_MODEL.to_string()),
            }),
            "openai" | "gpt" => {
                if openai_key.is_none() && base_url.is_none() {
                    return Err(AiError::Config {
                        message: "OPENAI_API_KEY is not set".to_string(),
                    });
                }
                Ok(Self::OpenAi {
                    api_key: openai_key,
                    model: model.unwrap_or_else(|| openai::DEFAULT_MODEL.to_string()),
                    base_url,
                })
            }
            other => Err(AiError::Config {
                message: format!("unknown AI_PROVIDER '{other}' (expected anthropic or openai)"),
            }),
        }
    }

    /// Instantiates the backend.
    #[must_use]
    pub fn build(self) -> Box<dyn LlmProvider> {
        match self {
            Self::Anthropic { api_key, model } => {
                Box::new(anthropic::AnthropicProvider::new(api_key, model))
            }
            Self::OpenAi {
                api_key,
                model,
                base_url,
            } => Box::new(openai::OpenAiProvider::new(api_key, model, base_url)),
        }
    }
}

/// Builds a provider from the process environment.
///
/// # Errors
///
/// See [`ProviderSettings::resolve`].
pub fn create_provider_from_env() -> Result<Box<dyn LlmProvider>, AiError> {
    let settings = ProviderSettings::resolve(|name| {
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    })?;
    let provider = settings.build();
    log::info!("Using AI provider: {}", provider.name());
    Ok(provider)
}
