//! `OpenAI` chat-completions provider, also used for `OpenAI`-compatible
//! servers.

use serde::{Deserialize, Serialize};

use super::{ChatMessage, LlmProvider, MAX_COMPLETION_TOKENS, provider_error};
use crate::AiError;
use crate::retry::{DEFAULT_MAX_RETRIES, send_with_retry};

/// Model used when `AI_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "gpt-4o";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// `OpenAI` API provider.
pub struct OpenAiProvider {
    api_key: Option<String>,
    model: String,
    endpoint: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Creates a new `OpenAI` provider.
    ///
    /// `base_url` replaces `https://api.openai.com/v1` for self-hosted
    /// servers. `api_key` may be `None` for servers that do not check it.
    #[must_use]
    pub fn new(api_key: Option<String>, model: String, base_url: Option<String>) -> Self {
        let base = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            api_key,
            model,
            endpoint: completions_endpoint(&base),
            client: reqwest::Client::new(),
        }
    }
}

fn completions_endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl CompletionResponse {
    /// Content of the first choice, if any.
    fn first_content(self) -> Option<String> {
        self.choices.into_iter().next()?.message.content
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String, AiError> {
        let request = CompletionRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: MAX_COMPLETION_TOKENS,
        };

        let response = send_with_retry(
            || {
                let request = self.client.post(&self.endpoint).json(&request);
                match &self.api_key {
                    Some(key) => request.bearer_auth(key),
                    None => request,
                }
            },
            DEFAULT_MAX_RETRIES,
        )
        .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(provider_error(status, &body));
        }

        let parsed: CompletionResponse = serde_json::from_str(&body)?;
        parsed.first_content().ok_or_else(|| AiError::InvalidOutput {
            message: "completion has no content".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
