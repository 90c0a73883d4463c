//! Anthropic Messages API.

use serde::{Deserialize, Serialize};

use super::{ChatMessage, LlmProvider, MAX_COMPLETION_TOKENS, provider_error};
use crate::AiError;
use crate::retry::{DEFAULT_MAX_RETRIES, send_with_retry};

/// Model used when `AI_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Completion backend for Anthropic models.
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Creates a provider for `model`, authenticating with `api_key`.
    #[must_use]
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

impl MessagesResponse {
    /// Concatenates the text blocks, one per line. Non-text blocks are
    /// dropped.
    fn into_text(self) -> String {
        let texts: Vec<String> = self
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect();
        texts.join("\n")
    }
}

#[async_trait::async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String, AiError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_COMPLETION_TOKENS,
            system: system_prompt,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = send_with_retry(
            || {
                self.client
                    .post(MESSAGES_URL)
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", API_VERSION)
                    .json(&request)
            },
            DEFAULT_MAX_RETRIES,
        )
        .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(provider_error(status, &body));
        }

        let parsed: MessagesResponse = serde_json::from_str(&body)?;
        Ok(parsed.into_text())
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_text_blocks_and_skips_others() {
        let body = r#"{
            "content": [
                {"type": "text", "text": "{\"summary\": \"a\"}"},
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "done"}
            ]
        }"#;
        let response: MessagesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.into_text(), "{\"summary\": \"a\"}\ndone");
    }

    #[test]
    fn request_puts_system_prompt_at_top_level() {
        let request = MessagesRequest {
            model: DEFAULT_MODEL,
            max_tokens: MAX_COMPLETION_TOKENS,
            system: "be brief",
            messages: [ChatMessage {
                role: "user",
                content: "hi",
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["system"], "be brief");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 1024);
    }
}
