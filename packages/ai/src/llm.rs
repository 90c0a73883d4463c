//! LLM-backed implementations of the pipeline capabilities.

use std::fmt::Write as _;
use std::str::FromStr as _;
use std::time::Duration;

use city_pulse_report_models::Severity;
use city_pulse_signal::{AlertPredictor, SentimentClassifier, Summarizer, SummarizerError};
use city_pulse_signal_models::{CandidateEvent, PredictedAlert, Sentiment, SummaryResponse};
use serde::Deserialize;

use crate::AiError;
use crate::providers::{LlmProvider, create_provider_from_env};

/// Default bound on a single provider call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest description excerpt included per spike in prediction prompts.
const EXCERPT_CHARS: usize = 400;

const SUMMARY_SYSTEM_PROMPT: &str = "You summarize citizen incident reports for a city \
dashboard. Respond with a single JSON object and nothing else, shaped as \
{\"summary\": string, \"severity\": \"Low\" | \"Medium\" | \"High\", \
\"topIssues\": [string]}. Keep the summary under 30 words.";

const SENTIMENT_SYSTEM_PROMPT: &str = "You classify the overall sentiment of citizen posts. \
Answer with exactly one word from: Positive, Neutral, Negative, Frustrated, Concerned, \
Cautious.";

const PREDICTION_SYSTEM_PROMPT: &str = "You forecast civic issues from clusters of recent \
citizen reports. Respond with a JSON array and nothing else. Each element is \
{\"type\": string, \"area\": string, \"message\": string, \"probability\": number \
between 0 and 1, \"timeframe\": string}. Return [] if nothing is worth predicting.";

/// Summarizer, sentiment classifier and alert predictor backed by an
/// [`LlmProvider`].
///
/// Every provider call is bounded by the configured timeout. Retries for
/// transient HTTP failures happen inside the provider.
pub struct LlmSummarizer {
    provider: Box<dyn LlmProvider>,
    timeout: Duration,
}

impl LlmSummarizer {
    /// Wraps an existing provider.
    #[must_use]
    pub fn new(provider: Box<dyn LlmProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Builds a summarizer from the `AI_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Config`] if no provider is configured.
    pub fn from_env(timeout: Duration) -> Result<Self, AiError> {
        Ok(Self::new(create_provider_from_env()?, timeout))
    }

    async fn ask(&self, system_prompt: &str, prompt: &str) -> Result<String, AiError> {
        tokio::time::timeout(self.timeout, self.provider.complete(system_prompt, prompt))
            .await
            .map_err(|_| AiError::Timeout {
                seconds: self.timeout.as_secs(),
            })?
    }
}

/// Builds the user prompt for a summary request.
#[must_use]
pub fn summary_prompt(text: &str, category: Option<&str>, area: Option<&str>) -> String {
    let mut prompt = String::new();
    if let Some(category) = category {
        let _ = writeln!(prompt, "Category: {category}");
    }
    if let Some(area) = area {
        let _ = writeln!(prompt, "Area: {area}");
    }
    let _ = write!(prompt, "Reports:\n{text}");
    prompt
}

fn prediction_prompt(spikes: &[CandidateEvent]) -> String {
    let mut prompt = String::from("Recent report clusters:\n");
    for spike in spikes {
        let excerpt: String = spike.joined_descriptions().chars().take(EXCERPT_CHARS).collect();
        let _ = writeln!(
            prompt,
            "- {} reports of {} in {}: {excerpt}",
            spike.count(),
            spike.category_key(),
            spike.location_key()
        );
    }
    prompt
}

/// Returns the outermost `open`..`close` delimited slice of `text`.
///
/// Models often wrap JSON in prose or code fences; this strips both.
#[must_use]
pub fn extract_json(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSummary {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default, alias = "top_issues")]
    top_issues: Vec<String>,
}

/// Parses a model answer into a [`SummaryResponse`].
///
/// Severity is matched case-insensitively; an unrecognized severity is
/// dropped rather than failing the whole response.
///
/// # Errors
///
/// Returns [`AiError::InvalidOutput`] if the answer has no JSON object and
/// [`AiError::Json`] if the object is malformed.
pub fn parse_summary(text: &str) -> Result<SummaryResponse, AiError> {
    let json = extract_json(text, '{', '}').ok_or_else(|| AiError::InvalidOutput {
        message: "no JSON object in summary response".to_string(),
    })?;
    let raw: RawSummary = serde_json::from_str(json)?;

    let severity = raw.severity.as_deref().and_then(|s| {
        Severity::from_str(s.trim())
            .inspect_err(|_| log::debug!("Ignoring unknown severity {s:?}"))
            .ok()
    });

    Ok(SummaryResponse {
        summary: raw.summary,
        severity,
        top_issues: raw.top_issues,
    })
}

/// Parses a one-word sentiment answer. The first recognized word wins.
///
/// # Errors
///
/// Returns [`AiError::InvalidOutput`] if no sentiment label is present.
pub fn parse_sentiment(text: &str) -> Result<Sentiment, AiError> {
    text.split(|c: char| !c.is_alphabetic())
        .find_map(|word| Sentiment::from_str(word).ok())
        .ok_or_else(|| AiError::InvalidOutput {
            message: format!("no sentiment label in {text:?}"),
        })
}

/// Parses a JSON array of predicted alerts.
///
/// # Errors
///
/// Returns [`AiError::InvalidOutput`] if the answer has no JSON array and
/// [`AiError::Json`] if the array is malformed.
pub fn parse_predictions(text: &str) -> Result<Vec<PredictedAlert>, AiError> {
    let json = extract_json(text, '[', ']').ok_or_else(|| AiError::InvalidOutput {
        message: "no JSON array in prediction response".to_string(),
    })?;
    Ok(serde_json::from_str(json)?)
}

#[async_trait::async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(
        &self,
        text: &str,
        category: Option<&str>,
        area: Option<&str>,
    ) -> Result<SummaryResponse, SummarizerError> {
        let answer = self
            .ask(SUMMARY_SYSTEM_PROMPT, &summary_prompt(text, category, area))
            .await?;
        Ok(parse_summary(&answer)?)
    }
}

#[async_trait::async_trait]
impl SentimentClassifier for LlmSummarizer {
    async fn classify(&self, text: &str) -> Result<Sentiment, SummarizerError> {
        let answer = self.ask(SENTIMENT_SYSTEM_PROMPT, text).await?;
        Ok(parse_sentiment(&answer)?)
    }
}

#[async_trait::async_trait]
impl AlertPredictor for LlmSummarizer {
    async fn predict(
        &self,
        spikes: &[CandidateEvent],
    ) -> Result<Vec<PredictedAlert>, SummarizerError> {
        let answer = self
            .ask(PREDICTION_SYSTEM_PROMPT, &prediction_prompt(spikes))
            .await?;
        Ok(parse_predictions(&answer)?)
    }
}
