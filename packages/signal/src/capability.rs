//! Injected capabilities the pipeline calls out to.
//!
//! The pipeline only ever sees these traits. Concrete implementations (LLM
//! backed or rule based) live in other crates and are passed in as trait
//! objects.

use city_pulse_signal_models::{CandidateEvent, PredictedAlert, Sentiment, SummaryResponse};
use thiserror::Error;

/// Errors a capability call can produce.
///
/// These never escape the pipeline; every caller substitutes a fallback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SummarizerError {
    /// The call did not finish before its deadline.
    #[error("Summarizer call timed out")]
    Timeout,

    /// The backing provider reported an error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// The provider answered but the answer could not be interpreted.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Description of what went wrong.
        message: String,
    },
}

/// Summarizes a block of report text.
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    /// Produces a summary for `text`, optionally scoped to a category and
    /// area.
    ///
    /// # Errors
    ///
    /// Returns [`SummarizerError`] if the summary could not be produced.
    async fn summarize(
        &self,
        text: &str,
        category: Option<&str>,
        area: Option<&str>,
    ) -> Result<SummaryResponse, SummarizerError>;
}

/// Classifies the overall sentiment of a block of text.
#[async_trait::async_trait]
pub trait SentimentClassifier: Send + Sync {
    /// Returns the sentiment of `text`.
    ///
    /// # Errors
    ///
    /// Returns [`SummarizerError`] if classification failed.
    async fn classify(&self, text: &str) -> Result<Sentiment, SummarizerError>;
}

/// Proposes predictive alerts for detected spikes.
#[async_trait::async_trait]
pub trait AlertPredictor: Send + Sync {
    /// Returns alerts predicted from `spikes`. An empty vector means the
    /// predictor had nothing to add.
    ///
    /// # Errors
    ///
    /// Returns [`SummarizerError`] if prediction failed.
    async fn predict(
        &self,
        spikes: &[CandidateEvent],
    ) -> Result<Vec<PredictedAlert>, SummarizerError>;
}
