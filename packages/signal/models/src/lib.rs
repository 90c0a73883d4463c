#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Input and output types for the report aggregation pipeline.
//!
//! Defines the grouping/spike intermediates ([`Buckets`],
//! [`CandidateEvent`]), the pipeline options, and every user-facing record
//! the pipeline produces: synthesized events, alerts, notifications, area
//! summaries, city digests, and mood entries.

pub mod bucket;

use chrono::{DateTime, TimeDelta, Utc};
use city_pulse_report_models::Severity;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use bucket::{Bucket, BucketKey, Buckets, CandidateEvent};

/// Default recency window for event synthesis, in minutes.
pub const DEFAULT_SYNTHESIS_WINDOW_MINUTES: i64 = 30;

/// Default recency window for predictive alerts, in minutes.
pub const DEFAULT_ALERT_WINDOW_MINUTES: i64 = 60;

/// Default minimum bucket size to count as a spike.
pub const DEFAULT_SPIKE_THRESHOLD: usize = 3;

/// Options controlling a single aggregation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    window: TimeDelta,
    threshold: usize,
    now: DateTime<Utc>,
    summarizer_deadline: Option<std::time::Duration>,
}

impl PipelineOptions {
    /// Creates validated options.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidOptionsError`] if `window` is not positive or
    /// `threshold` is zero.
    pub fn new(
        window: TimeDelta,
        threshold: usize,
        now: DateTime<Utc>,
    ) -> Result<Self, InvalidOptionsError> {
        if window <= TimeDelta::zero() {
            return Err(InvalidOptionsError::NonPositiveWindow {
                millis: window.num_milliseconds(),
            });
        }
        if threshold == 0 {
            return Err(InvalidOptionsError::ZeroThreshold);
        }
        Ok(Self {
            window,
            threshold,
            now,
            summarizer_deadline: None,
        })
    }

    /// Synthesis defaults: 30-minute window, threshold 3.
    #[must_use]
    pub const fn synthesis_defaults(now: DateTime<Utc>) -> Self {
        Self {
            window: TimeDelta::minutes(DEFAULT_SYNTHESIS_WINDOW_MINUTES),
            threshold: DEFAULT_SPIKE_THRESHOLD,
            now,
            summarizer_deadline: None,
        }
    }

    /// Alert defaults: 60-minute window, threshold 3.
    #[must_use]
    pub const fn alert_defaults(now: DateTime<Utc>) -> Self {
        Self {
            window: TimeDelta::minutes(DEFAULT_ALERT_WINDOW_MINUTES),
            threshold: DEFAULT_SPIKE_THRESHOLD,
            now,
            summarizer_deadline: None,
        }
    }

    /// Bounds every individual summarizer call by `deadline`.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: std::time::Duration) -> Self {
        self.summarizer_deadline = Some(deadline);
        self
    }

    /// Recency window.
    #[must_use]
    pub const fn window(&self) -> TimeDelta {
        self.window
    }

    /// Minimum bucket size for a spike.
    #[must_use]
    pub const fn threshold(&self) -> usize {
        self.threshold
    }

    /// Reference instant for the window.
    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Optional per-call summarizer deadline.
    #[must_use]
    pub const fn summarizer_deadline(&self) -> Option<std::time::Duration> {
        self.summarizer_deadline
    }
}

/// Error returned when [`PipelineOptions`] are constructed with invalid
/// values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidOptionsError {
    /// The window was zero or negative.
    NonPositiveWindow {
        /// The rejected window length in milliseconds.
        millis: i64,
    },
    /// The window does not fit in a [`TimeDelta`].
    WindowOutOfRange {
        /// The rejected window length in minutes.
        minutes: i64,
    },
    /// The spike threshold was zero.
    ZeroThreshold,
}

impl std::fmt::Display for InvalidOptionsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveWindow { millis } => {
                write!(f, "window must be positive, got {millis}ms")
            }
            Self::WindowOutOfRange { minutes } => {
                write!(f, "window of {minutes} minutes is out of range")
            }
            Self::ZeroThreshold => write!(f, "spike threshold must be at least 1"),
        }
    }
}

impl std::error::Error for InvalidOptionsError {}

/// Converts a window given in minutes, as read from flags or config files.
///
/// # Errors
///
/// Returns [`InvalidOptionsError::WindowOutOfRange`] if `minutes` is too
/// large in magnitude for a [`TimeDelta`].
pub fn window_from_minutes(minutes: i64) -> Result<TimeDelta, InvalidOptionsError> {
    TimeDelta::try_minutes(minutes).ok_or(InvalidOptionsError::WindowOutOfRange { minutes })
}

/// What a summarizer returns for a block of report text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    /// Natural-language summary. `None` or blank means the summarizer had
    /// nothing useful to say.
    #[serde(default)]
    pub summary: Option<String>,
    /// Severity judgement.
    #[serde(default)]
    pub severity: Option<Severity>,
    /// Most prominent issues mentioned in the text.
    #[serde(default)]
    pub top_issues: Vec<String>,
}

impl SummaryResponse {
    /// The summary text if present and non-blank.
    #[must_use]
    pub fn usable_summary(&self) -> Option<&str> {
        self.summary.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// A clustered, summarized event ready for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizedEvent {
    /// Canonical location key.
    pub area: String,
    /// Canonical category key.
    pub category: String,
    /// Summary text (summarizer output or the templated fallback).
    pub summary: String,
    /// Number of reports in the cluster.
    pub count: usize,
    /// Severity (summarizer output or `Medium`).
    pub severity: Severity,
    /// Reference instant of the run that produced the event.
    pub timestamp: DateTime<Utc>,
    /// Probability, when the producer supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    /// Top issues reported by the summarizer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_issues: Vec<String>,
}

/// A predictive or spike-based alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Alert type (usually the category).
    #[serde(rename = "type")]
    pub kind: String,
    /// Affected area.
    pub area: String,
    /// Human-readable message.
    pub message: String,
    /// When the alert was produced.
    pub timestamp: DateTime<Utc>,
    /// Expected impact or timeframe.
    pub impact: String,
    /// Probability in `0.0..=1.0`, when predicted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
}

/// An alert as proposed by a predictor, before it is stamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictedAlert {
    /// Alert type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Affected area.
    pub area: String,
    /// Human-readable message.
    pub message: String,
    /// Probability in `0.0..=1.0`.
    #[serde(default)]
    pub probability: Option<f64>,
    /// Expected timeframe (e.g. "2-3 hours").
    #[serde(default)]
    pub timeframe: Option<String>,
}

/// A user's notification filters. Empty lists match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    /// Location keys the user follows.
    #[serde(default)]
    pub locations: Vec<String>,
    /// Category keys the user follows.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A personalised notification about one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Title, `"Update: {tag}"`.
    pub title: String,
    /// Summary or fallback message.
    pub message: String,
    /// When the notification was produced.
    pub timestamp: DateTime<Utc>,
    /// Category key.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Overall sentiment label.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Sentiment {
    /// Positive.
    Positive,
    /// Neutral or mixed.
    #[default]
    Neutral,
    /// Negative.
    Negative,
    /// Frustrated.
    Frustrated,
    /// Concerned.
    Concerned,
    /// Cautious.
    Cautious,
}

impl Sentiment {
    /// The emotion shown on the mood map for this sentiment.
    #[must_use]
    pub const fn emotion(self) -> Emotion {
        match self {
            Self::Positive => Emotion::Happy,
            Self::Negative | Self::Frustrated => Emotion::Frustrated,
            Self::Concerned => Emotion::Concerned,
            Self::Cautious => Emotion::Cautious,
            Self::Neutral => Emotion::Neutral,
        }
    }
}

/// Emotion label derived from a [`Sentiment`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Emotion {
    /// Happy.
    Happy,
    /// Neutral.
    Neutral,
    /// Frustrated.
    Frustrated,
    /// Concerned.
    Concerned,
    /// Cautious.
    Cautious,
}

/// Recent activity summary for one area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaSummary {
    /// The area.
    pub area: String,
    /// Summary or fallback text.
    pub summary: String,
    /// Top issues from the summarizer.
    pub top_issues: Vec<String>,
    /// Sentiment of the area's reports.
    pub mood_trend: Sentiment,
    /// Spike alerts within the area.
    pub predictive_alerts: Vec<Alert>,
    /// Number of reports attributed to the area.
    pub report_count: usize,
}

/// Digest of recent activity in a city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityDigest {
    /// The city.
    pub city: String,
    /// Summary or fallback text.
    pub summary: String,
    /// Up to three headline events or issues.
    pub top_events: Vec<String>,
    /// Sentiment of the city's reports.
    pub mood_trend: Sentiment,
    /// Rule-based warnings.
    pub key_alerts: Vec<String>,
    /// Number of reports attributed to the city.
    pub report_count: usize,
    /// When the digest was produced.
    pub generated_at: DateTime<Utc>,
}

/// A social media post to analyse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialPost {
    /// Post text.
    pub text: String,
    /// Location name, if known.
    #[serde(default, alias = "city")]
    pub location: Option<String>,
}

/// Aggregated mood for one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodEntry {
    /// Location name.
    pub location: String,
    /// Sentiment of the combined posts.
    pub sentiment: Sentiment,
    /// Emotion derived from the sentiment.
    pub emotion: Emotion,
    /// Number of posts.
    pub count: usize,
}

/// A single post after sentiment and topic analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedPost {
    /// Post text.
    pub text: String,
    /// Location name, if known.
    pub location: Option<String>,
    /// Sentiment label.
    pub sentiment: Sentiment,
    /// Topics matched by keyword.
    pub topics: Vec<String>,
    /// `false` when the classifier failed and defaults were used.
    pub analyzed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_720_519_200, 0).unwrap()
    }

    #[test]
    fn options_reject_non_positive_window() {
        let err = PipelineOptions::new(TimeDelta::zero(), 3, now()).unwrap_err();
        assert_eq!(err, InvalidOptionsError::NonPositiveWindow { millis: 0 });
        assert!(PipelineOptions::new(TimeDelta::minutes(-5), 3, now()).is_err());
    }

    #[test]
    fn options_reject_zero_threshold() {
        let err = PipelineOptions::new(TimeDelta::minutes(30), 0, now()).unwrap_err();
        assert_eq!(err, InvalidOptionsError::ZeroThreshold);
    }

    #[test]
    fn huge_minute_counts_are_out_of_range() {
        assert_eq!(window_from_minutes(45), Ok(TimeDelta::minutes(45)));
        assert_eq!(
            window_from_minutes(i64::MAX),
            Err(InvalidOptionsError::WindowOutOfRange { minutes: i64::MAX })
        );
        assert!(window_from_minutes(i64::MIN).is_err());
    }

    #[test]
    fn defaults_match_documented_values() {
        let synthesis = PipelineOptions::synthesis_defaults(now());
        assert_eq!(synthesis.window(), TimeDelta::minutes(30));
        assert_eq!(synthesis.threshold(), 3);
        assert!(synthesis.summarizer_deadline().is_none());

        let alerts = PipelineOptions::alert_defaults(now());
        assert_eq!(alerts.window(), TimeDelta::hours(1));
    }

    #[test]
    fn blank_summary_is_not_usable() {
        let response = SummaryResponse {
            summary: Some("   ".to_string()),
            ..SummaryResponse::default()
        };
        assert!(response.usable_summary().is_none());
    }

    #[test]
    fn summary_response_tolerates_missing_fields() {
        let response: SummaryResponse =
            serde_json::from_str(r#"{"summary": "Jam on ring road", "severity": "High"}"#)
                .unwrap();
        assert_eq!(response.usable_summary(), Some("Jam on ring road"));
        assert_eq!(response.severity, Some(Severity::High));
        assert!(response.top_issues.is_empty());
    }

    #[test]
    fn sentiment_maps_to_emotion() {
        assert_eq!(Sentiment::Positive.emotion(), Emotion::Happy);
        assert_eq!(Sentiment::Negative.emotion(), Emotion::Frustrated);
        assert_eq!(Sentiment::Neutral.emotion(), Emotion::Neutral);
    }

    #[test]
    fn alert_serializes_kind_as_type() {
        let alert = Alert {
            kind: "Traffic".to_string(),
            area: "Delhi".to_string(),
            message: "m".to_string(),
            timestamp: now(),
            impact: "Potential issue detected".to_string(),
            probability: None,
        };
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["type"], "Traffic");
        assert!(json.get("probability").is_none());
    }
}
