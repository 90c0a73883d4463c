//! Deterministic, offline implementations of the pipeline capabilities.

use city_pulse_report_models::{GENERAL_CATEGORY, Severity};
use city_pulse_signal::mood::extract_topics;
use city_pulse_signal::{AlertPredictor, SentimentClassifier, Summarizer, SummarizerError};
use city_pulse_signal_models::{CandidateEvent, PredictedAlert, Sentiment, SummaryResponse};

/// Canned assessment for a well-known incident kind.
#[derive(Debug, Clone, Copy)]
struct Rule {
    kind: &'static str,
    keywords: &'static [&'static str],
    summary: &'static str,
    severity: Severity,
    outlook: &'static str,
    timeframe: &'static str,
}

const RULES: &[Rule] = &[
    Rule {
        kind: "traffic",
        keywords: &["traffic", "congestion", "jam", "gridlock"],
        summary: "Heavy traffic congestion detected on main arterial road",
        severity: Severity::High,
        outlook: "Likely delay of 30-45 minutes",
        timeframe: "2-3 hours",
    },
    Rule {
        kind: "civic",
        keywords: &["waterlogging", "flood", "garbage", "pothole", "sewage"],
        summary: "Waterlogging reported in residential area",
        severity: Severity::Medium,
        outlook: "May affect morning commute",
        timeframe: "4-6 hours",
    },
    Rule {
        kind: "power",
        keywords: &["power", "electricity", "outage", "blackout"],
        summary: "Power outage affecting commercial district",
        severity: Severity::High,
        outlook: "Restoration expected within 2 hours",
        timeframe: "2 hours",
    },
    Rule {
        kind: "weather",
        keywords: &["rain", "storm", "weather", "visibility", "heat"],
        summary: "Heavy rainfall causing visibility issues",
        severity: Severity::Medium,
        outlook: "Weather to improve by evening",
        timeframe: "4-6 hours",
    },
];

const POSITIVE_WORDS: &[&str] = &[
    "great",
    "amazing",
    "beautiful",
    "good",
    "love",
    "happy",
    "thanks",
    "excellent",
    "smooth",
];

const NEGATIVE_WORDS: &[&str] = &[
    "unbearable",
    "ridiculous",
    "bad",
    "worst",
    "terrible",
    "angry",
    "hate",
    "broken",
];

const CONCERN_WORDS: &[&str] = &[
    "worried",
    "unsafe",
    "danger",
    "flood",
    "waterlogging",
    "concern",
    "fire",
];

const CAUTION_WORDS: &[&str] = &["careful", "caution", "warning", "slippery", "avoid"];

fn rule_for(category: Option<&str>, text: &str) -> Option<&'static Rule> {
    if let Some(category) = category {
        let category = category.to_lowercase();
        if let Some(rule) = RULES.iter().find(|r| r.kind == category) {
            return Some(rule);
        }
    }
    let lower = text.to_lowercase();
    RULES
        .iter()
        .find(|r| r.keywords.iter().any(|k| lower.contains(k)))
}

fn count_hits(text: &str, words: &[&str]) -> usize {
    words.iter().filter(|w| text.contains(*w)).count()
}

/// Keyword-rule summarizer, sentiment classifier and alert predictor.
///
/// Always answers, never performs I/O, and gives the same answer for the
/// same input. Unknown incident kinds get no summary so callers fall back
/// to their own templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedSummarizer;

impl RuleBasedSummarizer {
    /// Creates the summarizer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Classifies `text` by keyword counts.
    ///
    /// Negative wording that repeats a complaint ("again") or shouts ("!")
    /// reads as frustration. Ties resolve to neutral.
    #[must_use]
    pub fn sentiment_of(text: &str) -> Sentiment {
        let lower = text.to_lowercase();
        let scores = [
            (Sentiment::Positive, count_hits(&lower, POSITIVE_WORDS)),
            (Sentiment::Negative, count_hits(&lower, NEGATIVE_WORDS)),
            (Sentiment::Concerned, count_hits(&lower, CONCERN_WORDS)),
            (Sentiment::Cautious, count_hits(&lower, CAUTION_WORDS)),
        ];

        let best = scores.iter().map(|(_, n)| *n).max().unwrap_or(0);
        let mut leaders = scores.iter().filter(|(_, n)| *n == best && best > 0);
        let sentiment = match (leaders.next(), leaders.next()) {
            (Some((sentiment, _)), None) => *sentiment,
            _ => Sentiment::Neutral,
        };

        if sentiment == Sentiment::Negative && (lower.contains("again") || lower.contains('!')) {
            Sentiment::Frustrated
        } else {
            sentiment
        }
    }
}

#[async_trait::async_trait]
impl Summarizer for RuleBasedSummarizer {
    async fn summarize(
        &self,
        text: &str,
        category: Option<&str>,
        area: Option<&str>,
    ) -> Result<SummaryResponse, SummarizerError> {
        let top_issues: Vec<String> = extract_topics(text)
            .into_iter()
            .filter(|t| t != GENERAL_CATEGORY)
            .collect();

        let Some(rule) = rule_for(category, text) else {
            return Ok(SummaryResponse {
                summary: None,
                severity: None,
                top_issues,
            });
        };

        let summary = match area {
            Some(area) => format!("{} in {area}", rule.summary),
            None => rule.summary.to_string(),
        };

        Ok(SummaryResponse {
            summary: Some(summary),
            severity: Some(rule.severity),
            top_issues,
        })
    }
}

#[async_trait::async_trait]
impl SentimentClassifier for RuleBasedSummarizer {
    async fn classify(&self, text: &str) -> Result<Sentiment, SummarizerError> {
        Ok(Self::sentiment_of(text))
    }
}

#[async_trait::async_trait]
impl AlertPredictor for RuleBasedSummarizer {
    async fn predict(
        &self,
        spikes: &[CandidateEvent],
    ) -> Result<Vec<PredictedAlert>, SummarizerError> {
        Ok(spikes
            .iter()
            .filter_map(|spike| {
                let rule = rule_for(Some(spike.category_key()), &spike.joined_descriptions())?;
                #[allow(clippy::cast_precision_loss)]
                let probability = (spike.count() as f64).mul_add(0.1, 0.4).min(0.95);
                Some(PredictedAlert {
                    kind: spike.category_key().to_string(),
                    area: spike.location_key().to_string(),
                    message: rule.outlook.to_string(),
                    probability: Some(probability),
                    timeframe: Some(rule.timeframe.to_string()),
                })
            })
            .collect())
    }
}
