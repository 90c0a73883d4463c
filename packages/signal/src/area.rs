//! Recent activity summary for a single area.

use city_pulse_report_models::Report;
use city_pulse_signal_models::{AreaSummary, PipelineOptions, Sentiment, SummaryResponse};

use crate::alerts::spike_alert;
use crate::assemble::summarize_with_deadline;
use crate::capability::{SentimentClassifier, Summarizer};
use crate::{grouping, spike};

/// Classifies `text`, returning [`Sentiment::Neutral`] for empty text or a
/// failed classification.
pub(crate) async fn mood_of(classifier: &dyn SentimentClassifier, text: &str) -> Sentiment {
    if text.trim().is_empty() {
        return Sentiment::Neutral;
    }
    classifier.classify(text).await.unwrap_or_else(|e| {
        log::warn!("Sentiment classification failed: {e}");
        Sentiment::Neutral
    })
}

/// Summarizes the reports whose location key is `area`.
///
/// `options` supplies the window and threshold for the spike alerts
/// attached to the summary, and the optional summarizer deadline.
pub async fn summarize_area(
    reports: &[Report],
    area: &str,
    options: &PipelineOptions,
    summarizer: &dyn Summarizer,
    classifier: &dyn SentimentClassifier,
) -> AreaSummary {
    let in_area: Vec<Report> = reports
        .iter()
        .filter(|r| r.location_key() == area)
        .cloned()
        .collect();

    let text = in_area
        .iter()
        .map(|r| r.description.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let response = summarize_with_deadline(
        summarizer,
        &text,
        None,
        Some(area),
        options.summarizer_deadline(),
    )
    .await
    .unwrap_or_else(|e| {
        log::warn!("Summarizer failed for area {area}: {e}");
        SummaryResponse::default()
    });

    let summary = response
        .usable_summary()
        .map_or_else(|| format!("Recent activity in {area}"), str::to_string);

    let mood_trend = mood_of(classifier, &text).await;

    let predictive_alerts = spike::detect(
        grouping::group(&in_area, options.window(), options.now()),
        options.threshold(),
    )
    .iter()
    .map(|candidate| spike_alert(candidate, options.now()))
    .collect();

    AreaSummary {
        area: area.to_string(),
        summary,
        top_issues: response.top_issues,
        mood_trend,
        predictive_alerts,
        report_count: in_area.len(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta, Utc};

    use crate::capability::SummarizerError;

    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_720_519_200, 0).unwrap()
    }

    struct Silent;

    #[async_trait::async_trait]
    impl Summarizer for Silent {
        async fn summarize(
            &self,
            _text: &str,
            _category: Option<&str>,
            _area: Option<&str>,
        ) -> Result<SummaryResponse, SummarizerError> {
            Err(SummarizerError::Timeout)
        }
    }

    #[async_trait::async_trait]
    impl SentimentClassifier for Silent {
        async fn classify(&self, _text: &str) -> Result<Sentiment, SummarizerError> {
            Err(SummarizerError::Timeout)
        }
    }

    struct Gloomy;

    #[async_trait::async_trait]
    impl Summarizer for Gloomy {
        async fn summarize(
            &self,
            _text: &str,
            _category: Option<&str>,
            area: Option<&str>,
        ) -> Result<SummaryResponse, SummarizerError> {
            Ok(SummaryResponse {
                summary: Some(format!("Trouble in {}", area.unwrap_or("?"))),
                severity: None,
                top_issues: vec!["outages".to_string()],
            })
        }
    }

    #[async_trait::async_trait]
    impl SentimentClassifier for Gloomy {
        async fn classify(&self, _text: &str) -> Result<Sentiment, SummarizerError> {
            Ok(Sentiment::Frustrated)
        }
    }

    fn reports() -> Vec<Report> {
        let mut reports: Vec<Report> = (0..3)
            .map(|i| {
                Report::new(i.to_string(), "no power")
                    .with_location("Andheri")
                    .with_ai_tag("Power")
                    .at(now() - TimeDelta::minutes(5))
            })
            .collect();
        reports.push(Report::new("x", "jam").with_location("Delhi").at(now()));
        reports
    }

    #[tokio::test]
    async fn falls_back_when_capabilities_fail() {
        let options = PipelineOptions::alert_defaults(now());
        let summary = summarize_area(&reports(), "Andheri", &options, &Silent, &Silent).await;

        assert_eq!(summary.summary, "Recent activity in Andheri");
        assert_eq!(summary.mood_trend, Sentiment::Neutral);
        assert_eq!(summary.report_count, 3);
        assert!(summary.top_issues.is_empty());
        assert_eq!(summary.predictive_alerts.len(), 1);
        assert_eq!(
            summary.predictive_alerts[0].message,
            "Spike: 3 reports of Power in Andheri"
        );
    }

    #[tokio::test]
    async fn uses_capability_output() {
        let options = PipelineOptions::alert_defaults(now());
        let summary = summarize_area(&reports(), "Andheri", &options, &Gloomy, &Gloomy).await;

        assert_eq!(summary.summary, "Trouble in Andheri");
        assert_eq!(summary.top_issues, vec!["outages".to_string()]);
        assert_eq!(summary.mood_trend, Sentiment::Frustrated);
    }

    #[tokio::test]
    async fn unknown_area_is_empty_and_neutral() {
        let options = PipelineOptions::alert_defaults(now());
        let summary = summarize_area(&reports(), "Agra", &options, &Silent, &Gloomy).await;
        assert_eq!(summary.report_count, 0);
        assert_eq!(summary.mood_trend, Sentiment::Neutral);
        assert!(summary.predictive_alerts.is_empty());
    }
}
