//! City digests.

use std::time::Duration;

use chrono::{DateTime, Utc};
use city_pulse_report_models::Report;
use city_pulse_signal_models::{CityDigest, Sentiment};
use futures::future::{join, join_all};

use crate::area::mood_of;
use crate::assemble::summarize_with_deadline;
use crate::capability::{SentimentClassifier, Summarizer};
use crate::grouping::group_by_category;

/// Report count above which a digest flags high volume.
pub const HIGH_VOLUME_THRESHOLD: usize = 5;

const MAX_TOP_EVENTS: usize = 3;

fn key_alerts(reports: &[&Report]) -> Vec<String> {
    let has = |category: &str| reports.iter().any(|r| r.category_key() == category);

    let mut alerts = Vec::new();
    if reports.len() > HIGH_VOLUME_THRESHOLD {
        alerts.push("High report volume detected".to_string());
    }
    if has("Traffic") {
        alerts.push("Traffic congestion reported".to_string());
    }
    if has("Power") {
        alerts.push("Power issues in the area".to_string());
    }
    alerts
}

/// Most frequent categories, ties broken by first appearance.
fn frequent_categories(reports: &[&Report], limit: usize) -> Vec<String> {
    let mut groups: Vec<(String, usize)> = group_by_category(reports.iter().copied())
        .into_iter()
        .map(|(category, members)| (category, members.len()))
        .collect();
    groups.sort_by(|a, b| b.1.cmp(&a.1));
    groups
        .into_iter()
        .take(limit)
        .map(|(category, _)| category)
        .collect()
}

/// Builds the digest for one city.
pub async fn generate_digest(
    reports: &[Report],
    city: &str,
    summarizer: &dyn Summarizer,
    classifier: &dyn SentimentClassifier,
    deadline: Option<Duration>,
    now: DateTime<Utc>,
) -> CityDigest {
    let in_city: Vec<&Report> = reports.iter().filter(|r| r.mentions_place(city)).collect();

    if in_city.is_empty() {
        return CityDigest {
            city: city.to_string(),
            summary: format!("No recent activity in {city}"),
            top_events: Vec::new(),
            mood_trend: Sentiment::Neutral,
            key_alerts: Vec::new(),
            report_count: 0,
            generated_at: now,
        };
    }

    let text = in_city
        .iter()
        .map(|r| r.description.as_str())
        .collect::<Vec<_>>()
        .join(". ");

    let (response, mood_trend) = join(
        summarize_with_deadline(summarizer, &text, None, Some(city), deadline),
        mood_of(classifier, &text),
    )
    .await;

    let (summary, top_issues) = match response {
        Ok(response) => (
            response.usable_summary().map(str::to_string),
            response.top_issues,
        ),
        Err(e) => {
            log::warn!("Summarizer failed for {city} digest: {e}");
            (None, Vec::new())
        }
    };

    let top_events = if top_issues.is_empty() {
        frequent_categories(&in_city, MAX_TOP_EVENTS)
    } else {
        top_issues.into_iter().take(MAX_TOP_EVENTS).collect()
    };

    CityDigest {
        city: city.to_string(),
        summary: summary.unwrap_or_else(|| format!("Recent activity summary for {city}")),
        top_events,
        mood_trend,
        key_alerts: key_alerts(&in_city),
        report_count: in_city.len(),
        generated_at: now,
    }
}

/// Builds digests for several cities concurrently, in input order.
pub async fn generate_multi_city_digest(
    reports: &[Report],
    cities: &[String],
    summarizer: &dyn Summarizer,
    classifier: &dyn SentimentClassifier,
    deadline: Option<Duration>,
    now: DateTime<Utc>,
) -> Vec<CityDigest> {
    join_all(
        cities
            .iter()
            .map(|city| generate_digest(reports, city, summarizer, classifier, deadline, now)),
    )
    .await
}

#[cfg(test)]
mod tests {
    use city_pulse_signal_models::SummaryResponse;

    use crate::capability::SummarizerError;

    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_720_519_200, 0).unwrap()
    }

    struct Down;

    #[async_trait::async_trait]
    impl Summarizer for Down {
        async fn summarize(
            &self,
            _text: &str,
            _category: Option<&str>,
            _area: Option<&str>,
        ) -> Result<SummaryResponse, SummarizerError> {
            Err(SummarizerError::Provider {
                message: "down".to_string(),
            })
        }
    }

    #[async_trait::async_trait]
    impl SentimentClassifier for Down {
        async fn classify(&self, _text: &str) -> Result<Sentiment, SummarizerError> {
            Ok(Sentiment::Concerned)
        }
    }

    struct Issues;

    #[async_trait::async_trait]
    impl Summarizer for Issues {
        async fn summarize(
            &self,
            text: &str,
            _category: Option<&str>,
            _area: Option<&str>,
        ) -> Result<SummaryResponse, SummarizerError> {
            Ok(SummaryResponse {
                summary: Some(text.to_string()),
                severity: None,
                top_issues: ["a", "b", "c", "d"].map(str::to_string).to_vec(),
            })
        }
    }

    fn reports() -> Vec<Report> {
        let mut reports = Vec::new();
        for i in 0..4 {
            reports.push(
                Report::new(format!("t{i}"), "jam")
                    .with_place(Some("Delhi"), Some("Saket"))
                    .with_ai_tag("Traffic"),
            );
        }
        for i in 0..2 {
            reports.push(
                Report::new(format!("p{i}"), "outage")
                    .with_location("Delhi")
                    .with_ai_tag("Power"),
            );
        }
        reports.push(Report::new("w", "flooding").with_location("Mumbai").with_category("Water"));
        reports
    }

    #[tokio::test]
    async fn no_reports_yields_empty_digest() {
        let digest = generate_digest(&reports(), "Agra", &Down, &Down, None, now()).await;
        assert_eq!(digest.summary, "No recent activity in Agra");
        assert_eq!(digest.report_count, 0);
        assert_eq!(digest.mood_trend, Sentiment::Neutral);
        assert!(digest.key_alerts.is_empty());
        assert_eq!(digest.generated_at, now());
    }

    #[tokio::test]
    async fn fallback_digest_uses_categories_and_rules() {
        let digest = generate_digest(&reports(), "Delhi", &Down, &Down, None, now()).await;

        assert_eq!(digest.summary, "Recent activity summary for Delhi");
        assert_eq!(digest.report_count, 6);
        assert_eq!(digest.top_events, vec!["Traffic", "Power"]);
        assert_eq!(digest.mood_trend, Sentiment::Concerned);
        assert_eq!(
            digest.key_alerts,
            vec![
                "High report volume detected",
                "Traffic congestion reported",
                "Power issues in the area",
            ]
        );
    }

    #[tokio::test]
    async fn summarizer_issues_are_capped_at_three() {
        let digest = generate_digest(&reports(), "Mumbai", &Issues, &Down, None, now()).await;
        assert_eq!(digest.summary, "flooding");
        assert_eq!(digest.top_events, vec!["a", "b", "c"]);
        assert!(digest.key_alerts.is_empty());
    }

    #[tokio::test]
    async fn multi_city_keeps_input_order() {
        let cities = vec!["Mumbai".to_string(), "Delhi".to_string(), "Pune".to_string()];
        let digests =
            generate_multi_city_digest(&reports(), &cities, &Down, &Down, None, now()).await;
        let names: Vec<&str> = digests.iter().map(|d| d.city.as_str()).collect();
        assert_eq!(names, vec!["Mumbai", "Delhi", "Pune"]);
        assert_eq!(digests[2].report_count, 0);
    }
}
