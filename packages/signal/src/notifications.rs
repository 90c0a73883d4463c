//! Personalised per-category notifications.

use std::time::Duration;

use chrono::{DateTime, Utc};
use city_pulse_report_models::Report;
use city_pulse_signal_models::{Notification, UserPreferences};
use futures::future::join_all;

use crate::assemble::summarize_with_deadline;
use crate::capability::Summarizer;
use crate::grouping::group_by_category;

fn matches(preferences: &UserPreferences, report: &Report) -> bool {
    let location_ok = preferences.locations.is_empty()
        || preferences
            .locations
            .iter()
            .any(|l| l == report.location_key());
    let tag_ok = preferences.tags.is_empty()
        || preferences.tags.iter().any(|t| t == report.category_key());
    location_ok && tag_ok
}

/// Produces one notification per category among the reports that match
/// the user's preferences.
pub async fn generate_notifications(
    reports: &[Report],
    preferences: &UserPreferences,
    summarizer: &dyn Summarizer,
    deadline: Option<Duration>,
    now: DateTime<Utc>,
) -> Vec<Notification> {
    let groups = group_by_category(reports.iter().filter(|r| matches(preferences, r)));
    if groups.is_empty() {
        log::debug!("No reports match notification preferences");
        return Vec::new();
    }

    let texts: Vec<String> = groups
        .iter()
        .map(|(_, members)| {
            members
                .iter()
                .map(|r| r.description.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();

    let responses = join_all(groups.iter().zip(&texts).map(|((tag, _), text)| {
        summarize_with_deadline(summarizer, text, Some(tag), None, deadline)
    }))
    .await;

    groups
        .into_iter()
        .zip(responses)
        .map(|((tag, _), response)| {
            let message = match response {
                Ok(response) => response.usable_summary().map(str::to_string),
                Err(e) => {
                    log::warn!("Summarizer failed for notification {tag}: {e}");
                    None
                }
            }
            .unwrap_or_else(|| format!("Recent activity for {tag}"));

            Notification {
                title: format!("Update: {tag}"),
                message,
                timestamp: now,
                kind: tag,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use city_pulse_signal_models::SummaryResponse;

    use crate::capability::SummarizerError;

    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_720_519_200, 0).unwrap()
    }

    struct TagSummarizer;

    #[async_trait::async_trait]
    impl Summarizer for TagSummarizer {
        async fn summarize(
            &self,
            _text: &str,
            category: Option<&str>,
            _area: Option<&str>,
        ) -> Result<SummaryResponse, SummarizerError> {
            match category {
                Some("Traffic") => Ok(SummaryResponse {
                    summary: Some("Roads are jammed".to_string()),
                    ..SummaryResponse::default()
                }),
                _ => Err(SummarizerError::InvalidResponse {
                    message: "not json".to_string(),
                }),
            }
        }
    }

    fn sample() -> Vec<Report> {
        vec![
            Report::new("1", "jam").with_location("Delhi").with_ai_tag("Traffic"),
            Report::new("2", "cut").with_location("Delhi").with_ai_tag("Power"),
            Report::new("3", "jam").with_location("Pune").with_ai_tag("Traffic"),
        ]
    }

    #[tokio::test]
    async fn empty_preferences_match_everything() {
        let notifications = generate_notifications(
            &sample(),
            &UserPreferences::default(),
            &TagSummarizer,
            None,
            now(),
        )
        .await;

        assert_eq!(notifications.len(), 2);
        assert_eq!(notifications[0].title, "Update: Traffic");
        assert_eq!(notifications[0].message, "Roads are jammed");
        assert_eq!(notifications[1].kind, "Power");
        assert_eq!(notifications[1].message, "Recent activity for Power");
    }

    #[tokio::test]
    async fn filters_by_location_and_tag() {
        let preferences = UserPreferences {
            locations: vec!["Pune".to_string()],
            tags: vec!["Traffic".to_string()],
        };
        let notifications =
            generate_notifications(&sample(), &preferences, &TagSummarizer, None, now()).await;
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, "Traffic");
    }

    #[tokio::test]
    async fn nothing_matching_yields_nothing() {
        let preferences = UserPreferences {
            locations: vec!["Agra".to_string()],
            tags: Vec::new(),
        };
        let notifications =
            generate_notifications(&sample(), &preferences, &TagSummarizer, None, now()).await;
        assert!(notifications.is_empty());
    }
}
