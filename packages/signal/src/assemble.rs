//! Merges candidate events with summarizer output.

use std::time::Duration;

use chrono::{DateTime, Utc};
use city_pulse_report_models::Severity;
use city_pulse_signal_models::{CandidateEvent, SummaryResponse, SynthesizedEvent};
use futures::future::join_all;

use crate::capability::{Summarizer, SummarizerError};

/// Summary used when the summarizer gives nothing usable for a candidate.
#[must_use]
pub fn fallback_summary(category: &str, area: &str) -> String {
    format!("Clustered event: {category} in {area}")
}

/// Calls the summarizer, bounding the call by `deadline` when one is set.
pub(crate) async fn summarize_with_deadline(
    summarizer: &dyn Summarizer,
    text: &str,
    category: Option<&str>,
    area: Option<&str>,
    deadline: Option<Duration>,
) -> Result<SummaryResponse, SummarizerError> {
    let call = summarizer.summarize(text, category, area);
    match deadline {
        Some(deadline) => tokio::time::timeout(deadline, call)
            .await
            .map_err(|_| SummarizerError::Timeout)?,
        None => call.await,
    }
}

/// Builds one synthesized event per candidate.
///
/// Summarizer calls run concurrently. A failed, timed-out, or empty
/// response degrades that candidate to the fallback summary with
/// [`Severity::Medium`]; it never affects the other candidates. Output
/// order matches `candidates`.
pub async fn assemble(
    candidates: Vec<CandidateEvent>,
    summarizer: &dyn Summarizer,
    deadline: Option<Duration>,
    now: DateTime<Utc>,
) -> Vec<SynthesizedEvent> {
    let texts: Vec<String> = candidates
        .iter()
        .map(CandidateEvent::joined_descriptions)
        .collect();

    let responses = join_all(candidates.iter().zip(&texts).map(|(candidate, text)| {
        summarize_with_deadline(
            summarizer,
            text,
            Some(candidate.category_key()),
            Some(candidate.location_key()),
            deadline,
        )
    }))
    .await;

    candidates
        .into_iter()
        .zip(responses)
        .map(|(candidate, response)| to_event(candidate, response, now))
        .collect()
}

fn to_event(
    candidate: CandidateEvent,
    response: Result<SummaryResponse, SummarizerError>,
    now: DateTime<Utc>,
) -> SynthesizedEvent {
    let area = candidate.location_key().to_string();
    let category = candidate.category_key().to_string();

    let response = response.unwrap_or_else(|e| {
        log::warn!("Summarizer failed for {category} in {area}: {e}");
        SummaryResponse::default()
    });

    let summary = response
        .usable_summary()
        .map_or_else(|| fallback_summary(&category, &area), str::to_string);

    SynthesizedEvent {
        summary,
        count: candidate.count(),
        severity: response.severity.unwrap_or_default(),
        timestamp: now,
        probability: None,
        top_issues: response.top_issues,
        area,
        category,
    }
}
