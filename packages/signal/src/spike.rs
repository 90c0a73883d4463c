//! Promotes buckets that meet the spike threshold to candidate events.

use city_pulse_signal_models::{Buckets, CandidateEvent};

/// Returns a candidate for every bucket holding at least `threshold`
/// reports, in bucket order.
#[must_use]
pub fn detect(buckets: Buckets, threshold: usize) -> Vec<CandidateEvent> {
    let candidates: Vec<CandidateEvent> = buckets
        .into_iter()
        .filter(|bucket| bucket.len() >= threshold)
        .filter_map(CandidateEvent::from_bucket)
        .collect();

    log::debug!(
        "Detected {} spike(s) at threshold {threshold}",
        candidates.len()
    );

    candidates
}
