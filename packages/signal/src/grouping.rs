//! Partitions reports into (location, category) buckets within a recency
//! window.

use chrono::{DateTime, TimeDelta, Utc};
use city_pulse_report_models::Report;
use city_pulse_signal_models::{BucketKey, Buckets};

/// Returns `true` if `report` was submitted within `window` before `now`.
///
/// Reports without a timestamp and reports dated after `now` are outside
/// every window.
#[must_use]
pub fn in_window(report: &Report, window: TimeDelta, now: DateTime<Utc>) -> bool {
    report.timestamp.is_some_and(|ts| {
        let age = now.signed_duration_since(ts);
        age >= TimeDelta::zero() && age <= window
    })
}

/// Groups the reports that fall inside the window.
///
/// Buckets appear in the order their key was first seen and each bucket
/// keeps its reports in input order.
#[must_use]
pub fn group(reports: &[Report], window: TimeDelta, now: DateTime<Utc>) -> Buckets {
    let mut buckets = Buckets::new();

    for report in reports {
        if !in_window(report, window, now) {
            log::trace!(
                "Skipping report {} outside window (timestamp={:?})",
                report.id,
                report.timestamp
            );
            continue;
        }
        buckets.push(BucketKey::for_report(report), report.clone());
    }

    log::debug!(
        "Grouped {} reports into {} buckets",
        reports.len(),
        buckets.len()
    );

    buckets
}

/// Groups every report by category key only, ignoring time. Used by
/// notification fan-out.
#[must_use]
pub fn group_by_category<'a>(
    reports: impl IntoIterator<Item = &'a Report>,
) -> Vec<(String, Vec<&'a Report>)> {
    let mut groups: Vec<(String, Vec<&'a Report>)> = Vec::new();
    for report in reports {
        let key = report.category_key();
        match groups.iter_mut().find(|(k, _)| k == key) {
            Some((_, members)) => members.push(report),
            None => groups.push((key.to_string(), vec![report])),
        }
    }
    groups
}
