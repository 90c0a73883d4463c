//! Grouping output: buckets keyed by canonical (location, category) and the
//! candidate events promoted from them.

use std::collections::BTreeMap;

use city_pulse_report_models::Report;
use serde::Serialize;

/// Canonical grouping key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketKey {
    /// Canonical location key (see [`Report::location_key`]).
    pub location: String,
    /// Canonical category key (see [`Report::category_key`]).
    pub category: String,
}

impl BucketKey {
    /// Builds the key a report groups under.
    #[must_use]
    pub fn for_report(report: &Report) -> Self {
        Self {
            location: report.location_key().to_string(),
            category: report.category_key().to_string(),
        }
    }
}

/// Reports sharing a [`BucketKey`], in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    /// The shared key.
    pub key: BucketKey,
    /// Member reports in the order they were grouped.
    pub reports: Vec<Report>,
}

impl Bucket {
    /// Number of reports in the bucket.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    /// Returns `true` if the bucket holds no reports.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

/// Insertion-ordered collection of buckets.
///
/// Iteration yields buckets in the order their key was first seen, which
/// downstream stages rely on for stable output ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buckets {
    buckets: Vec<Bucket>,
    index: BTreeMap<BucketKey, usize>,
}

impl Buckets {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a report to the bucket for `key`, creating it if needed.
    pub fn push(&mut self, key: BucketKey, report: Report) {
        if let Some(&idx) = self.index.get(&key) {
            self.buckets[idx].reports.push(report);
        } else {
            self.index.insert(key.clone(), self.buckets.len());
            self.buckets.push(Bucket {
                key,
                reports: vec![report],
            });
        }
    }

    /// Looks up a bucket by key.
    #[must_use]
    pub fn get(&self, key: &BucketKey) -> Option<&Bucket> {
        self.index.get(key).map(|&idx| &self.buckets[idx])
    }

    /// Number of distinct buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Returns `true` if no report was grouped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Iterates buckets in first-seen order.
    pub fn iter(&self) -> std::slice::Iter<'_, Bucket> {
        self.buckets.iter()
    }
}

impl IntoIterator for Buckets {
    type Item = Bucket;
    type IntoIter = std::vec::IntoIter<Bucket>;

    fn into_iter(self) -> Self::IntoIter {
        self.buckets.into_iter()
    }
}

impl<'a> IntoIterator for &'a Buckets {
    type Item = &'a Bucket;
    type IntoIter = std::slice::Iter<'a, Bucket>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A bucket that met the spike threshold.
///
/// Always holds at least one report and `count() == reports().len()`.
/// Fields are private so the invariant cannot be broken after
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateEvent {
    location_key: String,
    category_key: String,
    count: usize,
    sample_reports: Vec<Report>,
    reports: Vec<Report>,
}

impl CandidateEvent {
    /// Promotes a bucket to a candidate. Returns `None` for an empty
    /// bucket.
    #[must_use]
    pub fn from_bucket(bucket: Bucket) -> Option<Self> {
        let sample = bucket.reports.first()?.clone();
        Some(Self {
            location_key: bucket.key.location,
            category_key: bucket.key.category,
            count: bucket.reports.len(),
            sample_reports: vec![sample],
            reports: bucket.reports,
        })
    }

    /// Canonical location key of the source bucket.
    #[must_use]
    pub fn location_key(&self) -> &str {
        &self.location_key
    }

    /// Canonical category key of the source bucket.
    #[must_use]
    pub fn category_key(&self) -> &str {
        &self.category_key
    }

    /// Number of reports in the candidate.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Representative reports (the first report of the bucket).
    #[must_use]
    pub fn sample_reports(&self) -> &[Report] {
        &self.sample_reports
    }

    /// Every report in the candidate, in grouping order.
    #[must_use]
    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    /// Descriptions of all reports joined with a single space.
    #[must_use]
    pub fn joined_descriptions(&self) -> String {
        self.reports
            .iter()
            .map(|r| r.description.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
