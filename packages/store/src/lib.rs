#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Report stores.
//!
//! A store hands the pipeline a flat collection of [`Report`]s. Records
//! are read as [`RawReport`] and normalized on the way out, so timestamp
//! shapes never leak past this crate.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use city_pulse_report_models::{RawReport, Report};
use serde::Deserialize;

/// Errors that can occur while reading reports.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Source of citizen reports.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Returns every report currently in the store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing storage cannot be read.
    async fn fetch_reports(&self) -> Result<Vec<Report>, StoreError>;
}

/// A store holding reports in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReportStore {
    reports: Vec<Report>,
}

impl InMemoryReportStore {
    /// Creates a store over `reports`.
    #[must_use]
    pub const fn new(reports: Vec<Report>) -> Self {
        Self { reports }
    }

    /// Creates a store from raw records, normalizing each.
    #[must_use]
    pub fn from_raw(raw: Vec<RawReport>) -> Self {
        Self::new(raw.into_iter().map(Report::from).collect())
    }

    /// Adds a report.
    pub fn push(&mut self, report: Report) {
        self.reports.push(report);
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn fetch_reports(&self) -> Result<Vec<Report>, StoreError> {
        Ok(self.reports.clone())
    }
}

/// A store backed by a JSON file.
///
/// The file holds either an array of report records or an object with a
/// `reports` array. Records that do not match the report shape are
/// skipped with a warning.
#[derive(Debug, Clone)]
pub struct JsonFileReportStore {
    path: PathBuf,
}

impl JsonFileReportStore {
    /// Creates a store reading from `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReportFile {
    List(Vec<serde_json::Value>),
    Wrapped { reports: Vec<serde_json::Value> },
}

/// Parses report records from JSON text.
///
/// # Errors
///
/// Returns [`StoreError::Json`] if the text is not a report list or a
/// `{"reports": [...]}` object.
pub fn parse_reports(data: &str) -> Result<Vec<Report>, StoreError> {
    let records = match serde_json::from_str::<ReportFile>(data)? {
        ReportFile::List(records) | ReportFile::Wrapped { reports: records } => records,
    };
    let raw_count = records.len();
    let mut reports = Vec::with_capacity(raw_count);

    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<RawReport>(record) {
            Ok(raw) => reports.push(Report::from(raw)),
            Err(e) => log::warn!("Skipping malformed report #{index}: {e}"),
        }
    }

    log::debug!("Parsed {}/{raw_count} report records", reports.len());
    Ok(reports)
}

#[async_trait]
impl ReportStore for JsonFileReportStore {
    async fn fetch_reports(&self) -> Result<Vec<Report>, StoreError> {
        let data = tokio::fs::read_to_string(&self.path).await?;
        let reports = parse_reports(&data)?;
        log::info!(
            "Loaded {} report(s) from {}",
            reports.len(),
            self.path.display()
        );
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;

    #[test]
    fn parses_plain_array() {
        let data = r#"[
            {"id": "1", "description": "jam", "aiTag": "Traffic", "location": "Delhi",
             "timestamp": "2024-07-09T10:00:00Z"},
            {"id": "2", "description": "cut", "category": "Power",
             "location": {"city": "Mumbai", "area": "Andheri"},
             "timestamp": {"seconds": 1720519200}}
        ]"#;
        let reports = parse_reports(data).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].location_key(), "Delhi");
        assert_eq!(reports[1].location_key(), "Mumbai");
        assert_eq!(reports[0].timestamp, reports[1].timestamp);
    }

    #[test]
    fn parses_wrapped_object_and_skips_bad_records() {
        let data = r#"{"reports": [
            {"id": "1", "description": "ok"},
            {"id": 5, "description": ["not", "text"]}
        ]}"#;
        let reports = parse_reports(data).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id, "1");
        assert!(reports[0].timestamp.is_none());
    }

    #[test]
    fn odd_timestamp_shapes_keep_the_report() {
        let data = r#"[
            {"id": "a", "description": "x", "location": "Delhi", "timestamp": 1720519200000.0},
            {"id": "b", "description": "y", "location": "Delhi", "timestamp": {"_seconds": 1720519200}},
            {"id": "c", "description": "z", "location": "Delhi", "timestamp": "soon"},
            {"id": "d", "description": "w", "location": "Delhi", "timestamp": {"when": "noon"}}
        ]"#;
        let reports = parse_reports(data).unwrap();
        let ids: Vec<&str> = reports.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c", "d"]);

        let expected = DateTime::from_timestamp(1_720_519_200, 0);
        assert_eq!(reports[0].timestamp, expected);
        assert_eq!(reports[1].timestamp, expected);
        assert!(reports[2].timestamp.is_none());
        assert!(reports[3].timestamp.is_none());
    }

    #[test]
    fn rejects_non_report_json() {
        assert!(matches!(parse_reports("42"), Err(StoreError::Json(_))));
    }

    #[tokio::test]
    async fn in_memory_store_returns_its_reports() {
        let mut store = InMemoryReportStore::default();
        store.push(Report::new("a", "x"));
        let reports = store.fetch_reports().await.unwrap();
        assert_eq!(reports.len(), 1);
    }

    #[tokio::test]
    async fn json_file_store_reads_from_disk() {
        let path = std::env::temp_dir().join(format!(
            "city_pulse_store_test_{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"[{"id": "f", "description": "from disk"}]"#).unwrap();

        let reports = JsonFileReportStore::new(&path).fetch_reports().await.unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].description, "from disk");
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let store = JsonFileReportStore::new("/nonexistent/city_pulse/reports.json");
        assert!(matches!(
            store.fetch_reports().await,
            Err(StoreError::Io(_))
        ));
    }
}
