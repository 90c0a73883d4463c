#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Citizen report types shared across the city-pulse workspace.
//!
//! Report stores hand out [`RawReport`] records in whatever shape they were
//! written. Converting one into a [`Report`] normalizes the timestamp and is
//! the only place upstream shape differences are dealt with; everything
//! downstream works on [`Report`] and its canonical
//! [`location_key`](Report::location_key) /
//! [`category_key`](Report::category_key).

pub mod timestamp;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use timestamp::{RawTimestamp, parse_iso_timestamp};

/// Location key used when a report carries no usable location.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Category key used when a report carries neither an AI tag nor a
/// user-assigned category.
pub const GENERAL_CATEGORY: &str = "General";

/// Severity label attached to synthesized events and summaries.
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
pub enum Severity {
    /// Minor or informational.
    Low,
    /// Noticeable disruption. Used whenever no better signal is available.
    #[default]
    Medium,
    /// Significant disruption.
    High,
}

/// Where a report was filed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportLocation {
    /// A single free-form place name (city or area).
    Named(String),
    /// A structured place.
    Structured {
        /// City name.
        #[serde(default)]
        city: Option<String>,
        /// Neighbourhood or area within the city.
        #[serde(default)]
        area: Option<String>,
    },
}

/// A report record as read from a store, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReport {
    /// Store-assigned identifier.
    #[serde(default)]
    pub id: String,
    /// Free-text description written by the citizen.
    #[serde(default)]
    pub description: String,
    /// User-assigned category.
    #[serde(default)]
    pub category: Option<String>,
    /// AI-assigned tag.
    #[serde(default)]
    pub ai_tag: Option<String>,
    /// Location, flat or structured.
    #[serde(default)]
    pub location: Option<ReportLocation>,
    /// Top-level city field carried by older records.
    #[serde(default)]
    pub city: Option<String>,
    /// Submission time in any supported shape. Unrecognized shapes read
    /// as `None` instead of rejecting the record.
    #[serde(default, deserialize_with = "timestamp::deserialize_lenient")]
    pub timestamp: Option<RawTimestamp>,
}

/// A normalized citizen report.
///
/// Read-only to the aggregation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Store-assigned identifier.
    pub id: String,
    /// Free-text description.
    pub description: String,
    /// User-assigned category.
    pub category: Option<String>,
    /// AI-assigned tag.
    pub ai_tag: Option<String>,
    /// Location, flat or structured.
    pub location: Option<ReportLocation>,
    /// Top-level city field carried by older records.
    pub city: Option<String>,
    /// Submission instant. `None` when the source timestamp was missing or
    /// could not be parsed.
    pub timestamp: Option<DateTime<Utc>>,
}

impl From<RawReport> for Report {
    fn from(raw: RawReport) -> Self {
        let timestamp = raw.timestamp.as_ref().and_then(RawTimestamp::normalize);
        Self {
            id: raw.id,
            description: raw.description,
            category: raw.category,
            ai_tag: raw.ai_tag,
            location: raw.location,
            city: raw.city,
            timestamp,
        }
    }
}

impl Report {
    /// Creates a report with only an id and description set.
    #[must_use]
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            category: None,
            ai_tag: None,
            location: None,
            city: None,
            timestamp: None,
        }
    }

    /// Sets a flat location name.
    #[must_use]
    pub fn with_location(mut self, name: impl Into<String>) -> Self {
        self.location = Some(ReportLocation::Named(name.into()));
        self
    }

    /// Sets a structured `{city, area}` location.
    #[must_use]
    pub fn with_place(mut self, city: Option<&str>, area: Option<&str>) -> Self {
        self.location = Some(ReportLocation::Structured {
            city: city.map(str::to_string),
            area: area.map(str::to_string),
        });
        self
    }

    /// Sets the user-assigned category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the AI-assigned tag.
    #[must_use]
    pub fn with_ai_tag(mut self, tag: impl Into<String>) -> Self {
        self.ai_tag = Some(tag.into());
        self
    }

    /// Sets the submission instant.
    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Canonical location key.
    ///
    /// Priority: structured city, structured area, flat location name,
    /// top-level city, then [`UNKNOWN_LOCATION`]. Blank strings are
    /// treated as absent.
    #[must_use]
    pub fn location_key(&self) -> &str {
        let (structured_city, structured_area, named) = match &self.location {
            Some(ReportLocation::Structured { city, area }) => {
                (city.as_deref(), area.as_deref(), None)
            }
            Some(ReportLocation::Named(name)) => (None, None, Some(name.as_str())),
            None => (None, None, None),
        };

        [structured_city, structured_area, named, self.city.as_deref()]
            .into_iter()
            .find_map(non_blank)
            .unwrap_or(UNKNOWN_LOCATION)
    }

    /// Canonical category key.
    ///
    /// Prefers the AI tag over the user-assigned category, falling back to
    /// [`GENERAL_CATEGORY`].
    #[must_use]
    pub fn category_key(&self) -> &str {
        non_blank(self.ai_tag.as_deref())
            .or_else(|| non_blank(self.category.as_deref()))
            .unwrap_or(GENERAL_CATEGORY)
    }

    /// Returns `true` if any of the report's place fields (structured city,
    /// structured area, flat name, or top-level city) equals `place`.
    #[must_use]
    pub fn mentions_place(&self, place: &str) -> bool {
        let fields: [Option<&str>; 3] = match &self.location {
            Some(ReportLocation::Structured { city, area }) => {
                [city.as_deref(), area.as_deref(), self.city.as_deref()]
            }
            Some(ReportLocation::Named(name)) => [Some(name.as_str()), self.city.as_deref(), None],
            None => [self.city.as_deref(), None, None],
        };
        fields.into_iter().flatten().any(|f| f == place)
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}
