#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Report aggregation and signal extraction.
//!
//! Reports are grouped into `(location, category)` buckets within a
//! recency window ([`grouping`]), buckets that reach a threshold become
//! candidate events ([`spike`]), and each candidate is summarized through
//! an injected [`Summarizer`] before being assembled into a
//! [`SynthesizedEvent`] ([`assemble`]).
//!
//! The same building blocks back predictive alerts, notifications, area
//! summaries, city digests and mood maps. None of them fail because a
//! capability failed: every capability error degrades to a templated
//! fallback.

pub mod alerts;
pub mod area;
pub mod assemble;
pub mod capability;
pub mod digest;
pub mod grouping;
pub mod mood;
pub mod notifications;
pub mod spike;

use city_pulse_report_models::Report;
use city_pulse_signal_models::{InvalidOptionsError, PipelineOptions, SynthesizedEvent};
use thiserror::Error;

pub use capability::{AlertPredictor, SentimentClassifier, Summarizer, SummarizerError};

/// Errors that can occur when configuring the pipeline.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Pipeline options were rejected.
    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(#[from] InvalidOptionsError),
}

/// Builds validated pipeline options.
///
/// # Errors
///
/// Returns [`SignalError::InvalidConfig`] if `window` is not positive or
/// `threshold` is zero.
pub fn pipeline_options(
    window: chrono::TimeDelta,
    threshold: usize,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<PipelineOptions, SignalError> {
    Ok(PipelineOptions::new(window, threshold, now)?)
}

/// Runs the full synthesis pipeline over `reports`.
///
/// Returns one event per (location, category) bucket that reached the
/// threshold inside the window, in first-seen bucket order.
pub async fn synthesize_events(
    reports: &[Report],
    options: &PipelineOptions,
    summarizer: &dyn Summarizer,
) -> Vec<SynthesizedEvent> {
    let buckets = grouping::group(reports, options.window(), options.now());
    let candidates = spike::detect(buckets, options.threshold());

    log::info!(
        "Synthesizing {} event(s) from {} report(s)",
        candidates.len(),
        reports.len()
    );

    assemble::assemble(
        candidates,
        summarizer,
        options.summarizer_deadline(),
        options.now(),
    )
    .await
}
