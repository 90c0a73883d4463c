//! Predictive alerts raised from report spikes.

use chrono::{DateTime, Utc};
use city_pulse_report_models::Report;
use city_pulse_signal_models::{Alert, CandidateEvent, PipelineOptions, PredictedAlert};

use crate::capability::AlertPredictor;
use crate::{grouping, spike};

/// Impact text attached to spike alerts that were not predicted.
pub const SPIKE_IMPACT: &str = "Potential issue detected";

/// Impact text for predicted alerts without a timeframe.
pub const PREDICTED_IMPACT: &str = "Predicted";

/// Builds the plain alert for a detected spike.
#[must_use]
pub fn spike_alert(candidate: &CandidateEvent, now: DateTime<Utc>) -> Alert {
    Alert {
        kind: candidate.category_key().to_string(),
        area: candidate.location_key().to_string(),
        message: format!(
            "Spike: {} reports of {} in {}",
            candidate.count(),
            candidate.category_key(),
            candidate.location_key()
        ),
        timestamp: now,
        impact: SPIKE_IMPACT.to_string(),
        probability: None,
    }
}

fn from_prediction(predicted: PredictedAlert, now: DateTime<Utc>) -> Alert {
    Alert {
        kind: predicted.kind,
        area: predicted.area,
        message: predicted.message,
        timestamp: now,
        impact: predicted
            .timeframe
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| PREDICTED_IMPACT.to_string()),
        probability: predicted.probability.map(|p| p.clamp(0.0, 1.0)),
    }
}

/// Detects spikes within the alert window and turns them into alerts.
///
/// The predictor gets the first say. If it fails or predicts nothing,
/// every spike becomes a [`spike_alert`] instead.
pub async fn analyze_alerts(
    reports: &[Report],
    options: &PipelineOptions,
    predictor: &dyn AlertPredictor,
) -> Vec<Alert> {
    let now = options.now();
    let spikes = spike::detect(
        grouping::group(reports, options.window(), now),
        options.threshold(),
    );
    if spikes.is_empty() {
        return Vec::new();
    }

    let predicted = match predictor.predict(&spikes).await {
        Ok(predicted) => predicted,
        Err(e) => {
            log::warn!("Alert prediction failed, using spike alerts: {e}");
            Vec::new()
        }
    };

    if predicted.is_empty() {
        return spikes.iter().map(|s| spike_alert(s, now)).collect();
    }

    predicted
        .into_iter()
        .map(|p| from_prediction(p, now))
        .collect()
}
