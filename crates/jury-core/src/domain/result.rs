//! Measurement output published by the harness.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of one measurement call.
///
/// Created fresh by the harness for every call; nothing carries over from
/// one measurement to the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Identifier of the measurement that produced this result.
    pub measurement_id: Uuid,

    /// Display name of the metric.
    pub metric: String,

    /// Score in 0.0-1.0 (0 or 1 in strict mode).
    pub score: f64,

    /// `score >= threshold`, or `true` for a successful comparison.
    pub success: bool,

    /// Threshold the score was compared against.
    pub threshold: f64,

    pub strict_mode: bool,

    /// Judge-authored explanation, when reasons were requested.
    pub reason: Option<String>,

    /// Summed cost of all judge calls; `None` when the judge is not metered.
    pub evaluation_cost: Option<f64>,

    /// Name of the judge model.
    pub evaluation_model: String,

    /// Step-by-step trace of the measurement.
    pub verbose_logs: String,

    /// Offset of the best candidate (comparison only).
    pub best_candidate_index: Option<usize>,

    /// Error that terminated the measurement, if any.
    pub error: Option<String>,

    /// When the measurement finished.
    pub evaluated_at: DateTime<Utc>,
}

impl EvaluationResult {
    /// Failed result for a measurement that ended in `error`.
    pub fn failed(
        measurement_id: Uuid,
        metric: &str,
        threshold: f64,
        strict_mode: bool,
        evaluation_model: &str,
        error: &dyn std::fmt::Display,
    ) -> Self {
        Self {
            measurement_id,
            metric: metric.to_string(),
            score: 0.0,
            success: false,
            threshold,
            strict_mode,
            reason: None,
            evaluation_cost: None,
            evaluation_model: evaluation_model.to_string(),
            verbose_logs: String::new(),
            best_candidate_index: None,
            error: Some(error.to_string()),
            evaluated_at: Utc::now(),
        }
    }
}

/// Join trace steps with blank lines between them.
pub fn join_verbose_steps(steps: &[String]) -> String {
    steps.join("\n\n")
}
