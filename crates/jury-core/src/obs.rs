//! Structured observability hooks for the measurement lifecycle.
//!
//! This module provides:
//! - Measurement-scoped tracing spans via [`measurement_span`]
//! - Emission functions for key lifecycle events: start, stage change,
//!   generation fallback, finish, failure
//!
//! Events are emitted at `info!` level unless noted. For JSON output, pass
//! `json = true` to [`crate::telemetry::init_tracing`].

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::ResultShape;

/// Span tagging everything inside one measurement with its id and metric.
///
/// Attach it to the measurement future with `tracing::Instrument` rather
/// than entering it, so the future stays `Send` across judge calls.
///
/// # Example
///
/// ```ignore
/// async { /* judge calls */ }
///     .instrument(measurement_span(measurement_id, "Correctness [MEval]"))
///     .await
/// ```
pub fn measurement_span(measurement_id: Uuid, metric: &str) -> tracing::Span {
    tracing::info_span!(
        "jury.measurement",
        measurement_id = %measurement_id,
        metric = %metric,
    )
}

/// Emit event: measurement started.
pub fn emit_measurement_started(measurement_id: Uuid, metric: &str, model: &str) {
    info!(
        event = "measurement.started",
        measurement_id = %measurement_id,
        metric = %metric,
        model = %model,
    );
}

/// Emit event: measurement moved to a new stage (`debug!` level).
pub fn emit_stage(measurement_id: Uuid, stage: &str) {
    debug!(event = "measurement.stage", measurement_id = %measurement_id, stage = %stage);
}

/// Emit event: a generation tier was skipped for the next one.
pub fn emit_judge_fallback(shape: ResultShape, from: &str, to: &str) {
    debug!(event = "judge.fallback", shape = %shape, from = %from, to = %to);
}

/// Emit event: measurement finished with score, success and duration.
pub fn emit_measurement_finished(
    measurement_id: Uuid,
    score: f64,
    success: bool,
    cost: Option<f64>,
    duration_ms: u64,
) {
    info!(
        event = "measurement.finished",
        measurement_id = %measurement_id,
        score = score,
        success = success,
        cost = ?cost,
        duration_ms = duration_ms,
    );
}

/// Emit event: measurement failed (warning level).
pub fn emit_measurement_failed(measurement_id: Uuid, stage: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "measurement.failed",
        measurement_id = %measurement_id,
        stage = %stage,
        error = %error,
    );
}
