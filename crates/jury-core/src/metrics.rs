//! Global atomic counters for Jury observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of an evaluation batch).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters. No allocations, no locking.
pub struct Metrics {
    judge_calls: AtomicU64,
    schema_fallbacks: AtomicU64,
    logprob_refinements: AtomicU64,
    measurements_failed: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            judge_calls: AtomicU64::new(0),
            schema_fallbacks: AtomicU64::new(0),
            logprob_refinements: AtomicU64::new(0),
            measurements_failed: AtomicU64::new(0),
        }
    }

    /// Increment the judge-calls counter by one.
    pub fn inc_judge_calls(&self) {
        self.judge_calls.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "judge_calls", "counter incremented");
    }

    /// Increment the schema-fallbacks counter by one.
    pub fn inc_schema_fallbacks(&self) {
        self.schema_fallbacks.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "schema_fallbacks", "counter incremented");
    }

    /// Increment the logprob-refinements counter by one.
    pub fn inc_logprob_refinements(&self) {
        self.logprob_refinements.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "logprob_refinements", "counter incremented");
    }

    /// Increment the measurements-failed counter by one.
    pub fn inc_measurements_failed(&self) {
        self.measurements_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "measurements_failed", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this at natural boundaries (end of a batch of measurements)
    /// rather than on every increment.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            judge_calls = self.judge_calls(),
            schema_fallbacks = self.schema_fallbacks(),
            logprob_refinements = self.logprob_refinements(),
            measurements_failed = self.measurements_failed(),
        );
    }

    pub fn judge_calls(&self) -> u64 {
        self.judge_calls.load(Ordering::Relaxed)
    }

    pub fn schema_fallbacks(&self) -> u64 {
        self.schema_fallbacks.load(Ordering::Relaxed)
    }

    pub fn logprob_refinements(&self) -> u64 {
        self.logprob_refinements.load(Ordering::Relaxed)
    }

    pub fn measurements_failed(&self) -> u64 {
        self.measurements_failed.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.judge_calls.store(0, Ordering::Relaxed);
        self.schema_fallbacks.store(0, Ordering::Relaxed);
        self.logprob_refinements.store(0, Ordering::Relaxed);
        self.measurements_failed.store(0, Ordering::Relaxed);
    }
}
