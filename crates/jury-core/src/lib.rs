//! Jury Core Library
//!
//! LLM-as-judge evaluation: a judge model scores a candidate output against
//! a criterion (or picks the best of several candidates), its answer is
//! parsed under a layered structured-output protocol, and unit verdicts are
//! aggregated into a final score.
//!
//! Entry point is [`Harness`]; metrics are [`CriterionMetric`] and
//! [`ConversationRelevancy`].

pub mod config;
pub mod criterion;
pub mod domain;
pub mod harness;
pub mod metrics;
pub mod obs;
pub mod parallel;
pub mod relevancy;
pub mod structured;
pub mod telemetry;
pub mod templates;

pub use config::HarnessConfig;

pub use criterion::{
    weighted_score, Compared, CriterionMetric, CriterionMetricBuilder, ResolvedSteps, Scored,
    StepCache, DEFAULT_TOP_LOGPROBS, MEVAL_SUFFIX,
};

pub use domain::{
    ComparisonResult, ConversationalTestCase, Decision, EvaluationResult, EvaluationSteps,
    JudgeSchema, JuryError, ReasonOnly, Result, ResultShape, Rubric, RubricEntry, ScoreReason,
    TestCase, TestCaseParam, Turn, ValidationError, Verdict,
};

pub use harness::{CostLedger, Harness, MeasurementStage};

pub use obs::{
    emit_judge_fallback, emit_measurement_failed, emit_measurement_finished,
    emit_measurement_started, emit_stage, measurement_span,
};

pub use parallel::{run_all_or_nothing, run_batch, ExecutionMode};

pub use relevancy::{
    relevancy_score, sliding_windows, ConversationRelevancy, DEFAULT_WINDOW_SIZE,
};

pub use structured::{
    parse_judge_json, sanitize_json, GenerationPath, Judged, StructuredGenerator,
    LOGPROBS_UNSUPPORTED_MODELS,
};

pub use judge_model::{Capabilities, JudgeModel, ModelError};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
