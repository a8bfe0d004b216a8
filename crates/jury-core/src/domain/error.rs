//! Domain-level error taxonomy for Jury.

use judge_model::ModelError;
use uuid::Uuid;

/// Errors raised before any judge call is made.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("test case is missing required param: {param}")]
    MissingParam { param: String },

    #[error("all compared test cases must share the same input")]
    MismatchedInputs,

    #[error("comparison needs at least 2 test cases, got {found}")]
    TooFewCandidates { found: usize },

    #[error("invalid rubric: {0}")]
    InvalidRubric(String),

    #[error("either criteria or evaluation steps must be provided")]
    MissingCriteria,

    #[error("evaluation steps must not be empty")]
    EmptyEvaluationSteps,

    #[error("evaluation params must not be empty")]
    EmptyEvaluationParams,

    #[error("window size must be at least 1")]
    InvalidWindowSize,
}

/// Jury errors.
#[derive(Debug, thiserror::Error)]
pub enum JuryError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("judge model error: {0}")]
    Model(#[from] ModelError),

    #[error("judge returned unparseable {shape}: {detail}")]
    Parse { shape: String, detail: String },

    #[error("judge selected candidate {index} but only {count} were given")]
    CandidateIndex { index: usize, count: usize },

    #[error("judge batch failed: {detail}")]
    Batch { detail: String },

    #[error("runtime error: {0}")]
    Runtime(String),

    /// A harness measurement failed; wraps the cause with the measurement
    /// id and the stage it failed in.
    #[error("measurement {measurement_id} failed while {stage}: {source}")]
    Measurement {
        measurement_id: Uuid,
        stage: String,
        source: Box<JuryError>,
    },
}

impl JuryError {
    /// The underlying cause, with any measurement context stripped.
    pub fn root(&self) -> &JuryError {
        match self {
            Self::Measurement { source, .. } => source.root(),
            other => other,
        }
    }

    /// Id of the failed measurement, when the error came out of the harness.
    pub fn measurement_id(&self) -> Option<Uuid> {
        match self {
            Self::Measurement { measurement_id, .. } => Some(*measurement_id),
            _ => None,
        }
    }
}

/// Result type for Jury operations.
pub type Result<T> = std::result::Result<T, JuryError>;
