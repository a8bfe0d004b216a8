//! Domain models for Jury.
//!
//! Canonical definitions for the core entities:
//! - `TestCase` / `ConversationalTestCase`: what gets judged
//! - `Rubric`: validated score bands
//! - `Verdict`, `ScoreReason`, `ComparisonResult`, `EvaluationSteps`: judge outputs
//! - `EvaluationResult`: what a measurement publishes

pub mod error;
pub mod judgement;
pub mod result;
pub mod rubric;
pub mod test_case;

// Re-export main types and errors
pub use error::{JuryError, Result, ValidationError};
pub use judgement::{
    ComparisonResult, Decision, EvaluationSteps, JudgeSchema, ReasonOnly, ResultShape,
    ScoreReason, Verdict,
};
pub use result::EvaluationResult;
pub use rubric::{Rubric, RubricEntry};
pub use test_case::{ConversationalTestCase, TestCase, TestCaseParam, Turn};
