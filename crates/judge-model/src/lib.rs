//! Judge-Model: capability contract for LLM judges
//!
//! This crate defines what the evaluation core needs from a generative
//! model acting as a judge, and nothing about how the model is hosted.
//!
//! ## Key Components
//!
//! - `JudgeModel`: async trait with a mandatory text operation and optional
//!   schema-constrained and log-probability operations
//! - `Capabilities`: the capability set a model declares up front
//! - `fakes::ScriptedJudge`: scripted in-memory judge for tests

mod error;
pub mod fakes;
pub mod model_traits;

pub use error::ModelError;
pub use model_traits::{
    Capabilities, Capability, Completion, JudgeModel, ModelResult, OutputSchema, RawResponse,
    StructuredCompletion, TokenLogprob, TopLogprob,
};
