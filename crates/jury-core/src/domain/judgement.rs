//! Shapes the judge model is asked to produce.
//!
//! Every shape implements [`JudgeSchema`], which ties it to a
//! [`ResultShape`] tag and the JSON schema handed to schema-capable models.
//! Callers request a shape by type; how the value was obtained (schema
//! call, local parse of free text, raw log-probability response) is the
//! structured-generation adapter's business.

use judge_model::OutputSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Tag naming each judge result shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultShape {
    Verdict,
    ScoreReason,
    Comparison,
    EvaluationSteps,
    Reason,
}

impl ResultShape {
    pub fn name(self) -> &'static str {
        match self {
            Self::Verdict => "Verdict",
            Self::ScoreReason => "ScoreReason",
            Self::Comparison => "ComparisonResult",
            Self::EvaluationSteps => "EvaluationSteps",
            Self::Reason => "Reason",
        }
    }

    /// JSON schema describing the shape.
    pub fn output_schema(self) -> OutputSchema {
        let schema = match self {
            Self::Verdict => json!({
                "type": "object",
                "properties": {
                    "verdict": {"type": "string", "enum": ["yes", "no"]},
                    "reason": {"type": "string"}
                },
                "required": ["verdict"]
            }),
            Self::ScoreReason => json!({
                "type": "object",
                "properties": {
                    "score": {"type": "number"},
                    "reason": {"type": "string"}
                },
                "required": ["score", "reason"]
            }),
            Self::Comparison => json!({
                "type": "object",
                "properties": {
                    "best_test_case_index": {"type": "integer", "minimum": 0},
                    "reason": {"type": "string"}
                },
                "required": ["best_test_case_index", "reason"]
            }),
            Self::EvaluationSteps => json!({
                "type": "object",
                "properties": {
                    "steps": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["steps"]
            }),
            Self::Reason => json!({
                "type": "object",
                "properties": {"reason": {"type": "string"}},
                "required": ["reason"]
            }),
        };
        OutputSchema {
            name: self.name().to_string(),
            schema,
        }
    }
}

impl std::fmt::Display for ResultShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A type the judge can be asked to produce.
pub trait JudgeSchema: DeserializeOwned + Send + 'static {
    const SHAPE: ResultShape;

    fn output_schema() -> OutputSchema {
        Self::SHAPE.output_schema()
    }
}

/// Binary relevance decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Yes,
    No,
}

/// Judge decision for one window or unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Raw decision text, expected to be `"yes"` or `"no"`.
    pub verdict: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Verdict {
    pub fn yes() -> Self {
        Self {
            verdict: "yes".to_string(),
            reason: None,
        }
    }

    pub fn no(reason: impl Into<String>) -> Self {
        Self {
            verdict: "no".to_string(),
            reason: Some(reason.into()),
        }
    }

    /// Only an explicit "no" counts against relevance.
    pub fn decision(&self) -> Decision {
        if self.verdict.trim().eq_ignore_ascii_case("no") {
            Decision::No
        } else {
            Decision::Yes
        }
    }

    pub fn is_relevant(&self) -> bool {
        self.decision() == Decision::Yes
    }
}

impl JudgeSchema for Verdict {
    const SHAPE: ResultShape = ResultShape::Verdict;
}

/// Score on the judge's integer scale with its justification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReason {
    pub score: f64,
    pub reason: String,
}

impl JudgeSchema for ScoreReason {
    const SHAPE: ResultShape = ResultShape::ScoreReason;
}

/// Best candidate picked in an N-way comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonResult {
    #[serde(alias = "best_index")]
    pub best_test_case_index: usize,
    pub reason: String,
}

impl JudgeSchema for ComparisonResult {
    const SHAPE: ResultShape = ResultShape::Comparison;
}

/// Ordered evaluation instructions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationSteps {
    pub steps: Vec<String>,
}

impl JudgeSchema for EvaluationSteps {
    const SHAPE: ResultShape = ResultShape::EvaluationSteps;
}

/// Consolidated explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonOnly {
    pub reason: String,
}

impl JudgeSchema for ReasonOnly {
    const SHAPE: ResultShape = ResultShape::Reason;
}
