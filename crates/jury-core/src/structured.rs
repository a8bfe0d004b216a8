//! Structured generation against a judge model.
//!
//! [`StructuredGenerator`] turns a prompt into a typed judge result,
//! negotiating the generation path from the model's declared capabilities:
//!
//! 1. metered model declaring schemas → schema call, cost kept;
//! 2. other schema-capable model → schema call, cost dropped;
//! 3. free-text call, sanitized and parsed locally.
//!
//! A capability mismatch on a schema call drops to tier 3. A metered model
//! that does not declare schema support goes straight to tier 3 and its
//! cost is still kept.
//!
//! Capabilities are read once, when the generator is built. Each tier is
//! attempted at most once per call and an unparseable answer is an error;
//! there is no default score.

use std::sync::{Arc, OnceLock};

use judge_model::{Capabilities, JudgeModel, RawResponse};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::{JudgeSchema, JuryError, Result};
use crate::metrics::METRICS;
use crate::obs::emit_judge_fallback;

/// Models known never to expose token log-probabilities.
pub const LOGPROBS_UNSUPPORTED_MODELS: &[&str] = &[
    "o1",
    "o1-preview",
    "o1-2024-12-17",
    "o1-preview-2024-09-12",
    "o1-mini",
    "o1-mini-2024-09-12",
    "o3-mini",
    "o3-mini-2025-01-31",
    "gpt-4.5-preview-2025-02-27",
];

/// How a judged value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPath {
    /// Schema call on a metered model.
    Metered,
    /// Schema call on an external model.
    Schema,
    /// Free-text call parsed locally.
    Text,
    /// Raw response with log-probabilities, parsed locally.
    Raw,
}

/// A typed judge result with the cost of obtaining it.
#[derive(Debug, Clone, PartialEq)]
pub struct Judged<T> {
    pub value: T,
    /// `None` unless the model is metered.
    pub cost: Option<f64>,
    pub path: GenerationPath,
}

/// Capability-aware front end to a judge model.
#[derive(Clone)]
pub struct StructuredGenerator {
    model: Arc<dyn JudgeModel>,
    capabilities: Capabilities,
}

impl std::fmt::Debug for StructuredGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredGenerator")
            .field("model", &self.model.model_name())
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

impl StructuredGenerator {
    pub fn new(model: Arc<dyn JudgeModel>) -> Self {
        let capabilities = model.capabilities();
        debug!(
            model = %model.model_name(),
            schema = capabilities.schema,
            logprobs = capabilities.logprobs,
            metered = capabilities.metered,
            "resolved judge capabilities"
        );
        Self {
            model,
            capabilities,
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn is_metered(&self) -> bool {
        self.capabilities.metered
    }

    /// Whether the raw log-probability path may be attempted at all.
    pub fn supports_logprobs(&self) -> bool {
        self.capabilities.logprobs && !LOGPROBS_UNSUPPORTED_MODELS.contains(&self.model_name())
    }

    /// Ask the judge for a `T`.
    #[instrument(skip(self, prompt), fields(shape = %T::SHAPE, model = %self.model_name()))]
    pub async fn generate<T: JudgeSchema>(&self, prompt: &str) -> Result<Judged<T>> {
        METRICS.inc_judge_calls();

        if self.capabilities.schema {
            match self
                .model
                .generate_with_schema(prompt, &T::output_schema())
                .await
            {
                Ok(out) => {
                    let path = if self.capabilities.metered {
                        GenerationPath::Metered
                    } else {
                        GenerationPath::Schema
                    };
                    return Ok(Judged {
                        value: decode_value(out.value)?,
                        cost: self.tracked(out.cost),
                        path,
                    });
                }
                Err(e) if e.is_unsupported() => {
                    METRICS.inc_schema_fallbacks();
                    emit_judge_fallback(T::SHAPE, "schema", "text");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let completion = self.model.generate(prompt).await?;
        Ok(Judged {
            value: parse_judge_json(&completion.text)?,
            cost: self.tracked(completion.cost),
            path: GenerationPath::Text,
        })
    }

    /// Ask for a raw response with `top_logprobs` alternatives per token.
    ///
    /// `Ok(None)` means the log-probability path is unavailable for this
    /// model; the caller should take its structured path instead.
    #[instrument(skip(self, prompt), fields(model = %self.model_name()))]
    pub async fn generate_raw(
        &self,
        prompt: &str,
        top_logprobs: usize,
    ) -> Result<Option<RawResponse>> {
        if !self.supports_logprobs() {
            return Ok(None);
        }
        METRICS.inc_judge_calls();
        match self.model.generate_raw(prompt, top_logprobs).await {
            Ok(mut raw) => {
                raw.cost = self.tracked(raw.cost);
                Ok(Some(raw))
            }
            Err(e) if e.is_unsupported() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn tracked(&self, cost: Option<f64>) -> Option<f64> {
        if self.capabilities.metered {
            cost
        } else {
            None
        }
    }
}

fn decode_value<T: JudgeSchema>(value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| JuryError::Parse {
        shape: T::SHAPE.to_string(),
        detail: e.to_string(),
    })
}

fn trailing_comma() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([\]}])").expect("static regex is valid"))
}

/// Cut the JSON object out of a free-text judge answer.
///
/// Keeps the text from the first `{` to the last `}` (closing an unclosed
/// object) and drops trailing commas before `}` or `]`. Returns an empty
/// string when the answer contains no object at all.
pub fn sanitize_json(text: &str) -> String {
    let body = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => text[start..=end].to_string(),
        (Some(start), _) => format!("{}}}", &text[start..]),
        (None, _) => String::new(),
    };
    trailing_comma().replace_all(&body, "$1").into_owned()
}

/// Sanitize a free-text judge answer and parse it as `T`.
pub fn parse_judge_json<T: JudgeSchema>(text: &str) -> Result<T> {
    let body = sanitize_json(text);
    if body.is_empty() {
        return Err(JuryError::Parse {
            shape: T::SHAPE.to_string(),
            detail: "no JSON object in judge output".to_string(),
        });
    }
    serde_json::from_str(&body).map_err(|e| JuryError::Parse {
        shape: T::SHAPE.to_string(),
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ScoreReason, Verdict};

    #[test]
    fn test_sanitize_strips_fences_and_commentary() {
        let text = "Sure! Here is the verdict:\n```json\n{\"verdict\": \"no\", \"reason\": \"off topic\"}\n```\nHope it helps.";
        assert_eq!(
            sanitize_json(text),
            "{\"verdict\": \"no\", \"reason\": \"off topic\"}"
        );
    }

    #[test]
    fn test_sanitize_drops_trailing_commas() {
        let text = r#"{"steps": ["a", "b",], "x": 1,}"#;
        assert_eq!(sanitize_json(text), r#"{"steps": ["a", "b"], "x": 1}"#);
    }

    #[test]
    fn test_sanitize_closes_unterminated_object() {
        let text = r#"{"reason": "cut short""#;
        assert_eq!(sanitize_json(text), r#"{"reason": "cut short"}"#);
    }

    #[test]
    fn test_parse_judge_json_typed() {
        let sr: ScoreReason =
            parse_judge_json("result: {\"score\": 8, \"reason\": \"good\"}").expect("parse");
        assert_eq!(sr.score, 8.0);
        assert_eq!(sr.reason, "good");
    }

    #[test]
    fn test_parse_without_object_is_hard_failure() {
        let err = parse_judge_json::<Verdict>("I think the answer is yes.").unwrap_err();
        match err {
            JuryError::Parse { shape, .. } => assert_eq!(shape, "Verdict"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_wrong_shape_is_hard_failure() {
        let err = parse_judge_json::<ScoreReason>(r#"{"verdict": "yes"}"#).unwrap_err();
        assert!(matches!(err, JuryError::Parse { .. }));
    }
}
