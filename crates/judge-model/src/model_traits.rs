//! Judge-model trait definitions for Jury
//!
//! A judge model is the generative model asked to score or compare candidate
//! outputs. Backends differ in what they can do, so the contract is split in
//! three operations:
//! - `generate`: plain text completion (always available)
//! - `generate_with_schema`: completion constrained to a JSON schema
//! - `generate_raw`: completion plus top-K token log-probabilities
//!
//! Backends advertise the optional operations through [`Capabilities`]. The
//! default trait bodies for the optional operations return
//! [`ModelError::Unsupported`], so a text-only backend implements a single
//! method. In-memory fakes are provided for testing via the `fakes` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Result type for judge-model operations
pub type ModelResult<T> = std::result::Result<T, ModelError>;

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Optional operation a judge model may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Schema,
    Logprobs,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Schema => write!(f, "structured output"),
            Capability::Logprobs => write!(f, "token log-probabilities"),
        }
    }
}

/// Capability set declared by a judge model.
///
/// Queried once by callers; the answer must not change over the lifetime of
/// the model object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    /// `generate_with_schema` is implemented.
    pub schema: bool,
    /// `generate_raw` is implemented.
    pub logprobs: bool,
    /// The model meters its own usage and reports a cost on every call.
    pub metered: bool,
}

impl Capabilities {
    /// Plain text completion only.
    pub fn text_only() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self) -> Self {
        self.schema = true;
        self
    }

    pub fn with_logprobs(mut self) -> Self {
        self.logprobs = true;
        self
    }

    /// Mark the model as metered. Metered models always accept schemas.
    pub fn metered(mut self) -> Self {
        self.metered = true;
        self.schema = true;
        self
    }

    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Schema => self.schema,
            Capability::Logprobs => self.logprobs,
        }
    }
}

// ---------------------------------------------------------------------------
// Completions
// ---------------------------------------------------------------------------

/// Free-text completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    /// Cost reported by a metered model; `None` when untracked.
    pub cost: Option<f64>,
}

impl Completion {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cost: None,
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }
}

/// JSON schema the model output must conform to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSchema {
    /// Schema title, e.g. `"Verdict"`.
    pub name: String,
    /// JSON Schema document.
    pub schema: serde_json::Value,
}

/// Schema-constrained completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredCompletion {
    pub value: serde_json::Value,
    pub cost: Option<f64>,
}

/// One alternative token considered at a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopLogprob {
    pub token: String,
    pub logprob: f64,
}

/// A generated token with its log-probability and the top-K alternatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenLogprob {
    pub token: String,
    pub logprob: f64,
    #[serde(default)]
    pub top_logprobs: Vec<TopLogprob>,
}

/// Provider-native completion carrying per-token log-probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    /// Message content of the first choice.
    pub content: String,
    /// Generated tokens in order.
    #[serde(default)]
    pub tokens: Vec<TokenLogprob>,
    pub cost: Option<f64>,
}

impl RawResponse {
    /// First generated token whose text equals `token`.
    pub fn find_token(&self, token: &str) -> Option<&TokenLogprob> {
        self.tokens.iter().find(|t| t.token == token)
    }
}

// ---------------------------------------------------------------------------
// JudgeModel
// ---------------------------------------------------------------------------

/// Generative model used as a judge.
///
/// Guarantees expected from implementations:
/// - `capabilities()` is stable for the lifetime of the object.
/// - An operation advertised in `capabilities()` never answers with
///   `ModelError::Unsupported`.
/// - No retries: every call is a single provider request.
#[async_trait]
pub trait JudgeModel: Send + Sync {
    /// Model identifier, e.g. `"gpt-4.1-mini"`.
    fn model_name(&self) -> &str;

    /// Optional operations this model offers.
    fn capabilities(&self) -> Capabilities {
        Capabilities::text_only()
    }

    /// Generate free text from a prompt.
    async fn generate(&self, prompt: &str) -> ModelResult<Completion>;

    /// Generate a JSON value conforming to `schema`.
    async fn generate_with_schema(
        &self,
        prompt: &str,
        schema: &OutputSchema,
    ) -> ModelResult<StructuredCompletion> {
        let _ = (prompt, schema);
        Err(ModelError::Unsupported {
            capability: Capability::Schema,
        })
    }

    /// Generate a completion together with the `top_logprobs` most likely
    /// alternatives at every generated position.
    async fn generate_raw(&self, prompt: &str, top_logprobs: usize) -> ModelResult<RawResponse> {
        let _ = (prompt, top_logprobs);
        Err(ModelError::Unsupported {
            capability: Capability::Logprobs,
        })
    }
}
