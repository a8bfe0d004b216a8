//! In-memory fakes for the judge-model trait (testing only)
//!
//! Provides `ScriptedJudge`, a `JudgeModel` whose answers are scripted per
//! prompt and whose calls are recorded for later inspection. It honours its
//! declared capabilities exactly like a conforming backend would.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ModelError;
use crate::model_traits::*;

/// Which trait operation was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Text,
    Schema,
    Raw,
}

impl CallKind {
    fn capability(self) -> Option<Capability> {
        match self {
            CallKind::Text => None,
            CallKind::Schema => Some(Capability::Schema),
            CallKind::Raw => Some(Capability::Logprobs),
        }
    }
}

/// A call observed by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub prompt: String,
}

/// Scripted answer to a call.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Completion text. Schema calls parse it as JSON.
    Text(String),
    /// Completion with token log-probabilities.
    Raw {
        content: String,
        tokens: Vec<TokenLogprob>,
    },
    /// Answer with a capability mismatch for the invoked operation.
    /// Plain text calls have no capability to miss and get
    /// `ModelError::InvalidResponse` instead.
    Unsupported,
    /// Provider failure.
    Fail(String),
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }

    pub fn json(value: serde_json::Value) -> Self {
        Reply::Text(value.to_string())
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Reply::Fail(message.into())
    }

    /// Raw completion whose `score_token` position carries `alternatives`
    /// as `(token, probability)` pairs.
    pub fn raw_with_alternatives(
        content: impl Into<String>,
        score_token: &str,
        alternatives: &[(&str, f64)],
    ) -> Self {
        let top_logprobs: Vec<TopLogprob> = alternatives
            .iter()
            .map(|(token, p)| TopLogprob {
                token: (*token).to_string(),
                logprob: p.ln(),
            })
            .collect();
        let logprob = top_logprobs
            .iter()
            .find(|t| t.token == score_token)
            .map(|t| t.logprob)
            .unwrap_or(0.0);

        Reply::Raw {
            content: content.into(),
            tokens: vec![
                TokenLogprob {
                    token: "{\"".to_string(),
                    logprob: 0.0,
                    top_logprobs: vec![],
                },
                TokenLogprob {
                    token: score_token.to_string(),
                    logprob,
                    top_logprobs,
                },
            ],
        }
    }
}

type Handler = Arc<dyn Fn(&RecordedCall) -> Option<Reply> + Send + Sync>;

/// Judge model answering from a script.
///
/// Resolution order for a call: the handler (if any and it answers), then
/// the first `on(needle, ..)` rule whose needle occurs in the prompt. A call
/// nothing answers fails with `ModelError::Provider`.
pub struct ScriptedJudge {
    name: String,
    capabilities: Capabilities,
    rules: Vec<(String, Reply)>,
    handler: Option<Handler>,
    cost_per_call: Option<f64>,
    latency: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedJudge {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            capabilities: Capabilities::text_only(),
            rules: Vec::new(),
            handler: None,
            cost_per_call: None,
            latency: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Answer any prompt containing `needle` with `reply`.
    pub fn on(mut self, needle: &str, reply: Reply) -> Self {
        self.rules.push((needle.to_string(), reply));
        self
    }

    /// Answer calls from a closure; returning `None` defers to the rules.
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&RecordedCall) -> Option<Reply> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Report `cost` on every successful call.
    pub fn with_cost_per_call(mut self, cost: f64) -> Self {
        self.cost_per_call = Some(cost);
        self
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// All calls observed so far, in arrival order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls of the given kind.
    pub fn count(&self, kind: CallKind) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.kind == kind)
            .count()
    }

    /// Total number of calls.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Resolve a call into completion content and token log-probabilities.
    async fn answer(
        &self,
        kind: CallKind,
        prompt: &str,
    ) -> ModelResult<(String, Vec<TokenLogprob>)> {
        if let Some(capability) = kind.capability() {
            if !self.capabilities.supports(capability) {
                return Err(ModelError::Unsupported { capability });
            }
        }

        let call = RecordedCall {
            kind,
            prompt: prompt.to_string(),
        };
        self.calls.lock().unwrap().push(call.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let reply = self
            .handler
            .as_ref()
            .and_then(|h| h(&call))
            .or_else(|| {
                self.rules
                    .iter()
                    .find(|(needle, _)| prompt.contains(needle.as_str()))
                    .map(|(_, reply)| reply.clone())
            });

        match reply {
            Some(Reply::Fail(message)) => Err(ModelError::Provider(message)),
            Some(Reply::Unsupported) => Err(match kind.capability() {
                Some(capability) => ModelError::Unsupported { capability },
                None => ModelError::InvalidResponse(
                    "text completion cannot report a missing capability".to_string(),
                ),
            }),
            Some(Reply::Text(text)) => Ok((text, Vec::new())),
            Some(Reply::Raw { content, tokens }) => Ok((content, tokens)),
            None => Err(ModelError::Provider(format!(
                "no scripted reply for prompt: {}",
                prompt.chars().take(80).collect::<String>()
            ))),
        }
    }
}

#[async_trait]
impl JudgeModel for ScriptedJudge {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn generate(&self, prompt: &str) -> ModelResult<Completion> {
        let (text, _) = self.answer(CallKind::Text, prompt).await?;
        Ok(Completion {
            text,
            cost: self.cost_per_call,
        })
    }

    async fn generate_with_schema(
        &self,
        prompt: &str,
        schema: &OutputSchema,
    ) -> ModelResult<StructuredCompletion> {
        let (text, _) = self.answer(CallKind::Schema, prompt).await?;
        let value: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
            ModelError::InvalidResponse(format!("{} does not match schema: {}", schema.name, e))
        })?;
        Ok(StructuredCompletion {
            value,
            cost: self.cost_per_call,
        })
    }

    async fn generate_raw(&self, prompt: &str, _top_logprobs: usize) -> ModelResult<RawResponse> {
        let (content, tokens) = self.answer(CallKind::Raw, prompt).await?;
        Ok(RawResponse {
            content,
            tokens,
            cost: self.cost_per_call,
        })
    }
}
