//! Error types for judge-model

use thiserror::Error;

use crate::model_traits::Capability;

/// Errors that can occur while invoking a judge model
#[derive(Error, Debug)]
pub enum ModelError {
    /// The model does not offer the requested operation.
    ///
    /// This is a capability signal, not a data error: callers are expected
    /// to drop to their next generation tier when they see it.
    #[error("model does not support {capability}")]
    Unsupported { capability: Capability },

    /// The provider failed to produce a completion
    #[error("provider call failed: {0}")]
    Provider(String),

    /// The provider answered, but the payload was unusable
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    /// Serialization error
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ModelError {
    /// Whether this error only reports a missing capability.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, ModelError::Unsupported { .. })
    }
}
