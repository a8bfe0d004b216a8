//! Harness configuration.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::parallel::ExecutionMode;

/// Settings shared by every measurement a [`crate::Harness`] runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Minimum score for a passing measurement.
    pub threshold: f64,
    /// Binary scoring; forces the threshold to 1.
    pub strict_mode: bool,
    pub execution_mode: ExecutionMode,
    /// Also emit the verbose trace through `tracing`.
    pub verbose_mode: bool,
    /// Ask the judge for an explanation of the score.
    pub include_reason: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            threshold: 0.5,
            strict_mode: false,
            execution_mode: ExecutionMode::Concurrent,
            verbose_mode: false,
            include_reason: true,
        }
    }
}

impl HarnessConfig {
    /// Defaults overridden by `JURY_THRESHOLD`, `JURY_STRICT_MODE`,
    /// `JURY_ASYNC_MODE` and `JURY_VERBOSE`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(threshold) = env_parse::<f64>("JURY_THRESHOLD") {
            config.threshold = threshold;
        }
        if let Some(strict) = env_flag("JURY_STRICT_MODE") {
            config.strict_mode = strict;
        }
        if let Some(concurrent) = env_flag("JURY_ASYNC_MODE") {
            config.execution_mode = if concurrent {
                ExecutionMode::Concurrent
            } else {
                ExecutionMode::Sequential
            };
        }
        if let Some(verbose) = env_flag("JURY_VERBOSE") {
            config.verbose_mode = verbose;
        }
        config
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }

    pub fn with_verbose_mode(mut self, verbose: bool) -> Self {
        self.verbose_mode = verbose;
        self
    }

    pub fn with_include_reason(mut self, include: bool) -> Self {
        self.include_reason = include;
        self
    }

    /// Threshold scores are compared against; always 1 in strict mode.
    pub fn effective_threshold(&self) -> f64 {
        if self.strict_mode {
            1.0
        } else {
            self.threshold
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key = %key, value = %raw, "ignoring unparseable config value");
            None
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!(key = %key, value = %raw, "ignoring unparseable config flag");
            None
        }
    }
}
