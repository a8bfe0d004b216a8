//! Windowed verdict aggregation for conversations.
//!
//! A conversation of *n* turns is cut into *n* trailing windows, one ending
//! at every turn. Each window is judged on its own ("is the last assistant
//! message relevant here?") and the score is the share of windows whose
//! verdict is not an explicit "no".

use serde_json::json;
use tracing::debug;

use crate::domain::{ReasonOnly, Result, Turn, ValidationError, Verdict};
use crate::parallel::{run_batch, ExecutionMode};
use crate::structured::{Judged, StructuredGenerator};
use crate::templates;

/// Turns per window unless configured otherwise.
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// Display name of the conversation relevancy metric.
pub const METRIC_NAME: &str = "Conversation Relevancy";

/// Trailing windows over `turns`: window `i` is
/// `turns[max(0, i + 1 - window_size)..=i]`.
pub fn sliding_windows(
    turns: &[Turn],
    window_size: usize,
) -> std::result::Result<Vec<&[Turn]>, ValidationError> {
    if window_size == 0 {
        return Err(ValidationError::InvalidWindowSize);
    }
    Ok((0..turns.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window_size);
            &turns[start..=i]
        })
        .collect())
}

/// Share of verdicts that are not an explicit "no"; 1 for no verdicts.
pub fn relevancy_score(verdicts: &[Verdict]) -> f64 {
    if verdicts.is_empty() {
        return 1.0;
    }
    let relevant = verdicts.iter().filter(|v| v.is_relevant()).count();
    relevant as f64 / verdicts.len() as f64
}

/// Strict-mode clamp: anything short of `threshold` becomes 0.
pub fn apply_strict(score: f64, strict_mode: bool, threshold: f64) -> f64 {
    if strict_mode && score < threshold {
        0.0
    } else {
        score
    }
}

/// `{"message number", "reason"}` for every "no" verdict, 1-indexed.
pub fn irrelevancies(verdicts: &[Verdict]) -> Vec<serde_json::Value> {
    verdicts
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_relevant())
        .map(|(i, v)| {
            json!({
                "message number": i + 1,
                "reason": v.reason.clone().unwrap_or_default(),
            })
        })
        .collect()
}

/// Conversation relevancy metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRelevancy {
    window_size: usize,
}

impl Default for ConversationRelevancy {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl ConversationRelevancy {
    pub fn new(window_size: usize) -> Self {
        Self { window_size }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn name(&self) -> &'static str {
        METRIC_NAME
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.window_size == 0 {
            return Err(ValidationError::InvalidWindowSize);
        }
        Ok(())
    }

    /// Judge every window of `turns`, one verdict per window in window order.
    pub async fn judge_windows(
        &self,
        generator: &StructuredGenerator,
        turns: &[Turn],
        mode: ExecutionMode,
    ) -> Result<Vec<Judged<Verdict>>> {
        let windows = sliding_windows(turns, self.window_size)?;
        debug!(windows = windows.len(), ?mode, "judging conversation windows");

        let tasks: Vec<_> = windows
            .iter()
            .map(|window| {
                let prompt = templates::relevancy_verdict(window);
                let generator = generator.clone();
                async move { generator.generate::<Verdict>(&prompt).await }
            })
            .collect();

        run_batch(mode, tasks).await
    }

    /// One consolidated explanation for `score` given the verdicts.
    pub async fn explain(
        &self,
        generator: &StructuredGenerator,
        score: f64,
        verdicts: &[Verdict],
    ) -> Result<Judged<ReasonOnly>> {
        let prompt = templates::relevancy_reason(score, &irrelevancies(verdicts));
        generator.generate::<ReasonOnly>(&prompt).await
    }
}
