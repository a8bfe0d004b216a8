//! Batch fan-out for independent judge calls.
//!
//! Every task in a batch is spawned on the Tokio runtime; results come
//! back in dispatch order. The join is all-or-nothing: the first failing
//! task aborts the rest and fails the whole batch.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::domain::{JuryError, Result};

/// How independent judge calls within one measurement are driven.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Await each call before issuing the next.
    Sequential,
    /// Dispatch all calls at once and join them.
    #[default]
    Concurrent,
}

/// Run `tasks` under `mode`, returning outputs in input order.
pub async fn run_batch<T, F>(mode: ExecutionMode, tasks: Vec<F>) -> Result<Vec<T>>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    match mode {
        ExecutionMode::Sequential => {
            let mut out = Vec::with_capacity(tasks.len());
            for task in tasks {
                out.push(task.await?);
            }
            Ok(out)
        }
        ExecutionMode::Concurrent => run_all_or_nothing(tasks).await,
    }
}

/// Spawn every task and wait for all of them.
///
/// Outputs keep the position of the task that produced them. On the first
/// error (or panicked task) the remaining tasks are aborted and the error
/// is returned; no partial output is produced.
pub async fn run_all_or_nothing<T, F>(tasks: Vec<F>) -> Result<Vec<T>>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    let count = tasks.len();
    let mut set = JoinSet::new();
    for (index, task) in tasks.into_iter().enumerate() {
        set.spawn(async move { (index, task.await) });
    }
    debug!(tasks = count, "dispatched judge batch");

    let mut slots: Vec<Option<T>> = (0..count).map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        let (index, outcome) = match joined {
            Ok(pair) => pair,
            Err(e) => {
                set.abort_all();
                warn!(error = %e, "judge batch task did not complete");
                return Err(JuryError::Batch {
                    detail: e.to_string(),
                });
            }
        };
        match outcome {
            Ok(value) => slots[index] = Some(value),
            Err(e) => {
                set.abort_all();
                warn!(task = index, error = %e, "judge batch aborted");
                return Err(e);
            }
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.ok_or_else(|| JuryError::Batch {
                detail: format!("task {index} produced no output"),
            })
        })
        .collect()
}
