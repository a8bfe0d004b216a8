//! Measurement harness.
//!
//! [`Harness`] owns the judge model and the run configuration and drives
//! every measurement through the same lifecycle:
//!
//! ```text
//! Validating → StepsReady → Scoring → Reasoning → Done
//!      └────────────┴───────────┴──────────┴──→ Failed
//! ```
//!
//! Validation runs before any judge call, so an invalid test case costs
//! nothing. Costs returned by judge calls are summed per measurement; no
//! call is ever retried. Errors leave the harness wrapped in
//! [`JuryError::Measurement`]; [`JuryError::root`] gives the cause.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use judge_model::JudgeModel;
use tracing::{info, instrument, Instrument};
use uuid::Uuid;

use crate::config::HarnessConfig;
use crate::criterion::{CriterionMetric, StepCache};
use crate::domain::result::join_verbose_steps;
use crate::domain::{
    ConversationalTestCase, EvaluationResult, JuryError, Result, TestCase, Verdict,
};
use crate::metrics::METRICS;
use crate::obs;
use crate::relevancy::{apply_strict, relevancy_score, sliding_windows, ConversationRelevancy};
use crate::structured::StructuredGenerator;
use crate::templates;

/// Lifecycle stage of one measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementStage {
    Validating,
    StepsReady,
    Scoring,
    Reasoning,
    Done,
    Failed,
}

impl MeasurementStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::StepsReady => "steps_ready",
            Self::Scoring => "scoring",
            Self::Reasoning => "reasoning",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for MeasurementStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running cost of one measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostLedger {
    metered: bool,
    total: f64,
}

impl CostLedger {
    pub fn new(metered: bool) -> Self {
        Self {
            metered,
            total: 0.0,
        }
    }

    pub fn record(&mut self, cost: Option<f64>) {
        if let Some(cost) = cost {
            self.total += cost;
        }
    }

    /// Summed cost, or `None` when the judge is not metered.
    pub fn total(&self) -> Option<f64> {
        self.metered.then_some(self.total)
    }
}

/// Per-call bookkeeping: id, stage, cost and trace.
struct Measurement {
    id: Uuid,
    metric: String,
    stage: MeasurementStage,
    started: Instant,
    ledger: CostLedger,
    trace: Vec<String>,
}

impl Measurement {
    fn start(metric: String, model: &str, metered: bool) -> Self {
        let id = Uuid::new_v4();
        obs::emit_measurement_started(id, &metric, model);
        obs::emit_stage(id, MeasurementStage::Validating.as_str());
        Self {
            id,
            metric,
            stage: MeasurementStage::Validating,
            started: Instant::now(),
            ledger: CostLedger::new(metered),
            trace: Vec::new(),
        }
    }

    fn enter(&mut self, stage: MeasurementStage) {
        self.stage = stage;
        obs::emit_stage(self.id, stage.as_str());
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Runs measurements against one judge model.
#[derive(Debug, Clone)]
pub struct Harness {
    generator: StructuredGenerator,
    config: HarnessConfig,
}

impl Harness {
    pub fn new(model: Arc<dyn JudgeModel>, config: HarnessConfig) -> Self {
        Self {
            generator: StructuredGenerator::new(model),
            config,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    /// Score one test case.
    pub async fn measure(
        &self,
        metric: &CriterionMetric,
        case: &TestCase,
    ) -> Result<EvaluationResult> {
        self.measure_with_context(metric, case, None).await
    }

    /// Score one test case, giving the judge extra context to weigh.
    #[instrument(skip_all, fields(metric = %metric.display_name()))]
    pub async fn measure_with_context(
        &self,
        metric: &CriterionMetric,
        case: &TestCase,
        additional_context: Option<&str>,
    ) -> Result<EvaluationResult> {
        let mut m = Measurement::start(
            metric.display_name(),
            self.model_name(),
            self.generator.is_metered(),
        );
        let span = obs::measurement_span(m.id, &m.metric);
        let outcome = self
            .run_measure(&mut m, metric, case, additional_context)
            .instrument(span)
            .await;
        self.settle(&mut m, outcome)
    }

    async fn run_measure(
        &self,
        m: &mut Measurement,
        metric: &CriterionMetric,
        case: &TestCase,
        additional_context: Option<&str>,
    ) -> Result<EvaluationResult> {
        metric.validate_case(case)?;

        m.enter(MeasurementStage::StepsReady);
        let mut cache = StepCache::new();
        let resolved = cache.resolve(metric, &self.generator).await?;
        m.ledger.record(resolved.cost);

        m.enter(MeasurementStage::Scoring);
        let strict = self.config.strict_mode;
        let scored = metric
            .score(&self.generator, case, &resolved.steps, strict, additional_context)
            .await?;
        m.ledger.record(scored.cost);
        let score = metric.normalize(&scored, strict);

        m.enter(MeasurementStage::Reasoning);
        let reason = self.config.include_reason.then_some(scored.reason);

        let threshold = self.config.effective_threshold();
        m.trace = criterion_trace(
            metric,
            &resolved.steps,
            &format!("Score: {score}"),
            reason.as_deref(),
        );
        m.trace
            .push(format!("Evaluation Cost: {}", render_cost(m.ledger.total())));

        Ok(self.publish(m, score, score >= threshold, reason, None))
    }

    /// Pick the best of several candidates sharing one input.
    pub async fn compare(
        &self,
        metric: &CriterionMetric,
        cases: &[TestCase],
    ) -> Result<EvaluationResult> {
        self.compare_with_context(metric, cases, None).await
    }

    #[instrument(skip_all, fields(metric = %metric.display_name(), candidates = cases.len()))]
    pub async fn compare_with_context(
        &self,
        metric: &CriterionMetric,
        cases: &[TestCase],
        additional_context: Option<&str>,
    ) -> Result<EvaluationResult> {
        let mut m = Measurement::start(
            metric.display_name(),
            self.model_name(),
            self.generator.is_metered(),
        );
        let span = obs::measurement_span(m.id, &m.metric);
        let outcome = self
            .run_compare(&mut m, metric, cases, additional_context)
            .instrument(span)
            .await;
        self.settle(&mut m, outcome)
    }

    async fn run_compare(
        &self,
        m: &mut Measurement,
        metric: &CriterionMetric,
        cases: &[TestCase],
        additional_context: Option<&str>,
    ) -> Result<EvaluationResult> {
        metric.validate_candidates(cases)?;

        m.enter(MeasurementStage::StepsReady);
        let mut cache = StepCache::new();
        let resolved = cache.resolve(metric, &self.generator).await?;
        m.ledger.record(resolved.cost);

        m.enter(MeasurementStage::Scoring);
        let compared = metric
            .compare(&self.generator, cases, &resolved.steps, additional_context)
            .await?;
        m.ledger.record(compared.cost);

        m.enter(MeasurementStage::Reasoning);
        let reason = self.config.include_reason.then_some(compared.reason);

        let best = cases[compared.best_index].render_fields(metric.evaluation_params());
        m.trace = criterion_trace(
            metric,
            &resolved.steps,
            &format!("Best Test Case: {}\n{best}", compared.best_index),
            reason.as_deref(),
        );
        m.trace
            .push(format!("Evaluation Cost: {}", render_cost(m.ledger.total())));

        Ok(self.publish(m, 1.0, true, reason, Some(compared.best_index)))
    }

    /// Score a conversation with windowed relevancy verdicts.
    #[instrument(skip_all, fields(metric = %metric.name(), turns = convo.turns.len()))]
    pub async fn measure_conversation(
        &self,
        metric: &ConversationRelevancy,
        convo: &ConversationalTestCase,
    ) -> Result<EvaluationResult> {
        let mut m = Measurement::start(
            metric.name().to_string(),
            self.model_name(),
            self.generator.is_metered(),
        );
        let span = obs::measurement_span(m.id, &m.metric);
        let outcome = self
            .run_conversation(&mut m, metric, convo)
            .instrument(span)
            .await;
        self.settle(&mut m, outcome)
    }

    async fn run_conversation(
        &self,
        m: &mut Measurement,
        metric: &ConversationRelevancy,
        convo: &ConversationalTestCase,
    ) -> Result<EvaluationResult> {
        metric.validate()?;
        m.enter(MeasurementStage::StepsReady);

        m.enter(MeasurementStage::Scoring);
        let judged = metric
            .judge_windows(&self.generator, &convo.turns, self.config.execution_mode)
            .await?;
        let mut verdicts: Vec<Verdict> = Vec::with_capacity(judged.len());
        for j in judged {
            m.ledger.record(j.cost);
            verdicts.push(j.value);
        }
        let threshold = self.config.effective_threshold();
        let score = apply_strict(
            relevancy_score(&verdicts),
            self.config.strict_mode,
            threshold,
        );

        m.enter(MeasurementStage::Reasoning);
        let reason = if self.config.include_reason {
            let explained = metric.explain(&self.generator, score, &verdicts).await?;
            m.ledger.record(explained.cost);
            Some(explained.value.reason)
        } else {
            None
        };

        let windows: Vec<String> = sliding_windows(&convo.turns, metric.window_size())?
            .into_iter()
            .map(templates::render_window)
            .collect();
        m.trace = vec![
            format!(
                "Turns Sliding Windows (size={}):\n{}",
                metric.window_size(),
                windows.join("\n")
            ),
            format!(
                "Verdicts:\n{}",
                serde_json::to_string_pretty(&verdicts).unwrap_or_default()
            ),
            format!("Score: {score}\nReason: {}", render_reason(reason.as_deref())),
        ];

        Ok(self.publish(m, score, score >= threshold, reason, None))
    }

    /// Blocking form of [`measure`](Self::measure).
    ///
    /// Runs on a private current-thread runtime; fails with
    /// [`JuryError::Runtime`] when called from inside a Tokio runtime.
    pub fn measure_blocking(
        &self,
        metric: &CriterionMetric,
        case: &TestCase,
    ) -> Result<EvaluationResult> {
        block_on(self.measure(metric, case))?
    }

    /// Blocking form of [`compare`](Self::compare).
    pub fn compare_blocking(
        &self,
        metric: &CriterionMetric,
        cases: &[TestCase],
    ) -> Result<EvaluationResult> {
        block_on(self.compare(metric, cases))?
    }

    /// Blocking form of [`measure_conversation`](Self::measure_conversation).
    pub fn measure_conversation_blocking(
        &self,
        metric: &ConversationRelevancy,
        convo: &ConversationalTestCase,
    ) -> Result<EvaluationResult> {
        block_on(self.measure_conversation(metric, convo))?
    }

    /// Fold a measurement error into a failed result for `metric`.
    ///
    /// Errors returned by this harness keep the id of the measurement that
    /// failed, so the result matches its `measurement.failed` event.
    pub fn outcome(&self, metric: &str, result: Result<EvaluationResult>) -> EvaluationResult {
        match result {
            Ok(result) => result,
            Err(e) => EvaluationResult::failed(
                e.measurement_id().unwrap_or_else(Uuid::new_v4),
                metric,
                self.config.effective_threshold(),
                self.config.strict_mode,
                self.model_name(),
                e.root(),
            ),
        }
    }

    fn publish(
        &self,
        m: &mut Measurement,
        score: f64,
        success: bool,
        reason: Option<String>,
        best_candidate_index: Option<usize>,
    ) -> EvaluationResult {
        m.enter(MeasurementStage::Done);
        let verbose_logs = join_verbose_steps(&m.trace);
        if self.config.verbose_mode {
            info!(measurement_id = %m.id, metric = %m.metric, "\n{verbose_logs}");
        }
        EvaluationResult {
            measurement_id: m.id,
            metric: m.metric.clone(),
            score,
            success,
            threshold: self.config.effective_threshold(),
            strict_mode: self.config.strict_mode,
            reason,
            evaluation_cost: m.ledger.total(),
            evaluation_model: self.model_name().to_string(),
            verbose_logs,
            best_candidate_index,
            error: None,
            evaluated_at: Utc::now(),
        }
    }

    fn settle(
        &self,
        m: &mut Measurement,
        outcome: Result<EvaluationResult>,
    ) -> Result<EvaluationResult> {
        match outcome {
            Ok(result) => {
                obs::emit_measurement_finished(
                    m.id,
                    result.score,
                    result.success,
                    result.evaluation_cost,
                    m.elapsed_ms(),
                );
                Ok(result)
            }
            Err(e) => {
                let failed_in = m.stage;
                m.enter(MeasurementStage::Failed);
                METRICS.inc_measurements_failed();
                obs::emit_measurement_failed(m.id, failed_in.as_str(), &e);
                Err(JuryError::Measurement {
                    measurement_id: m.id,
                    stage: failed_in.to_string(),
                    source: Box::new(e),
                })
            }
        }
    }
}

fn block_on<F: Future>(future: F) -> Result<F::Output> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(JuryError::Runtime(
            "blocking measurement called from inside a Tokio runtime".to_string(),
        ));
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| JuryError::Runtime(e.to_string()))?;
    Ok(runtime.block_on(future))
}

fn criterion_trace(
    metric: &CriterionMetric,
    steps: &[String],
    verdict_line: &str,
    reason: Option<&str>,
) -> Vec<String> {
    vec![
        format!("Criteria:\n{}", metric.criteria().unwrap_or("None")),
        format!(
            "Evaluation Steps:\n{}",
            serde_json::to_string_pretty(steps).unwrap_or_default()
        ),
        format!(
            "Rubric:\n{}",
            metric
                .rubric()
                .map(|r| r.render())
                .unwrap_or_else(|| "None".to_string())
        ),
        verdict_line.to_string(),
        format!("Reason: {}", render_reason(reason)),
    ]
}

fn render_reason(reason: Option<&str>) -> &str {
    reason.unwrap_or("None")
}

fn render_cost(cost: Option<f64>) -> String {
    cost.map(|c| c.to_string())
        .unwrap_or_else(|| "None".to_string())
}
