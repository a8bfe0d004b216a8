//! Observability tests for the measurement lifecycle.
//!
//! These verify that structured tracing events are emitted for measurement
//! start, stage changes, generation fallbacks, finish and failure.

use std::sync::Arc;

use judge_model::fakes::{CallKind, Reply, ScriptedJudge};
use judge_model::Capabilities;
use jury_core::{
    emit_measurement_failed, emit_measurement_finished, emit_measurement_started, measurement_span,
    metrics::METRICS, CriterionMetric, Harness, HarnessConfig, JuryError, TestCase, TestCaseParam,
};
use serde_json::json;
use tracing_test::traced_test;
use uuid::Uuid;

#[test]
#[traced_test]
fn test_emit_measurement_started_logs_metric_and_model() {
    emit_measurement_started(Uuid::new_v4(), "Correctness [MEval]", "judge-1");
    assert!(logs_contain("measurement.started"));
    assert!(logs_contain("judge-1"));
}

#[test]
#[traced_test]
fn test_emit_measurement_finished_logs_score() {
    emit_measurement_finished(Uuid::new_v4(), 0.75, true, Some(0.01), 42);
    assert!(logs_contain("measurement.finished"));
    assert!(logs_contain("score=0.75"));
}

#[test]
#[traced_test]
fn test_emit_measurement_failed_logs_warning() {
    let error_msg = "judge unreachable";
    emit_measurement_failed(Uuid::new_v4(), "scoring", &error_msg);
    assert!(logs_contain("measurement.failed"));
    assert!(logs_contain("judge unreachable"));
}

#[test]
#[traced_test]
fn test_measurement_span_tags_events() {
    let id = Uuid::new_v4();
    let _entered = measurement_span(id, "Conversation Relevancy").entered();
    tracing::info!("inside measurement");
    assert!(logs_contain(&id.to_string()));
}

#[tokio::test]
#[traced_test]
async fn test_schema_fallback_is_logged_and_counted() {
    let judge = Arc::new(
        ScriptedJudge::new("judge")
            .with_capabilities(Capabilities::text_only().with_schema())
            .with_handler(|call| (call.kind == CallKind::Schema).then_some(Reply::Unsupported))
            .on(
                "concise evaluation steps",
                Reply::json(json!({"steps": ["Check it."]})),
            )
            .on(
                "You are an evaluator.",
                Reply::json(json!({"score": 5, "reason": "Half right."})),
            ),
    );
    let metric = CriterionMetric::builder("Correctness")
        .evaluation_params(vec![TestCaseParam::ActualOutput])
        .criteria("Correct.")
        .build()
        .expect("metric");
    let before = METRICS.schema_fallbacks();

    let result = Harness::new(judge, HarnessConfig::default().with_verbose_mode(true))
        .measure(&metric, &TestCase::new("q", "a"))
        .await
        .expect("measure");

    assert_eq!(result.score, 0.5);
    assert!(METRICS.schema_fallbacks() >= before + 2);
    assert!(logs_contain("judge.fallback"));
    assert!(logs_contain("measurement.finished"));
    assert!(logs_contain("Evaluation Steps:"));

    METRICS.flush();
    assert!(logs_contain("schema_fallbacks"));
}

#[tokio::test]
#[traced_test]
async fn test_failed_measurement_is_logged_and_counted() {
    let judge = Arc::new(
        ScriptedJudge::new("judge").on("concise evaluation steps", Reply::fail("quota exceeded")),
    );
    let metric = CriterionMetric::builder("Correctness")
        .evaluation_params(vec![TestCaseParam::ActualOutput])
        .criteria("Correct.")
        .build()
        .expect("metric");
    let before = METRICS.measurements_failed();

    let err = Harness::new(judge, HarnessConfig::default())
        .measure(&metric, &TestCase::new("q", "a"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("quota exceeded"));
    assert!(METRICS.measurements_failed() > before);
    assert!(logs_contain("measurement.failed"));
}

#[tokio::test]
#[traced_test]
async fn test_step_generation_failure_is_reported_in_steps_stage() {
    let judge = Arc::new(
        ScriptedJudge::new("judge").on("concise evaluation steps", Reply::fail("quota")),
    );
    let metric = CriterionMetric::builder("Correctness")
        .evaluation_params(vec![TestCaseParam::ActualOutput])
        .criteria("Correct.")
        .build()
        .expect("metric");

    let err = Harness::new(judge.clone(), HarnessConfig::default())
        .measure(&metric, &TestCase::new("q", "a"))
        .await
        .unwrap_err();

    assert_eq!(judge.call_count(), 1);
    match &err {
        JuryError::Measurement { stage, .. } => assert_eq!(stage, "steps_ready"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(logs_contain("stage=steps_ready error="));
    assert!(!logs_contain("stage=validating error="));
}

#[tokio::test]
#[traced_test]
async fn test_validation_failure_is_reported_before_any_judge_call() {
    let judge = Arc::new(ScriptedJudge::new("judge"));
    let metric = CriterionMetric::builder("Correctness")
        .evaluation_params(vec![TestCaseParam::ExpectedOutput])
        .criteria("Correct.")
        .build()
        .expect("metric");

    let err = Harness::new(judge.clone(), HarnessConfig::default())
        .measure(&metric, &TestCase::new("q", "a"))
        .await
        .unwrap_err();

    assert_eq!(judge.call_count(), 0);
    assert!(matches!(err.root(), JuryError::Validation(_)));
    assert!(logs_contain("stage=validating error="));
}
