//! Conversation relevancy measured end to end through the harness.

use std::sync::Arc;
use std::time::Duration;

use judge_model::fakes::{CallKind, Reply, ScriptedJudge};
use judge_model::Capabilities;
use jury_core::{
    ConversationRelevancy, ConversationalTestCase, ExecutionMode, Harness, HarnessConfig,
    JuryError, Turn, ValidationError,
};
use serde_json::json;

const VERDICT_NEEDLE: &str = "LAST `assistant` message";
const REASON_NEEDLE: &str = "Irrelevancies:";

/// Four turns; the second assistant reply wanders off topic.
fn conversation() -> ConversationalTestCase {
    ConversationalTestCase::new(vec![
        Turn::user("How do I reset my router?"),
        Turn::assistant("Hold the reset button for ten seconds."),
        Turn::user("And then?"),
        Turn::assistant("Bananas are an excellent source of potassium."),
    ])
}

/// Judges a window "no" when its last message mentions bananas.
fn relevancy_judge() -> ScriptedJudge {
    ScriptedJudge::new("judge")
        .with_handler(|call| {
            if !call.prompt.contains(VERDICT_NEEDLE) {
                return None;
            }
            let last_turn = call.prompt.rsplit("\"content\"").next().unwrap_or_default();
            if last_turn.contains("Bananas") {
                Some(Reply::json(json!({"verdict": "no", "reason": "talks about fruit"})))
            } else {
                Some(Reply::json(json!({"verdict": "yes"})))
            }
        })
        .on(
            REASON_NEEDLE,
            Reply::json(json!({"reason": "The score is 0.75 because message 4 is off topic."})),
        )
}

#[tokio::test]
async fn one_verdict_per_turn_and_share_of_relevant_windows() {
    let judge = Arc::new(relevancy_judge());
    let harness = Harness::new(judge.clone(), HarnessConfig::default());

    let result = harness
        .measure_conversation(&ConversationRelevancy::new(3), &conversation())
        .await
        .expect("measurement");

    assert_eq!(judge.count(CallKind::Text), 5, "4 windows + 1 reason");
    assert_eq!(result.score, 0.75);
    assert!(result.success);
    assert_eq!(result.metric, "Conversation Relevancy");
    assert_eq!(
        result.reason.as_deref(),
        Some("The score is 0.75 because message 4 is off topic.")
    );
    assert_eq!(result.evaluation_cost, None);
}

#[tokio::test]
async fn reason_prompt_lists_irrelevant_message_numbers() {
    let judge = Arc::new(relevancy_judge());
    let harness = Harness::new(judge.clone(), HarnessConfig::default());
    harness
        .measure_conversation(&ConversationRelevancy::default(), &conversation())
        .await
        .expect("measurement");

    let reason_call = judge
        .calls()
        .into_iter()
        .find(|c| c.prompt.contains(REASON_NEEDLE))
        .expect("reason call");
    assert!(reason_call.prompt.contains("\"message number\": 4"));
    assert!(reason_call.prompt.contains("talks about fruit"));
}

#[tokio::test]
async fn verbose_trace_lists_windows_verdicts_and_score() {
    let harness = Harness::new(Arc::new(relevancy_judge()), HarnessConfig::default());
    let result = harness
        .measure_conversation(&ConversationRelevancy::new(3), &conversation())
        .await
        .expect("measurement");

    let blocks: Vec<&str> = result.verbose_logs.split("\n\n").collect();
    assert_eq!(blocks.len(), 3, "windows, verdicts, score and reason");

    assert!(blocks[0].starts_with("Turns Sliding Windows (size=3):\n"));
    assert_eq!(blocks[0].matches("How do I reset my router?").count(), 3);
    assert_eq!(
        blocks[0].matches("Bananas are an excellent source of potassium.").count(),
        1
    );

    assert!(blocks[1].starts_with("Verdicts:\n"));
    assert_eq!(blocks[1].matches("\"verdict\": \"yes\"").count(), 3);
    assert_eq!(blocks[1].matches("\"verdict\": \"no\"").count(), 1);
    assert!(blocks[1].contains("talks about fruit"));

    assert_eq!(
        blocks[2],
        "Score: 0.75\nReason: The score is 0.75 because message 4 is off topic."
    );
}

#[tokio::test]
async fn verbose_trace_without_reason_says_none() {
    let harness = Harness::new(
        Arc::new(relevancy_judge()),
        HarnessConfig::default().with_include_reason(false),
    );
    let result = harness
        .measure_conversation(&ConversationRelevancy::default(), &conversation())
        .await
        .expect("measurement");

    assert!(result.verbose_logs.contains("Turns Sliding Windows (size=10):"));
    assert!(result.verbose_logs.ends_with("Score: 0.75\nReason: None"));
}

#[tokio::test]
async fn sequential_and_concurrent_modes_agree() {
    let mut scores = Vec::new();
    for mode in [ExecutionMode::Sequential, ExecutionMode::Concurrent] {
        let judge = Arc::new(relevancy_judge().with_latency(Duration::from_millis(5)));
        let harness = Harness::new(
            judge,
            HarnessConfig::default()
                .with_execution_mode(mode)
                .with_include_reason(false),
        );
        let result = harness
            .measure_conversation(&ConversationRelevancy::new(2), &conversation())
            .await
            .expect("measurement");
        assert_eq!(result.reason, None);
        scores.push(result.score);
    }
    assert_eq!(scores, vec![0.75, 0.75]);
}

#[tokio::test]
async fn strict_mode_clamps_partial_relevancy_to_zero() {
    let harness = Harness::new(
        Arc::new(relevancy_judge()),
        HarnessConfig::default().with_strict_mode(true),
    );
    let result = harness
        .measure_conversation(&ConversationRelevancy::default(), &conversation())
        .await
        .expect("measurement");

    assert_eq!(result.score, 0.0);
    assert!(!result.success);
    assert_eq!(result.threshold, 1.0);
    assert!(result.strict_mode);
}

#[tokio::test]
async fn empty_conversation_is_fully_relevant() {
    let judge = Arc::new(relevancy_judge());
    let harness = Harness::new(judge.clone(), HarnessConfig::default());
    let result = harness
        .measure_conversation(
            &ConversationRelevancy::default(),
            &ConversationalTestCase::default(),
        )
        .await
        .expect("measurement");

    assert_eq!(result.score, 1.0);
    assert!(result.success);
    assert_eq!(judge.count(CallKind::Text), 1, "only the reason call");
}

#[tokio::test]
async fn one_failing_window_fails_the_whole_measurement() {
    let judge = Arc::new(
        ScriptedJudge::new("judge").with_handler(|call| {
            if call.prompt.contains("And then?") && !call.prompt.contains("Bananas") {
                Some(Reply::fail("upstream timeout"))
            } else {
                Some(Reply::json(json!({"verdict": "yes"})))
            }
        }),
    );
    let harness = Harness::new(judge, HarnessConfig::default());

    let err = harness
        .measure_conversation(&ConversationRelevancy::new(4), &conversation())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("upstream timeout"));

    let measurement_id = err.measurement_id().expect("harness errors carry the id");
    let failed = harness.outcome("Conversation Relevancy", Err(err));
    assert!(!failed.success);
    assert_eq!(failed.score, 0.0);
    assert_eq!(failed.measurement_id, measurement_id);
    let error = failed.error.expect("error message");
    assert!(error.contains("upstream timeout"));
    assert!(!error.contains(&measurement_id.to_string()));
}

#[tokio::test]
async fn zero_window_size_fails_before_any_judge_call() {
    let judge = Arc::new(relevancy_judge());
    let harness = Harness::new(judge.clone(), HarnessConfig::default());

    let err = harness
        .measure_conversation(&ConversationRelevancy::new(0), &conversation())
        .await
        .unwrap_err();

    assert!(matches!(
        err.root(),
        JuryError::Validation(ValidationError::InvalidWindowSize)
    ));
    assert_eq!(judge.call_count(), 0);
}

#[tokio::test]
async fn metered_judge_sums_every_call() {
    let judge = Arc::new(
        relevancy_judge()
            .with_capabilities(Capabilities::text_only().metered())
            .with_cost_per_call(0.01),
    );
    let harness = Harness::new(judge, HarnessConfig::default());
    let result = harness
        .measure_conversation(&ConversationRelevancy::default(), &conversation())
        .await
        .expect("measurement");

    let cost = result.evaluation_cost.expect("metered cost");
    assert!((cost - 0.05).abs() < 1e-9, "4 windows + 1 reason, got {cost}");
}

#[test]
fn blocking_entry_point_runs_outside_a_runtime() {
    let harness = Harness::new(
        Arc::new(relevancy_judge()),
        HarnessConfig::default().with_execution_mode(ExecutionMode::Concurrent),
    );
    let result = harness
        .measure_conversation_blocking(&ConversationRelevancy::default(), &conversation())
        .expect("measurement");
    assert_eq!(result.score, 0.75);
}
