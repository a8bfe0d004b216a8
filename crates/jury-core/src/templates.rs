//! Prompt templates.
//!
//! Pure functions from evaluation parameters to prompt text. Each prompt
//! ends with the JSON shape the judge is expected to answer with, so the
//! free-text path can still be parsed locally.

use serde_json::json;

use crate::domain::Turn;

/// Number evaluation steps, one per line: `"1. step\n2. step\n"`.
pub fn number_evaluation_steps(steps: &[String]) -> String {
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {}\n", i + 1, step))
        .collect()
}

/// Number candidate blocks for a comparison prompt, starting at 0 so the
/// judge's answer is the candidate's offset.
pub fn number_test_case_contents(contents: &[String]) -> String {
    contents
        .iter()
        .enumerate()
        .map(|(i, content)| format!("Test Case {i}:\n{content}\n"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn additional_context_block(additional_context: Option<&str>) -> String {
    match additional_context {
        Some(ctx) if !ctx.trim().is_empty() => format!("\nAdditional Context:\n{ctx}\n"),
        _ => String::new(),
    }
}

fn rubric_block(rubric: Option<&str>) -> String {
    match rubric {
        Some(r) => format!("\nRubric:\n{r}\n"),
        None => String::new(),
    }
}

/// Render a window of turns as a JSON list of `{"role", "content"}` objects.
pub fn render_window(window: &[Turn]) -> String {
    let turns: Vec<serde_json::Value> = window
        .iter()
        .map(|t| json!({"role": t.role, "content": t.content}))
        .collect();
    serde_json::to_string_pretty(&turns).unwrap_or_default()
}

/// Ask whether the last assistant message in a window is relevant.
pub fn relevancy_verdict(window: &[Turn]) -> String {
    format!(
        r#"Based on the given list of message exchanges between a user and an LLM, determine whether the LAST `assistant` message is relevant to the context of the conversation.
Answer with a JSON object containing a 'verdict' key that is strictly either 'yes' or 'no', and a 'reason' key.
Only provide a 'reason' when the verdict is 'no', quoting the irrelevant statement and explaining why it does not fit the conversation.

Example:
{{
    "verdict": "no",
    "reason": "The user asked about the weather but the assistant talked about stock prices."
}}

**
IMPORTANT: Only return a JSON object. Consider the whole window when judging relevance, not only the last user message.
**

Message exchanges:
{window}

JSON:
"#,
        window = render_window(window)
    )
}

/// Ask for one consolidated explanation of a relevancy score.
pub fn relevancy_reason(score: f64, irrelevancies: &[serde_json::Value]) -> String {
    let listing = serde_json::to_string_pretty(irrelevancies).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"Below is a list of irrelevancies drawn from message exchanges between a user and an LLM, each pointing to the message number of an irrelevant `assistant` message, together with the conversation relevancy score.
Give a concise reason for the score. Refer to message numbers and quote the irrelevant content where it helps.
If the list is empty, explain that every assistant message was relevant to the conversation.

**
IMPORTANT: Only return a JSON object with a 'reason' key.
Example:
{{
    "reason": "The score is <relevancy_score> because <your_reason>."
}}
**

Relevancy Score:
{score}

Irrelevancies:
{listing}

JSON:
"#
    )
}

/// Ask the judge to turn a criterion into evaluation steps.
pub fn evaluation_steps(criteria: &str, parameters: &str) -> String {
    format!(
        r#"Given an evaluation criteria which outlines how you should judge the {parameters}, generate 3-4 concise evaluation steps based on the criteria below. You MUST make it clear how to evaluate {parameters} in relation to one another.

Evaluation Criteria:
{criteria}

**
IMPORTANT: Please make sure to only return in JSON format, with the "steps" key as a list of strings. No words or explanation is needed.
Example JSON:
{{
    "steps": <list_of_strings>
}}
**

JSON:
"#
    )
}

/// Ask for a score on the rubric's range with a reason.
pub fn evaluation_results(
    evaluation_steps: &str,
    test_case_content: &str,
    parameters: &str,
    rubric: Option<&str>,
    score_range: (u8, u8),
    additional_context: Option<&str>,
) -> String {
    let (low, high) = score_range;
    format!(
        r#"You are an evaluator. Given the following evaluation steps, assess the response below and return a JSON object with two fields:

- `"score"`: an integer between {low} and {high}, with {high} indicating strong alignment with the evaluation steps and {low} indicating no alignment.
- `"reason"`: a brief explanation for why the score was given. It must mention specific strengths or shortcomings, referencing relevant details from the input. Do **not** quote the score itself in the explanation.

Your explanation should:
- Be specific and grounded in the evaluation steps.
- Mention key details from the test case parameters.
- Be concise, clear, and focused on the evaluation logic.

Only return valid JSON. Do **not** include any extra commentary or text.

---

Evaluation Steps:
{evaluation_steps}
{rubric}
Test Case:
{test_case_content}

Parameters:
{parameters}
{additional}
---
**Example JSON:**
{{
    "score": {low},
    "reason": "your concise and informative reason here"
}}

JSON:
"#,
        rubric = rubric_block(rubric),
        additional = additional_context_block(additional_context),
    )
}

/// Binary variant of [`evaluation_results`]: the score is 1 or 0.
pub fn strict_evaluation_results(
    evaluation_steps: &str,
    test_case_content: &str,
    parameters: &str,
    additional_context: Option<&str>,
) -> String {
    format!(
        r#"Given the evaluation steps, return a JSON with two keys: 1) a `score` key that is STRICTLY EITHER 1 (follows the criteria 100% outlined in the evaluation steps), OR 0 (does not follow the criteria), and 2) a `reason` key, a reason for the given score, but DO NOT QUOTE THE SCORE in your reason. Please mention specific information from {parameters} in your reason, but be very concise with it!

Evaluation Steps:
{evaluation_steps}

{test_case_content}
{additional}
**
IMPORTANT: Please make sure to only return in JSON format, with the "score" and "reason" key. No words or explanation is needed.

Example JSON:
{{
    "score": 0,
    "reason": "The text does not follow the evaluation steps provided."
}}
**

JSON:
"#,
        additional = additional_context_block(additional_context),
    )
}

/// Ask the judge to pick the best of several numbered candidates.
pub fn comparable_evaluation_results(
    evaluation_steps: &str,
    test_case_contents: &str,
    parameters: &str,
    rubric: Option<&str>,
    additional_context: Option<&str>,
) -> String {
    format!(
        r#"Given the evaluation steps, compare the numbered test cases below and determine which one best satisfies them. Return a JSON object with two keys: 1) `best_test_case_index`, the number of the best test case, and 2) `reason`, a concise explanation referencing the {parameters} of the chosen test case and how it compares to the others.

Evaluation Steps:
{evaluation_steps}
{rubric}
Test Cases:
{test_case_contents}
{additional}
**
IMPORTANT: Please make sure to only return in JSON format, with the "best_test_case_index" and "reason" key. No words or explanation is needed.

Example JSON:
{{
    "best_test_case_index": 0,
    "reason": "Test Case 0 answers the input directly while the others drift off topic."
}}
**

JSON:
"#,
        rubric = rubric_block(rubric),
        additional = additional_context_block(additional_context),
    )
}
