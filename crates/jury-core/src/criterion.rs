//! Rubric/criterion evaluation.
//!
//! A [`CriterionMetric`] scores a test case against a free-text criterion
//! (or caller-supplied evaluation steps), optionally narrowed by a rubric.
//! It also runs N-way comparisons that pick the best of several candidates
//! sharing the same input.
//!
//! When the judge exposes token log-probabilities the declared integer score
//! is refined into a probability-weighted mean over the numeric alternatives
//! the model considered at the score position.

use judge_model::RawResponse;
use tracing::debug;

use crate::domain::rubric::{score_range, MAX_SCORE};
use crate::domain::test_case::params_phrase;
use crate::domain::{
    ComparisonResult, EvaluationSteps, JuryError, Result, ResultShape, Rubric, RubricEntry,
    ScoreReason, TestCase, TestCaseParam, ValidationError,
};
use crate::metrics::METRICS;
use crate::structured::{parse_judge_json, GenerationPath, StructuredGenerator};
use crate::templates;

/// Appended to the metric's display name unless disabled.
pub const MEVAL_SUFFIX: &str = " [MEval]";

/// Alternatives requested per token on the log-probability path.
pub const DEFAULT_TOP_LOGPROBS: usize = 20;

/// Alternatives less likely than this are ignored when weighting a score.
const MIN_ALTERNATIVE_PROB: f64 = 0.01;

/// Criterion-based metric scoring one test case or comparing several.
#[derive(Debug, Clone)]
pub struct CriterionMetric {
    name: String,
    evaluation_params: Vec<TestCaseParam>,
    criteria: Option<String>,
    evaluation_steps: Option<Vec<String>>,
    rubric: Option<Rubric>,
    top_logprobs: usize,
    include_suffix: bool,
}

/// Builder for [`CriterionMetric`]; all checks run in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct CriterionMetricBuilder {
    name: String,
    evaluation_params: Vec<TestCaseParam>,
    criteria: Option<String>,
    evaluation_steps: Option<Vec<String>>,
    rubric: Vec<RubricEntry>,
    top_logprobs: usize,
    include_suffix: bool,
}

impl CriterionMetricBuilder {
    pub fn evaluation_params(mut self, params: Vec<TestCaseParam>) -> Self {
        self.evaluation_params = params;
        self
    }

    pub fn criteria(mut self, criteria: impl Into<String>) -> Self {
        self.criteria = Some(criteria.into());
        self
    }

    pub fn evaluation_steps(mut self, steps: Vec<String>) -> Self {
        self.evaluation_steps = Some(steps);
        self
    }

    /// An empty list means no rubric.
    pub fn rubric(mut self, entries: Vec<RubricEntry>) -> Self {
        self.rubric = entries;
        self
    }

    pub fn top_logprobs(mut self, top_logprobs: usize) -> Self {
        self.top_logprobs = top_logprobs;
        self
    }

    /// Report the bare name, without the `" [MEval]"` suffix.
    pub fn without_suffix(mut self) -> Self {
        self.include_suffix = false;
        self
    }

    pub fn build(self) -> std::result::Result<CriterionMetric, ValidationError> {
        if self.evaluation_params.is_empty() {
            return Err(ValidationError::EmptyEvaluationParams);
        }
        if let Some(steps) = &self.evaluation_steps {
            if steps.is_empty() {
                return Err(ValidationError::EmptyEvaluationSteps);
            }
        }
        let criteria = self.criteria.filter(|c| !c.trim().is_empty());
        if criteria.is_none() && self.evaluation_steps.is_none() {
            return Err(ValidationError::MissingCriteria);
        }
        let rubric = if self.rubric.is_empty() {
            None
        } else {
            Some(Rubric::new(self.rubric)?)
        };

        Ok(CriterionMetric {
            name: self.name,
            evaluation_params: self.evaluation_params,
            criteria,
            evaluation_steps: self.evaluation_steps,
            rubric,
            top_logprobs: self.top_logprobs,
            include_suffix: self.include_suffix,
        })
    }
}

/// Single-candidate score as returned by the judge.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    /// Integer score the judge declared.
    pub raw_score: f64,
    /// Probability-weighted score, when refinement succeeded.
    pub weighted_score: Option<f64>,
    pub reason: String,
    pub cost: Option<f64>,
    pub path: GenerationPath,
}

impl Scored {
    pub fn refined_or_raw(&self) -> f64 {
        self.weighted_score.unwrap_or(self.raw_score)
    }
}

/// Outcome of an N-way comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Compared {
    /// Offset into the compared candidates, always in range.
    pub best_index: usize,
    pub reason: String,
    pub cost: Option<f64>,
}

impl CriterionMetric {
    pub fn builder(name: impl Into<String>) -> CriterionMetricBuilder {
        CriterionMetricBuilder {
            name: name.into(),
            evaluation_params: Vec::new(),
            criteria: None,
            evaluation_steps: None,
            rubric: Vec::new(),
            top_logprobs: DEFAULT_TOP_LOGPROBS,
            include_suffix: true,
        }
    }

    /// Name shown in results and logs.
    pub fn display_name(&self) -> String {
        if self.include_suffix {
            format!("{}{}", self.name, MEVAL_SUFFIX)
        } else {
            self.name.clone()
        }
    }

    pub fn evaluation_params(&self) -> &[TestCaseParam] {
        &self.evaluation_params
    }

    pub fn criteria(&self) -> Option<&str> {
        self.criteria.as_deref()
    }

    pub fn evaluation_steps(&self) -> Option<&[String]> {
        self.evaluation_steps.as_deref()
    }

    pub fn rubric(&self) -> Option<&Rubric> {
        self.rubric.as_ref()
    }

    pub fn top_logprobs(&self) -> usize {
        self.top_logprobs
    }

    /// Declared params as an English list, e.g. `"Input and Actual Output"`.
    pub fn parameters(&self) -> String {
        params_phrase(&self.evaluation_params)
    }

    /// Every declared param must be present and non-empty on `case`.
    pub fn validate_case(&self, case: &TestCase) -> std::result::Result<(), ValidationError> {
        match case.missing_params(&self.evaluation_params).first() {
            Some(param) => Err(ValidationError::MissingParam {
                param: param.label().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// At least two candidates, each valid, all sharing one input.
    pub fn validate_candidates(
        &self,
        cases: &[TestCase],
    ) -> std::result::Result<(), ValidationError> {
        if cases.len() < 2 {
            return Err(ValidationError::TooFewCandidates { found: cases.len() });
        }
        for case in cases {
            self.validate_case(case)?;
        }
        let input = &cases[0].input;
        if cases.iter().any(|c| &c.input != input) {
            return Err(ValidationError::MismatchedInputs);
        }
        Ok(())
    }

    /// Score one test case against resolved `steps`.
    ///
    /// Takes the log-probability path when the judge offers it (weighting
    /// the score unless `strict_mode`), otherwise asks for a
    /// [`ScoreReason`] through the structured adapter.
    pub async fn score(
        &self,
        generator: &StructuredGenerator,
        case: &TestCase,
        steps: &[String],
        strict_mode: bool,
        additional_context: Option<&str>,
    ) -> Result<Scored> {
        let numbered = templates::number_evaluation_steps(steps);
        let content = case.render_fields(&self.evaluation_params);
        let parameters = self.parameters();
        let prompt = if strict_mode {
            templates::strict_evaluation_results(
                &numbered,
                &content,
                &parameters,
                additional_context,
            )
        } else {
            let rubric = self.rubric.as_ref().map(Rubric::render);
            templates::evaluation_results(
                &numbered,
                &content,
                &parameters,
                rubric.as_deref(),
                score_range(self.rubric.as_ref()),
                additional_context,
            )
        };

        if let Some(raw) = generator.generate_raw(&prompt, self.top_logprobs).await? {
            let parsed: ScoreReason = parse_judge_json(&raw.content)?;
            let weighted_score = if strict_mode {
                None
            } else {
                weighted_score(parsed.score, &raw)
            };
            if weighted_score.is_some() {
                METRICS.inc_logprob_refinements();
            }
            debug!(raw_score = parsed.score, ?weighted_score, "scored from raw response");
            return Ok(Scored {
                raw_score: parsed.score,
                weighted_score,
                reason: parsed.reason,
                cost: raw.cost,
                path: GenerationPath::Raw,
            });
        }

        let judged = generator.generate::<ScoreReason>(&prompt).await?;
        Ok(Scored {
            raw_score: judged.value.score,
            weighted_score: None,
            reason: judged.value.reason,
            cost: judged.cost,
            path: judged.path,
        })
    }

    /// Final score in `[0, 1]`; strict mode yields exactly 0 or 1.
    pub fn normalize(&self, scored: &Scored, strict_mode: bool) -> f64 {
        if strict_mode {
            if scored.raw_score >= 1.0 {
                1.0
            } else {
                0.0
            }
        } else {
            (scored.refined_or_raw() / f64::from(MAX_SCORE)).clamp(0.0, 1.0)
        }
    }

    /// Ask the judge which of `cases` best satisfies `steps`.
    pub async fn compare(
        &self,
        generator: &StructuredGenerator,
        cases: &[TestCase],
        steps: &[String],
        additional_context: Option<&str>,
    ) -> Result<Compared> {
        let contents: Vec<String> = cases
            .iter()
            .map(|c| c.render_fields(&self.evaluation_params))
            .collect();
        let rubric = self.rubric.as_ref().map(Rubric::render);
        let prompt = templates::comparable_evaluation_results(
            &templates::number_evaluation_steps(steps),
            &templates::number_test_case_contents(&contents),
            &self.parameters(),
            rubric.as_deref(),
            additional_context,
        );

        let judged = generator.generate::<ComparisonResult>(&prompt).await?;
        let index = judged.value.best_test_case_index;
        if index >= cases.len() {
            return Err(JuryError::CandidateIndex {
                index,
                count: cases.len(),
            });
        }
        Ok(Compared {
            best_index: index,
            reason: judged.value.reason,
            cost: judged.cost,
        })
    }
}

/// Evaluation steps resolved for one measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSteps {
    pub steps: Vec<String>,
    /// Cost of generating the steps; `None` when nothing was generated.
    pub cost: Option<f64>,
    pub generated: bool,
}

/// Per-measurement memo of evaluation steps.
///
/// Steps are generated from the criteria at most once per cache; later
/// resolutions return the stored steps without calling the judge.
#[derive(Debug, Default)]
pub struct StepCache {
    steps: Option<Vec<String>>,
}

impl StepCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn resolve(
        &mut self,
        metric: &CriterionMetric,
        generator: &StructuredGenerator,
    ) -> Result<ResolvedSteps> {
        if let Some(steps) = metric.evaluation_steps() {
            return Ok(ResolvedSteps {
                steps: steps.to_vec(),
                cost: None,
                generated: false,
            });
        }
        if let Some(steps) = &self.steps {
            return Ok(ResolvedSteps {
                steps: steps.clone(),
                cost: None,
                generated: false,
            });
        }

        let criteria = metric.criteria().ok_or(ValidationError::MissingCriteria)?;
        let prompt = templates::evaluation_steps(criteria, &metric.parameters());
        let judged = generator.generate::<EvaluationSteps>(&prompt).await?;
        if judged.value.steps.is_empty() {
            return Err(JuryError::Parse {
                shape: ResultShape::EvaluationSteps.to_string(),
                detail: "judge returned no evaluation steps".to_string(),
            });
        }
        debug!(steps = judged.value.steps.len(), "generated evaluation steps");
        self.steps = Some(judged.value.steps.clone());
        Ok(ResolvedSteps {
            steps: judged.value.steps,
            cost: judged.cost,
            generated: true,
        })
    }
}

/// Probability-weighted mean of the numeric alternatives at the position of
/// the declared score.
///
/// Finds the first generated token equal to `raw_score` written as an
/// integer, keeps its alternatives that are all decimal digits and at least
/// 1% likely, and returns `Σ value·p / Σ p`. Returns `None` when any of
/// that is impossible; callers fall back to the raw score.
pub fn weighted_score(raw_score: f64, raw: &RawResponse) -> Option<f64> {
    if raw_score < 0.0 || raw_score.fract() != 0.0 {
        return None;
    }
    let position = raw.find_token(&format!("{}", raw_score as u64))?;
    let min_logprob = MIN_ALTERNATIVE_PROB.ln();

    let mut weighted = 0.0;
    let mut mass = 0.0;
    for alt in &position.top_logprobs {
        if alt.logprob < min_logprob {
            continue;
        }
        if alt.token.is_empty() || !alt.token.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let Ok(value) = alt.token.parse::<u32>() else {
            continue;
        };
        let p = alt.logprob.exp();
        weighted += f64::from(value) * p;
        mass += p;
    }

    if mass > 0.0 {
        Some(weighted / mass)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use judge_model::{TokenLogprob, TopLogprob};

    fn raw(score_token: &str, alternatives: &[(&str, f64)]) -> RawResponse {
        RawResponse {
            content: String::new(),
            tokens: vec![
                TokenLogprob {
                    token: "score".to_string(),
                    logprob: 0.0,
                    top_logprobs: vec![],
                },
                TokenLogprob {
                    token: score_token.to_string(),
                    logprob: -0.1,
                    top_logprobs: alternatives
                        .iter()
                        .map(|(t, p)| TopLogprob {
                            token: (*t).to_string(),
                            logprob: p.ln(),
                        })
                        .collect(),
                },
            ],
            cost: None,
        }
    }

    fn metric() -> CriterionMetricBuilder {
        CriterionMetric::builder("Correctness").evaluation_params(vec![
            TestCaseParam::Input,
            TestCaseParam::ActualOutput,
        ])
    }

    #[test]
    fn test_weighted_score_known_distribution() {
        let r = raw("8", &[("8", 0.6), ("7", 0.3), ("9", 0.1)]);
        let w = weighted_score(8.0, &r).expect("weighted");
        assert!((w - 7.8).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_score_ignores_non_numeric_and_unlikely() {
        let r = raw(
            "8",
            &[("8", 0.6), ("7", 0.3), ("eight", 0.05), (" 8", 0.04), ("2", 0.005)],
        );
        let w = weighted_score(8.0, &r).expect("weighted");
        assert!((w - (8.0 * 0.6 + 7.0 * 0.3) / 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_score_falls_back_when_token_missing() {
        let r = raw("7", &[("7", 0.9)]);
        assert_eq!(weighted_score(8.0, &r), None);
    }

    #[test]
    fn test_weighted_score_falls_back_without_numeric_mass() {
        let r = raw("8", &[("eight", 0.9), ("ate", 0.1)]);
        assert_eq!(weighted_score(8.0, &r), None);
        assert_eq!(weighted_score(7.5, &raw("7.5", &[("7", 0.9)])), None);
    }

    #[test]
    fn test_builder_requires_criteria_or_steps() {
        let err = metric().build().unwrap_err();
        assert!(matches!(err, ValidationError::MissingCriteria));

        let err = metric().criteria("   ").build().unwrap_err();
        assert!(matches!(err, ValidationError::MissingCriteria));
    }

    #[test]
    fn test_builder_rejects_empty_steps_and_params() {
        let err = metric().evaluation_steps(vec![]).build().unwrap_err();
        assert!(matches!(err, ValidationError::EmptyEvaluationSteps));

        let err = CriterionMetric::builder("x")
            .criteria("be right")
            .build()
            .unwrap_err();
        assert!(matches!(err, ValidationError::EmptyEvaluationParams));
    }

    #[test]
    fn test_builder_validates_rubric() {
        let err = metric()
            .criteria("be right")
            .rubric(vec![
                RubricEntry::new(0, 6, "low"),
                RubricEntry::new(5, 10, "high"),
            ])
            .build()
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidRubric(_)));

        let m = metric().criteria("be right").rubric(vec![]).build().expect("metric");
        assert!(m.rubric().is_none());
    }

    #[test]
    fn test_display_name_suffix() {
        let m = metric().criteria("be right").build().expect("metric");
        assert_eq!(m.display_name(), "Correctness [MEval]");
        let m = metric()
            .criteria("be right")
            .without_suffix()
            .build()
            .expect("metric");
        assert_eq!(m.display_name(), "Correctness");
        assert_eq!(m.top_logprobs(), DEFAULT_TOP_LOGPROBS);
    }

    #[test]
    fn test_normalize() {
        let m = metric().criteria("be right").build().expect("metric");
        let scored = |raw_score, weighted_score| Scored {
            raw_score,
            weighted_score,
            reason: String::new(),
            cost: None,
            path: GenerationPath::Text,
        };
        assert_eq!(m.normalize(&scored(7.0, None), false), 0.7);
        assert!((m.normalize(&scored(8.0, Some(7.8)), false) - 0.78).abs() < 1e-9);
        assert_eq!(m.normalize(&scored(1.0, None), true), 1.0);
        assert_eq!(m.normalize(&scored(0.0, None), true), 0.0);
    }

    #[test]
    fn test_validate_candidates() {
        let m = metric().criteria("be right").build().expect("metric");
        let a = TestCase::new("q", "a1");
        let b = TestCase::new("q", "a2");
        let c = TestCase::new("other", "a3");

        assert!(matches!(
            m.validate_candidates(std::slice::from_ref(&a)),
            Err(ValidationError::TooFewCandidates { found: 1 })
        ));
        assert!(matches!(
            m.validate_candidates(&[a.clone(), c]),
            Err(ValidationError::MismatchedInputs)
        ));
        assert!(m.validate_candidates(&[a, b]).is_ok());
    }
}
