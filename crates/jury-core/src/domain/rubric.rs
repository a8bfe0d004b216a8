//! Discrete scoring rubrics.
//!
//! A rubric maps inclusive score bands on the judge's 0-10 scale to the
//! outcome expected in that band. Bands are validated and sorted once, at
//! construction, so every [`Rubric`] value in circulation is well formed.

use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// Highest score on the judge's integer scale.
pub const MAX_SCORE: u8 = 10;

/// Score range used when no rubric narrows it.
pub const DEFAULT_SCORE_RANGE: (u8, u8) = (0, MAX_SCORE);

/// One score band with the outcome it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricEntry {
    /// Inclusive `(start, end)` band.
    pub score_range: (u8, u8),
    pub expected_outcome: String,
}

impl RubricEntry {
    pub fn new(start: u8, end: u8, expected_outcome: impl Into<String>) -> Self {
        Self {
            score_range: (start, end),
            expected_outcome: expected_outcome.into(),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let (start, end) = self.score_range;
        if start > MAX_SCORE || end > MAX_SCORE {
            return Err(ValidationError::InvalidRubric(format!(
                "score range {start}-{end} must lie within 0-{MAX_SCORE}"
            )));
        }
        if start > end {
            return Err(ValidationError::InvalidRubric(format!(
                "score range start {start} is greater than end {end}"
            )));
        }
        Ok(())
    }
}

/// Validated, sorted, non-overlapping set of score bands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RubricEntry>", into = "Vec<RubricEntry>")]
pub struct Rubric {
    entries: Vec<RubricEntry>,
}

impl Rubric {
    /// Validate each band, sort by band start, and reject overlaps.
    pub fn new(mut entries: Vec<RubricEntry>) -> Result<Self, ValidationError> {
        if entries.is_empty() {
            return Err(ValidationError::InvalidRubric(
                "rubric must contain at least one entry".to_string(),
            ));
        }
        for entry in &entries {
            entry.validate()?;
        }

        entries.sort_by_key(|e| e.score_range.0);

        for pair in entries.windows(2) {
            let (a_start, a_end) = pair[0].score_range;
            let (b_start, b_end) = pair[1].score_range;
            if a_end >= b_start {
                return Err(ValidationError::InvalidRubric(format!(
                    "overlapping score ranges {a_start}-{a_end} and {b_start}-{b_end}"
                )));
            }
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[RubricEntry] {
        &self.entries
    }

    /// Lowest start and highest end across all bands.
    pub fn score_range(&self) -> (u8, u8) {
        let start = self.entries.first().map(|e| e.score_range.0).unwrap_or(0);
        let end = self
            .entries
            .last()
            .map(|e| e.score_range.1)
            .unwrap_or(MAX_SCORE);
        (start, end)
    }

    /// Prompt text, one band per line: `"0-3: outcome"` or `"5: outcome"`.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| {
                let (start, end) = e.score_range;
                if start == end {
                    format!("{start}: {}", e.expected_outcome)
                } else {
                    format!("{start}-{end}: {}", e.expected_outcome)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl TryFrom<Vec<RubricEntry>> for Rubric {
    type Error = ValidationError;

    fn try_from(entries: Vec<RubricEntry>) -> Result<Self, Self::Error> {
        Rubric::new(entries)
    }
}

impl From<Rubric> for Vec<RubricEntry> {
    fn from(rubric: Rubric) -> Self {
        rubric.entries
    }
}

/// Score range implied by an optional rubric.
pub fn score_range(rubric: Option<&Rubric>) -> (u8, u8) {
    rubric.map(Rubric::score_range).unwrap_or(DEFAULT_SCORE_RANGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rubric_is_sorted_at_construction() {
        let rubric = Rubric::new(vec![
            RubricEntry::new(7, 10, "fully correct"),
            RubricEntry::new(0, 3, "wrong"),
            RubricEntry::new(4, 6, "partially correct"),
        ])
        .expect("valid rubric");

        let starts: Vec<u8> = rubric.entries().iter().map(|e| e.score_range.0).collect();
        assert_eq!(starts, vec![0, 4, 7]);
        assert_eq!(rubric.score_range(), (0, 10));
    }

    #[test]
    fn test_rubric_rejects_overlap() {
        let err = Rubric::new(vec![
            RubricEntry::new(0, 5, "low"),
            RubricEntry::new(5, 10, "high"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("overlapping"));
    }

    #[test]
    fn test_rubric_rejects_overlap_given_out_of_order() {
        let err = Rubric::new(vec![
            RubricEntry::new(6, 10, "high"),
            RubricEntry::new(2, 8, "middle"),
        ])
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidRubric(_)));
    }

    #[test]
    fn test_rubric_rejects_inverted_range() {
        let err = Rubric::new(vec![RubricEntry::new(6, 2, "inverted")]).unwrap_err();
        assert!(err.to_string().contains("greater than end"));
    }

    #[test]
    fn test_rubric_rejects_out_of_scale() {
        let err = Rubric::new(vec![RubricEntry::new(0, 11, "too high")]).unwrap_err();
        assert!(err.to_string().contains("within 0-10"));
    }

    #[test]
    fn test_rubric_rejects_empty() {
        assert!(Rubric::new(vec![]).is_err());
    }

    #[test]
    fn test_rubric_render() {
        let rubric = Rubric::new(vec![
            RubricEntry::new(0, 0, "no answer"),
            RubricEntry::new(1, 10, "some answer"),
        ])
        .expect("valid rubric");
        assert_eq!(rubric.render(), "0: no answer\n1-10: some answer");
    }

    #[test]
    fn test_narrow_rubric_score_range() {
        let rubric = Rubric::new(vec![
            RubricEntry::new(2, 4, "meh"),
            RubricEntry::new(5, 8, "good"),
        ])
        .expect("valid rubric");
        assert_eq!(score_range(Some(&rubric)), (2, 8));
        assert_eq!(score_range(None), DEFAULT_SCORE_RANGE);
    }

    #[test]
    fn test_rubric_deserialize_validates() {
        let bad = r#"[{"score_range":[0,5],"expected_outcome":"a"},{"score_range":[3,9],"expected_outcome":"b"}]"#;
        assert!(serde_json::from_str::<Rubric>(bad).is_err());

        let good = r#"[{"score_range":[6,10],"expected_outcome":"b"},{"score_range":[0,5],"expected_outcome":"a"}]"#;
        let rubric: Rubric = serde_json::from_str(good).expect("deserialize");
        assert_eq!(rubric.entries()[0].expected_outcome, "a");
    }
}
