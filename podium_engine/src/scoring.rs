//! The scoring engine.
//!
//! Everything in this module is pure. A judge hands in a map of criterion → score; the rubric
//! weights turn that into a single per-judge `overall`; the per-judge overalls are averaged into
//! `ScoreSheet::average`; and the sheet averages are blended into the submission's final score.
//! Persistence is the storage layer's problem.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use podium_common::helpers::round2;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Weight of the automated scoring channel in the blended final score. Architecturally pluggable,
/// currently fixed at zero.
pub const AI_SCORE_WEIGHT: f64 = 0.0;
/// Weight of the human judging channel in the blended final score.
pub const HUMAN_SCORE_WEIGHT: f64 = 1.0;

pub const MIN_CRITERION_SCORE: f64 = 0.0;
pub const MAX_CRITERION_SCORE: f64 = 10.0;

//--------------------------------------        Rubric        --------------------------------------------------------
/// A judging rubric: criterion name → weight.
///
/// Rubrics arrive as JSON authored by competition admins, so parsing is deliberately lenient.
/// Accepted forms:
/// * a flat map: `{"innovation": 2, "feasibility": 1}`
/// * the same map nested under a `criteria` key
/// * per-criterion objects carrying a `weight` field: `{"innovation": {"weight": 2}}`
///
/// Any criterion whose weight cannot be read gets the default weight of 1.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Rubric(BTreeMap<String, f64>);

pub const DEFAULT_CRITERION_WEIGHT: f64 = 1.0;

impl Rubric {
    pub fn new(criteria: BTreeMap<String, f64>) -> Self {
        Self(criteria)
    }

    /// Lenient parse from an arbitrary JSON value. Returns `None` if the value (or its
    /// `criteria` sub-object) is not a map at all.
    pub fn from_value(value: &Value) -> Option<Self> {
        let criteria = match value.get("criteria") {
            Some(nested) => nested.as_object()?,
            None => value.as_object()?,
        };
        let map = criteria
            .iter()
            .map(|(name, entry)| {
                let weight = match entry {
                    Value::Number(n) => n.as_f64().unwrap_or(DEFAULT_CRITERION_WEIGHT),
                    Value::Object(details) => {
                        details.get("weight").and_then(Value::as_f64).unwrap_or(DEFAULT_CRITERION_WEIGHT)
                    },
                    _ => DEFAULT_CRITERION_WEIGHT,
                };
                (name.clone(), weight)
            })
            .collect();
        Some(Self(map))
    }

    pub fn weight(&self, criterion: &str) -> f64 {
        self.0.get(criterion).copied().unwrap_or(DEFAULT_CRITERION_WEIGHT)
    }

    pub fn criteria(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks that the submitted criterion key set is *exactly* the rubric's key set, and that
    /// every score lies within [0, 10].
    pub fn validate_scores(&self, scores: &BTreeMap<String, f64>) -> Result<(), ScoreValidationError> {
        let missing: Vec<String> = self.0.keys().filter(|k| !scores.contains_key(*k)).cloned().collect();
        let extra: Vec<String> = scores.keys().filter(|k| !self.0.contains_key(*k)).cloned().collect();
        if !missing.is_empty() || !extra.is_empty() {
            return Err(ScoreValidationError::CriteriaMismatch(CriteriaMismatch { missing, extra }));
        }
        for (criterion, &score) in scores {
            if !(MIN_CRITERION_SCORE..=MAX_CRITERION_SCORE).contains(&score) {
                return Err(ScoreValidationError::ScoreOutOfRange { criterion: criterion.clone(), value: score });
            }
        }
        Ok(())
    }

    /// The weighted average of the given criterion scores: `Σ(score·weight) / Σ(weight)`, with the
    /// plain arithmetic mean as fallback when the total weight is zero. Empty score maps yield 0.
    pub fn weighted_overall(&self, scores: &BTreeMap<String, f64>) -> f64 {
        if scores.is_empty() {
            return 0.0;
        }
        let mut total_weighted = 0.0;
        let mut total_weight = 0.0;
        for (criterion, &score) in scores {
            let weight = self.weight(criterion);
            total_weighted += score * weight;
            total_weight += weight;
        }
        if total_weight > 0.0 {
            total_weighted / total_weight
        } else {
            scores.values().sum::<f64>() / scores.len() as f64
        }
    }
}

impl<'de> Deserialize<'de> for Rubric {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Rubric::from_value(&value).ok_or_else(|| de::Error::custom("rubric must be a JSON object"))
    }
}

impl<const N: usize> From<[(&str, f64); N]> for Rubric {
    fn from(criteria: [(&str, f64); N]) -> Self {
        Self(criteria.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

//--------------------------------------  ScoreValidation     --------------------------------------------------------
/// The submitted criterion keys do not match the rubric. Both directions are reported so that the
/// caller can fix their payload in one round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CriteriaMismatch {
    pub missing: Vec<String>,
    pub extra: Vec<String>,
}

impl std::fmt::Display for CriteriaMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if !self.missing.is_empty() {
            parts.push(format!("Missing criteria: {}", self.missing.join(", ")));
        }
        if !self.extra.is_empty() {
            parts.push(format!("Unknown criteria: {}", self.extra.join(", ")));
        }
        write!(f, "Criteria mismatch. {}", parts.join(". "))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreValidationError {
    #[error("{0}")]
    CriteriaMismatch(CriteriaMismatch),
    #[error("Score for '{criterion}' must be between 0 and 10, got {value}")]
    ScoreOutOfRange { criterion: String, value: f64 },
}

//--------------------------------------     JudgeScore       --------------------------------------------------------
/// One judge's complete score entry for a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeScore {
    pub judge_id: i64,
    pub judge_name: String,
    pub criteria_scores: BTreeMap<String, f64>,
    /// The rubric-weighted average of `criteria_scores`.
    pub overall: f64,
    pub feedback: String,
    pub submitted_at: DateTime<Utc>,
}

//--------------------------------------     ScoreSheet       --------------------------------------------------------
/// The structured aggregate of all judges' scores for one submission. Stored as a JSON column and
/// parsed at the storage boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSheet {
    pub judges: Vec<JudgeScore>,
    /// Arithmetic mean of each judge's `overall`. A simple mean across judges; judge entries are
    /// never weighted against each other.
    pub average: f64,
}

impl ScoreSheet {
    /// Inserts or replaces the entry for `entry.judge_id` and recomputes the cross-judge average.
    pub fn upsert(&mut self, entry: JudgeScore) {
        match self.judges.iter_mut().find(|j| j.judge_id == entry.judge_id) {
            Some(existing) => *existing = entry,
            None => self.judges.push(entry),
        }
        self.recompute_average();
    }

    pub fn score_for(&self, judge_id: i64) -> Option<&JudgeScore> {
        self.judges.iter().find(|j| j.judge_id == judge_id)
    }

    fn recompute_average(&mut self) {
        if self.judges.is_empty() {
            self.average = 0.0;
        } else {
            self.average = self.judges.iter().map(|j| j.overall).sum::<f64>() / self.judges.len() as f64;
        }
    }
}

//--------------------------------------    FeedbackEntry     --------------------------------------------------------
/// Qualitative feedback, kept as a parallel list keyed by judge id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub judge_id: i64,
    pub judge_name: String,
    pub feedback: String,
    pub submitted_at: DateTime<Utc>,
}

pub fn upsert_feedback(feedback: &mut Vec<FeedbackEntry>, entry: FeedbackEntry) {
    match feedback.iter_mut().find(|f| f.judge_id == entry.judge_id) {
        Some(existing) => *existing = entry,
        None => feedback.push(entry),
    }
}

//--------------------------------------    final score       --------------------------------------------------------
/// The blended final score: `round(AI_SCORE_WEIGHT·ai_avg + HUMAN_SCORE_WEIGHT·human_avg, 2)`.
pub fn blended_score(ai_average: f64, human_average: f64) -> f64 {
    round2(AI_SCORE_WEIGHT * ai_average + HUMAN_SCORE_WEIGHT * human_average)
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use serde_json::json;

    use super::{blended_score, CriteriaMismatch, JudgeScore, Rubric, ScoreSheet, ScoreValidationError};

    fn scores(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn judge_entry(judge_id: i64, overall: f64) -> JudgeScore {
        JudgeScore {
            judge_id,
            judge_name: format!("judge-{judge_id}"),
            criteria_scores: BTreeMap::new(),
            overall,
            feedback: String::new(),
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn weighted_overall_uses_rubric_weights() {
        let rubric = Rubric::from([("innovation", 2.0), ("feasibility", 1.0)]);
        let overall = rubric.weighted_overall(&scores(&[("innovation", 9.0), ("feasibility", 6.0)]));
        assert_eq!(overall, 8.0);
    }

    #[test]
    fn zero_total_weight_falls_back_to_plain_mean() {
        let rubric = Rubric::from([("a", 0.0), ("b", 0.0)]);
        let overall = rubric.weighted_overall(&scores(&[("a", 4.0), ("b", 8.0)]));
        assert_eq!(overall, 6.0);
    }

    #[test]
    fn unknown_criteria_get_default_weight() {
        let rubric = Rubric::default();
        let overall = rubric.weighted_overall(&scores(&[("a", 4.0), ("b", 8.0)]));
        assert_eq!(overall, 6.0);
    }

    #[test]
    fn rubric_parses_flat_and_nested_forms() {
        let flat = Rubric::from_value(&json!({"innovation": 2.0, "feasibility": 1.0})).unwrap();
        let nested = Rubric::from_value(&json!({"criteria": {"innovation": {"weight": 2.0}, "feasibility": {}}}))
            .unwrap();
        assert_eq!(flat.weight("innovation"), 2.0);
        assert_eq!(nested.weight("innovation"), 2.0);
        // object without a weight field falls back to the default
        assert_eq!(nested.weight("feasibility"), 1.0);
        assert!(Rubric::from_value(&json!("not a rubric")).is_none());
    }

    #[test]
    fn validate_reports_missing_and_extra_keys() {
        let rubric = Rubric::from([("innovation", 1.0), ("feasibility", 1.0)]);
        let err = rubric.validate_scores(&scores(&[("innovation", 5.0), ("polish", 5.0)])).unwrap_err();
        assert_eq!(
            err,
            ScoreValidationError::CriteriaMismatch(CriteriaMismatch {
                missing: vec!["feasibility".to_string()],
                extra: vec!["polish".to_string()],
            })
        );
    }

    #[test]
    fn validate_rejects_out_of_range_scores() {
        let rubric = Rubric::from([("innovation", 1.0)]);
        let err = rubric.validate_scores(&scores(&[("innovation", 10.5)])).unwrap_err();
        assert!(matches!(err, ScoreValidationError::ScoreOutOfRange { .. }));
        rubric.validate_scores(&scores(&[("innovation", 10.0)])).unwrap();
        rubric.validate_scores(&scores(&[("innovation", 0.0)])).unwrap();
    }

    #[test]
    fn sheet_average_is_mean_of_overalls() {
        let mut sheet = ScoreSheet::default();
        sheet.upsert(judge_entry(1, 8.0));
        sheet.upsert(judge_entry(2, 6.0));
        assert_eq!(sheet.average, 7.0);
    }

    #[test]
    fn upsert_replaces_existing_judge_entry() {
        let mut sheet = ScoreSheet::default();
        sheet.upsert(judge_entry(1, 8.0));
        sheet.upsert(judge_entry(1, 4.0));
        assert_eq!(sheet.judges.len(), 1);
        assert_eq!(sheet.average, 4.0);
    }

    #[test]
    fn final_score_ignores_ai_channel() {
        // AI weight is zero, so only the human average survives the blend
        assert_eq!(blended_score(9.9, 7.333), 7.33);
        assert_eq!(blended_score(0.0, 8.0), 8.0);
    }
}
