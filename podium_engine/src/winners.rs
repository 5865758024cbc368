//! The winner selection validator.
//!
//! Validates a proposed winner set against the competition's prize structure and the judging
//! state before anything is committed. The checks run in a fixed order and each failure mode is a
//! distinct error, so callers can surface exactly which precondition was violated.

use std::collections::HashSet;

use podium_common::Cents;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    db_types::{Competition, CompetitionStatus, Submission},
    ranking::JudgingProgress,
};

//--------------------------------------     WinnerPick       --------------------------------------------------------
/// One entry of a proposed winner set: this submission takes this place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerPick {
    pub submission_id: i64,
    pub place: String,
}

impl WinnerPick {
    pub fn new(submission_id: i64, place: &str) -> Self {
        Self { submission_id, place: place.to_string() }
    }
}

//--------------------------------------    PlannedWinner     --------------------------------------------------------
/// A validated winner, with the payout its place earns. `prize_amount` is
/// `prize_pool × prize_structure[place]`, computed independently per place.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedWinner {
    pub submission_id: i64,
    pub user_id: i64,
    pub title: String,
    pub place: String,
    pub prize_amount: Cents,
}

//--------------------------------------  WinnerSelectionError ------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WinnerSelectionError {
    #[error("Competition must be in Judging status to select winners. Current status: {current}")]
    CompetitionNotJudging { current: CompetitionStatus },
    #[error("Cannot select winners. {pending} submissions still need judging")]
    JudgingIncomplete { pending: usize },
    #[error("Must select {expected} winners to match the prize structure, got {actual}")]
    WinnerCountMismatch { expected: usize, actual: usize },
    #[error("Duplicate submission {0} in winners list")]
    DuplicateSubmission(i64),
    #[error("Duplicate place '{0}' in winners list")]
    DuplicatePlace(String),
    #[error("Invalid place '{invalid}'. Must be one of: {expected}")]
    InvalidPlace { invalid: String, expected: String },
    #[error("Place '{0}' from the prize structure has no winner assigned")]
    MissingPlace(String),
    #[error("Submission {0} not found or not eligible for this competition")]
    IneligibleSubmission(i64),
}

//--------------------------------------      validation      --------------------------------------------------------
/// Validates a proposed winner set. `eligible` must contain every submission of the competition
/// in Submitted or UnderReview status, paired with its judging progress.
///
/// The checks run in order; the first violated precondition is returned:
/// 1. the competition is in Judging status,
/// 2. every eligible submission is judging-complete,
/// 3. the winner count equals the prize-structure place count,
/// 4. no submission appears twice,
/// 5. no place appears twice,
/// 6. the place set equals the prize-structure key set,
/// 7. every picked submission is in the eligible set.
pub fn validate_winner_selection(
    competition: &Competition,
    picks: &[WinnerPick],
    eligible: &[(Submission, JudgingProgress)],
) -> Result<Vec<PlannedWinner>, WinnerSelectionError> {
    if competition.status != CompetitionStatus::Judging {
        return Err(WinnerSelectionError::CompetitionNotJudging { current: competition.status });
    }

    let pending = eligible.iter().filter(|(_, progress)| !progress.is_complete()).count();
    if pending > 0 {
        return Err(WinnerSelectionError::JudgingIncomplete { pending });
    }

    let expected = competition.prize_structure.len();
    if picks.len() != expected {
        return Err(WinnerSelectionError::WinnerCountMismatch { expected, actual: picks.len() });
    }

    let mut seen_submissions = HashSet::new();
    for pick in picks {
        if !seen_submissions.insert(pick.submission_id) {
            return Err(WinnerSelectionError::DuplicateSubmission(pick.submission_id));
        }
    }

    let mut seen_places = HashSet::new();
    for pick in picks {
        if !seen_places.insert(pick.place.as_str()) {
            return Err(WinnerSelectionError::DuplicatePlace(pick.place.clone()));
        }
    }

    for pick in picks {
        if !competition.prize_structure.contains(&pick.place) {
            let expected = competition.prize_structure.places().cloned().collect::<Vec<_>>().join(", ");
            return Err(WinnerSelectionError::InvalidPlace { invalid: pick.place.clone(), expected });
        }
    }
    // Equal lengths, no duplicates and no invalid places together imply full coverage, but report
    // the missing place explicitly if the invariant is ever violated.
    for place in competition.prize_structure.places() {
        if !seen_places.contains(place.as_str()) {
            return Err(WinnerSelectionError::MissingPlace(place.clone()));
        }
    }

    let mut winners = Vec::with_capacity(picks.len());
    for pick in picks {
        let submission = eligible
            .iter()
            .map(|(s, _)| s)
            .find(|s| s.id == pick.submission_id)
            .ok_or(WinnerSelectionError::IneligibleSubmission(pick.submission_id))?;
        let prize_amount = competition
            .prize_for(&pick.place)
            .ok_or_else(|| WinnerSelectionError::MissingPlace(pick.place.clone()))?;
        winners.push(PlannedWinner {
            submission_id: submission.id,
            user_id: submission.user_id,
            title: submission.title.clone(),
            place: pick.place.clone(),
            prize_amount,
        });
    }
    Ok(winners)
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use podium_common::Cents;

    use super::{validate_winner_selection, WinnerPick, WinnerSelectionError};
    use crate::{
        db_types::{Competition, CompetitionStatus, PrizeStructure, Submission, SubmissionStatus},
        ranking::JudgingProgress,
        scoring::Rubric,
    };

    fn competition(status: CompetitionStatus) -> Competition {
        Competition {
            id: 1,
            title: "Pitch-off".to_string(),
            status,
            entry_fee: Cents::from_dollars(100),
            platform_fee_percentage: 10.0,
            prize_pool: Cents::from_dollars(1000),
            max_entries: 50,
            current_entries: 3,
            prize_structure: PrizeStructure::from([("first", 0.5), ("second", 0.3)]),
            rubric: Rubric::default(),
            created_by: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn submission(id: i64) -> Submission {
        Submission {
            id,
            competition_id: 1,
            user_id: id * 10,
            title: format!("entry-{id}"),
            status: SubmissionStatus::Submitted,
            attachments: Vec::new(),
            ai_scores: None,
            human_scores: None,
            judge_feedback: Vec::new(),
            final_score: Some(8.0),
            placement: None,
            is_public: false,
            submitted_at: Some(Utc::now()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn eligible(ids: &[i64]) -> Vec<(Submission, JudgingProgress)> {
        ids.iter().map(|&id| (submission(id), JudgingProgress::new(2, 2))).collect()
    }

    #[test]
    fn valid_selection_computes_prizes() {
        let comp = competition(CompetitionStatus::Judging);
        let picks = vec![WinnerPick::new(1, "first"), WinnerPick::new(2, "second")];
        let winners = validate_winner_selection(&comp, &picks, &eligible(&[1, 2, 3])).unwrap();
        assert_eq!(winners.len(), 2);
        assert_eq!(winners[0].prize_amount, Cents::from_dollars(500));
        assert_eq!(winners[1].prize_amount, Cents::from_dollars(300));
    }

    #[test]
    fn rejected_outside_judging() {
        let comp = competition(CompetitionStatus::Active);
        let picks = vec![WinnerPick::new(1, "first"), WinnerPick::new(2, "second")];
        let err = validate_winner_selection(&comp, &picks, &eligible(&[1, 2])).unwrap_err();
        assert_eq!(err, WinnerSelectionError::CompetitionNotJudging { current: CompetitionStatus::Active });
    }

    #[test]
    fn rejected_while_judging_incomplete() {
        let comp = competition(CompetitionStatus::Judging);
        let mut entries = eligible(&[1, 2]);
        entries.push((submission(3), JudgingProgress::new(2, 1)));
        entries.push((submission(4), JudgingProgress::new(0, 0)));
        let picks = vec![WinnerPick::new(1, "first"), WinnerPick::new(2, "second")];
        let err = validate_winner_selection(&comp, &picks, &entries).unwrap_err();
        assert_eq!(err, WinnerSelectionError::JudgingIncomplete { pending: 2 });
    }

    #[test]
    fn rejected_on_count_mismatch() {
        let comp = competition(CompetitionStatus::Judging);
        let err = validate_winner_selection(&comp, &[WinnerPick::new(1, "first")], &eligible(&[1, 2])).unwrap_err();
        assert_eq!(err, WinnerSelectionError::WinnerCountMismatch { expected: 2, actual: 1 });
    }

    #[test]
    fn rejected_on_duplicate_submission_and_place() {
        let comp = competition(CompetitionStatus::Judging);
        let picks = vec![WinnerPick::new(1, "first"), WinnerPick::new(1, "second")];
        let err = validate_winner_selection(&comp, &picks, &eligible(&[1, 2])).unwrap_err();
        assert_eq!(err, WinnerSelectionError::DuplicateSubmission(1));

        let picks = vec![WinnerPick::new(1, "first"), WinnerPick::new(2, "first")];
        let err = validate_winner_selection(&comp, &picks, &eligible(&[1, 2])).unwrap_err();
        assert_eq!(err, WinnerSelectionError::DuplicatePlace("first".to_string()));
    }

    #[test]
    fn rejected_on_invalid_place() {
        let comp = competition(CompetitionStatus::Judging);
        let picks = vec![WinnerPick::new(1, "first"), WinnerPick::new(2, "third")];
        let err = validate_winner_selection(&comp, &picks, &eligible(&[1, 2])).unwrap_err();
        assert!(matches!(err, WinnerSelectionError::InvalidPlace { invalid, .. } if invalid == "third"));
    }

    #[test]
    fn rejected_when_pick_is_not_eligible() {
        let comp = competition(CompetitionStatus::Judging);
        let picks = vec![WinnerPick::new(1, "first"), WinnerPick::new(99, "second")];
        let err = validate_winner_selection(&comp, &picks, &eligible(&[1, 2])).unwrap_err();
        assert_eq!(err, WinnerSelectionError::IneligibleSubmission(99));
    }
}
