//! Integration tests for the judging and lifecycle flow: scoring, leaderboards, winner
//! selection and the Complete-transition guard, all against the SQLite backend.

mod support;

use std::collections::BTreeMap;

use podium_engine::{
    db_types::{CompetitionStatus, NewJudgeAssignment, SubmissionStatus},
    events::EventProducers,
    ranking::UNRANKED,
    winners::{WinnerPick, WinnerSelectionError},
    CompetitionApi,
    CompetitionManagement,
    JudgingApi,
    JudgingApiError,
    JudgingManagement,
    LifecycleApiError,
    ScoreSubmission,
    SqliteDatabase,
};
use support::{new_test_db, seed_competition, seed_submission};

const ADMIN: i64 = 1;

fn scores(innovation: f64, feasibility: f64) -> BTreeMap<String, f64> {
    [("innovation".to_string(), innovation), ("feasibility".to_string(), feasibility)].into_iter().collect()
}

fn score_payload(submission_id: i64, judge_id: i64, innovation: f64, feasibility: f64) -> ScoreSubmission {
    ScoreSubmission {
        submission_id,
        judge_id,
        judge_name: format!("judge-{judge_id}"),
        criteria_scores: scores(innovation, feasibility),
        feedback: "Solid work".to_string(),
        privileged: false,
    }
}

/// A Judging competition with three Submitted entries, each assigned to the given judges.
async fn judging_competition(db: &SqliteDatabase, judges: &[i64]) -> (i64, Vec<i64>) {
    let competition = seed_competition(db, CompetitionStatus::Judging).await;
    let mut submission_ids = Vec::new();
    for founder in [10, 20, 30] {
        let s = seed_submission(db, competition.id, founder, SubmissionStatus::Submitted).await;
        submission_ids.push(s.id);
    }
    let api = JudgingApi::new(db.clone());
    let assignments: Vec<NewJudgeAssignment> = submission_ids
        .iter()
        .flat_map(|&sid| judges.iter().map(move |&j| NewJudgeAssignment::new(j, sid, ADMIN)))
        .collect();
    api.assign_judges(competition.id, assignments).await.unwrap();
    (competition.id, submission_ids)
}

#[tokio::test]
async fn weighted_scoring_flows_into_the_final_score() {
    let db = new_test_db().await;
    let (competition_id, submissions) = judging_competition(&db, &[501]).await;
    let api = JudgingApi::new(db.clone());

    // rubric {innovation: 2, feasibility: 1}: (9·2 + 6·1) / 3 = 8.0
    let updated = api.submit_score(score_payload(submissions[0], 501, 9.0, 6.0)).await.unwrap();
    let sheet = updated.human_scores.clone().unwrap();
    assert_eq!(sheet.judges.len(), 1);
    assert_eq!(sheet.judges[0].overall, 8.0);
    assert_eq!(sheet.average, 8.0);
    assert_eq!(updated.final_score, Some(8.0));

    // a second judge's plain 6.0 pulls the cross-judge mean down to 7.0
    let assignment = NewJudgeAssignment::new(502, submissions[0], ADMIN);
    api.assign_judges(competition_id, vec![assignment]).await.unwrap();
    let updated = api.submit_score(score_payload(submissions[0], 502, 6.0, 6.0)).await.unwrap();
    let sheet = updated.human_scores.clone().unwrap();
    assert_eq!(sheet.average, 7.0);
    assert_eq!(updated.final_score, Some(7.0));

    // re-scoring replaces the first judge's entry instead of appending
    let updated = api.submit_score(score_payload(submissions[0], 501, 6.0, 6.0)).await.unwrap();
    let sheet = updated.human_scores.unwrap();
    assert_eq!(sheet.judges.len(), 2);
    assert_eq!(updated.final_score, Some(6.0));
}

#[tokio::test]
async fn scoring_marks_the_assignment_complete() {
    let db = new_test_db().await;
    let (_, submissions) = judging_competition(&db, &[501]).await;
    let api = JudgingApi::new(db.clone());

    assert!(db.fetch_assignment(501, submissions[0]).await.unwrap().unwrap().completed_at.is_none());
    api.submit_score(score_payload(submissions[0], 501, 7.0, 7.0)).await.unwrap();
    let completed = db.fetch_assignment(501, submissions[0]).await.unwrap().unwrap().completed_at;
    assert!(completed.is_some());

    // editing the score leaves the original completion timestamp in place
    api.submit_score(score_payload(submissions[0], 501, 8.0, 8.0)).await.unwrap();
    let after_edit = db.fetch_assignment(501, submissions[0]).await.unwrap().unwrap().completed_at;
    assert_eq!(after_edit, completed);
}

#[tokio::test]
async fn unassigned_judges_are_rejected_and_admins_bypass() {
    let db = new_test_db().await;
    let (_, submissions) = judging_competition(&db, &[501]).await;
    let api = JudgingApi::new(db.clone());

    let err = api.submit_score(score_payload(submissions[0], 999, 7.0, 7.0)).await.unwrap_err();
    assert!(matches!(err, JudgingApiError::NotAssigned { judge_id: 999, .. }));

    let mut privileged = score_payload(submissions[0], 999, 7.0, 7.0);
    privileged.privileged = true;
    api.submit_score(privileged).await.unwrap();
    // privileged overrides never complete an assignment
    assert!(db.fetch_assignment(999, submissions[0]).await.unwrap().is_none());
}

#[tokio::test]
async fn criteria_key_mismatch_is_a_structured_error() {
    let db = new_test_db().await;
    let (_, submissions) = judging_competition(&db, &[501]).await;
    let api = JudgingApi::new(db.clone());

    let mut payload = score_payload(submissions[0], 501, 7.0, 7.0);
    payload.criteria_scores.remove("feasibility");
    payload.criteria_scores.insert("polish".to_string(), 9.0);
    let err = api.submit_score(payload).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("feasibility"), "missing key not reported: {message}");
    assert!(message.contains("polish"), "extra key not reported: {message}");

    let payload = score_payload(submissions[0], 501, 11.0, 7.0);
    let err = api.submit_score(payload).await.unwrap_err();
    assert!(matches!(err, JudgingApiError::InvalidScores(_)));
}

#[tokio::test]
async fn leaderboard_ranks_ties_with_competition_semantics() {
    let db = new_test_db().await;
    let (competition_id, submissions) = judging_competition(&db, &[501]).await;
    let api = JudgingApi::new(db.clone());

    // two nines and an eight: 9.0, 9.0, 8.0 → ranks 1, 1, 3
    api.submit_score(score_payload(submissions[0], 501, 9.0, 9.0)).await.unwrap();
    api.submit_score(score_payload(submissions[1], 501, 9.0, 9.0)).await.unwrap();
    api.submit_score(score_payload(submissions[2], 501, 8.0, 8.0)).await.unwrap();

    let board = api.leaderboard(competition_id).await.unwrap();
    assert_eq!(board.eligible_submissions, 3);
    assert_eq!(board.fully_judged_count, 3);
    let ranks: Vec<(u32, bool)> = board.entries.iter().map(|e| (e.rank, e.has_tie)).collect();
    assert_eq!(ranks, vec![(1, true), (1, true), (3, false)]);
}

#[tokio::test]
async fn unjudged_submissions_trail_the_board_unranked() {
    let db = new_test_db().await;
    let (competition_id, submissions) = judging_competition(&db, &[501]).await;
    let api = JudgingApi::new(db.clone());
    api.submit_score(score_payload(submissions[0], 501, 9.0, 9.0)).await.unwrap();

    let board = api.leaderboard(competition_id).await.unwrap();
    assert_eq!(board.fully_judged_count, 1);
    assert_eq!(board.entries[0].rank, 1);
    let unscored: Vec<u32> = board.entries[1..].iter().map(|e| e.rank).collect();
    assert_eq!(unscored, vec![UNRANKED, UNRANKED]);
    assert!(board.entries[1..].iter().all(|e| !e.has_tie));
}

#[tokio::test]
async fn winner_selection_commits_atomically_and_notifies_nobody_on_failure() {
    let db = new_test_db().await;
    let (competition_id, submissions) = judging_competition(&db, &[501]).await;
    let judging = JudgingApi::new(db.clone());
    let api = CompetitionApi::new(db.clone(), EventProducers::default());

    // judging incomplete: selection must be rejected without touching any submission
    let picks = vec![WinnerPick::new(submissions[0], "first"), WinnerPick::new(submissions[1], "second")];
    let err = api.select_winners(competition_id, picks.clone()).await.unwrap_err();
    assert!(matches!(
        err,
        LifecycleApiError::InvalidWinnerSelection(WinnerSelectionError::JudgingIncomplete { pending: 3 })
    ));
    for &sid in &submissions {
        let s = db.fetch_submission(sid).await.unwrap().unwrap();
        assert_eq!(s.status, SubmissionStatus::Submitted);
    }

    for &sid in &submissions {
        judging.submit_score(score_payload(sid, 501, 8.0, 8.0)).await.unwrap();
    }

    // place set not matching the prize structure is rejected
    let bad_picks = vec![WinnerPick::new(submissions[0], "first"), WinnerPick::new(submissions[1], "third")];
    let err = api.select_winners(competition_id, bad_picks).await.unwrap_err();
    assert!(matches!(
        err,
        LifecycleApiError::InvalidWinnerSelection(WinnerSelectionError::InvalidPlace { .. })
    ));

    let outcome = api.select_winners(competition_id, picks).await.unwrap();
    assert_eq!(outcome.winners.len(), 2);
    // competition stays in Judging; completing it is a separate step
    assert_eq!(outcome.status, CompetitionStatus::Judging);

    let first = db.fetch_submission(submissions[0]).await.unwrap().unwrap();
    assert_eq!(first.status, SubmissionStatus::Winner);
    assert_eq!(first.placement.as_deref(), Some("first"));
    let third = db.fetch_submission(submissions[2]).await.unwrap().unwrap();
    assert_eq!(third.status, SubmissionStatus::NotSelected);
    assert!(third.placement.is_none());
}

#[tokio::test]
async fn complete_transition_requires_a_full_winner_set() {
    let db = new_test_db().await;
    let (competition_id, submissions) = judging_competition(&db, &[501]).await;
    let judging = JudgingApi::new(db.clone());
    let api = CompetitionApi::new(db.clone(), EventProducers::default());

    // no winners yet
    let err = api.transition_status(competition_id, CompetitionStatus::Complete).await.unwrap_err();
    assert!(matches!(err, LifecycleApiError::PreconditionFailed(_)));

    for &sid in &submissions {
        judging.submit_score(score_payload(sid, 501, 8.0, 8.0)).await.unwrap();
    }
    let picks = vec![WinnerPick::new(submissions[0], "first"), WinnerPick::new(submissions[1], "second")];
    api.select_winners(competition_id, picks).await.unwrap();

    let completed = api.transition_status(competition_id, CompetitionStatus::Complete).await.unwrap();
    assert_eq!(completed.status, CompetitionStatus::Complete);
}

#[tokio::test]
async fn complete_transition_rejected_outside_judging() {
    let db = new_test_db().await;
    let competition = seed_competition(&db, CompetitionStatus::Active).await;
    let api = CompetitionApi::new(db.clone(), EventProducers::default());
    let err = api.transition_status(competition.id, CompetitionStatus::Complete).await.unwrap_err();
    match err {
        LifecycleApiError::PreconditionFailed(msg) => {
            assert!(msg.contains("Judging"), "message should name the required state: {msg}");
            assert!(msg.contains("Active"), "message should name the current state: {msg}");
        },
        other => panic!("Expected PreconditionFailed, got {other}"),
    }
}

#[tokio::test]
async fn only_draft_competitions_can_be_deleted() {
    let db = new_test_db().await;
    let api = CompetitionApi::new(db.clone(), EventProducers::default());

    let draft = seed_competition(&db, CompetitionStatus::Draft).await;
    api.delete_competition(draft.id).await.unwrap();
    assert!(db.fetch_competition(draft.id).await.unwrap().is_none());

    let active = seed_competition(&db, CompetitionStatus::Active).await;
    let err = api.delete_competition(active.id).await.unwrap_err();
    assert!(matches!(err, LifecycleApiError::PreconditionFailed(_)));
    assert!(db.fetch_competition(active.id).await.unwrap().is_some());
}

#[tokio::test]
async fn public_results_require_completion_and_redact_private_entries() {
    let db = new_test_db().await;
    let (competition_id, submissions) = judging_competition(&db, &[501]).await;
    let judging = JudgingApi::new(db.clone());
    let lifecycle = CompetitionApi::new(db.clone(), EventProducers::default());

    let err = judging.results(competition_id).await.unwrap_err();
    assert!(matches!(err, JudgingApiError::WrongState { .. }));

    for &sid in &submissions {
        judging.submit_score(score_payload(sid, 501, 8.0, 8.0)).await.unwrap();
    }
    let picks = vec![WinnerPick::new(submissions[0], "first"), WinnerPick::new(submissions[1], "second")];
    lifecycle.select_winners(competition_id, picks).await.unwrap();
    lifecycle.transition_status(competition_id, CompetitionStatus::Complete).await.unwrap();

    let results = judging.results(competition_id).await.unwrap();
    // seeded submissions are private, so the public view drops their user ids
    assert!(results.entries.iter().all(|e| e.user_id.is_none()));
    // the operational leaderboard keeps them
    let board = judging.leaderboard(competition_id).await.unwrap();
    assert!(board.entries.iter().all(|e| e.user_id.is_some()));
}

#[tokio::test]
async fn judge_assignment_gates_on_competition_status() {
    let db = new_test_db().await;
    let competition = seed_competition(&db, CompetitionStatus::Active).await;
    let submission = seed_submission(&db, competition.id, 10, SubmissionStatus::Submitted).await;
    let api = JudgingApi::new(db.clone());

    let err = api
        .assign_judges(competition.id, vec![NewJudgeAssignment::new(501, submission.id, ADMIN)])
        .await
        .unwrap_err();
    assert!(matches!(err, JudgingApiError::WrongState { .. }));
}

#[tokio::test]
async fn duplicate_assignments_are_skipped() {
    let db = new_test_db().await;
    let (competition_id, submissions) = judging_competition(&db, &[501]).await;
    let api = JudgingApi::new(db.clone());

    let all = api
        .assign_judges(competition_id, vec![NewJudgeAssignment::new(501, submissions[0], ADMIN)])
        .await
        .unwrap();
    // re-posting the pair creates nothing new: one assignment per (judge, submission)
    assert_eq!(all.len(), 3);
    assert_eq!(all.iter().filter(|a| a.submission_id == submissions[0]).count(), 1);
}
