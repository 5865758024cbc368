use std::collections::BTreeMap;

use chrono::Utc;
use log::*;

use crate::{
    api::{errors::JudgingApiError, objects::CompetitionLeaderboard},
    db_types::{CompetitionStatus, JudgeAssignment, NewJudgeAssignment, Submission, SubmissionStatus},
    ranking::{rank, RankSource, LEADERBOARD_STATUSES},
    scoring::{blended_score, upsert_feedback, FeedbackEntry, JudgeScore},
    traits::{CompetitionManagement, JudgingManagement, StorageError},
};

/// One judge's score payload for one submission.
#[derive(Debug, Clone)]
pub struct ScoreSubmission {
    pub submission_id: i64,
    pub judge_id: i64,
    pub judge_name: String,
    pub criteria_scores: BTreeMap<String, f64>,
    pub feedback: String,
    /// True when the caller holds a privileged role (admin override). Privileged scoring skips
    /// the assignment check and does not complete any assignment.
    pub privileged: bool,
}

/// `JudgingApi` handles judge assignment, score intake and leaderboard construction.
pub struct JudgingApi<B> {
    db: B,
}

impl<B> JudgingApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> JudgingApi<B>
where B: CompetitionManagement + JudgingManagement
{
    /// Assigns judges to submissions of a competition.
    ///
    /// The competition must be in Closed or Judging status, and every submission must belong to
    /// the competition and still be judgeable (Submitted or UnderReview). Existing (judge,
    /// submission) pairs are skipped, so re-posting the same assignment set is harmless.
    pub async fn assign_judges(
        &self,
        competition_id: i64,
        assignments: Vec<NewJudgeAssignment>,
    ) -> Result<Vec<JudgeAssignment>, JudgingApiError> {
        let competition = self
            .db
            .fetch_competition(competition_id)
            .await?
            .ok_or_else(|| JudgingApiError::NotFound(format!("competition {competition_id}")))?;
        if !matches!(competition.status, CompetitionStatus::Closed | CompetitionStatus::Judging) {
            return Err(JudgingApiError::WrongState {
                subject: "Competition".to_string(),
                required: "Closed or Judging".to_string(),
                actual: competition.status.to_string(),
            });
        }
        for assignment in &assignments {
            let submission = self
                .db
                .fetch_submission(assignment.submission_id)
                .await?
                .ok_or_else(|| JudgingApiError::NotFound(format!("submission {}", assignment.submission_id)))?;
            if submission.competition_id != competition_id {
                return Err(JudgingApiError::NotFound(format!(
                    "submission {} in competition {competition_id}",
                    assignment.submission_id
                )));
            }
            if !matches!(submission.status, SubmissionStatus::Submitted | SubmissionStatus::UnderReview) {
                return Err(JudgingApiError::WrongState {
                    subject: format!("Submission {}", submission.id),
                    required: "Submitted or UnderReview".to_string(),
                    actual: submission.status.to_string(),
                });
            }
        }
        let created = self.db.insert_assignments(&assignments).await?;
        debug!("⚖️️ {} judge assignments recorded for competition {competition_id}", created.len());
        self.db.fetch_assignments_for_competition(competition_id).await.map_err(Into::into)
    }

    /// Records (or replaces) a judge's score for a submission.
    ///
    /// The rubric's criterion key set must match the payload's keys exactly and every score must
    /// lie in [0, 10]. The judge's `overall` is the rubric-weighted average; the sheet average is
    /// the plain mean across judges; and the final score is the blended, 2-decimal-rounded
    /// result. When the scorer is the assigned judge the assignment's `completed_at` is set —
    /// once; later edits never move it.
    pub async fn submit_score(&self, score: ScoreSubmission) -> Result<Submission, JudgingApiError> {
        let submission = self
            .db
            .fetch_submission(score.submission_id)
            .await?
            .ok_or_else(|| JudgingApiError::NotFound(format!("submission {}", score.submission_id)))?;
        if !score.privileged {
            self.db
                .fetch_assignment(score.judge_id, score.submission_id)
                .await?
                .ok_or(JudgingApiError::NotAssigned {
                    judge_id: score.judge_id,
                    submission_id: score.submission_id,
                })?;
        }
        let competition = self
            .db
            .fetch_competition(submission.competition_id)
            .await?
            .ok_or_else(|| JudgingApiError::NotFound(format!("competition {}", submission.competition_id)))?;

        let rubric = &competition.rubric;
        rubric.validate_scores(&score.criteria_scores)?;
        let overall = rubric.weighted_overall(&score.criteria_scores);

        let now = Utc::now();
        let mut sheet = submission.human_scores.clone().unwrap_or_default();
        sheet.upsert(JudgeScore {
            judge_id: score.judge_id,
            judge_name: score.judge_name.clone(),
            criteria_scores: score.criteria_scores.clone(),
            overall,
            feedback: score.feedback.clone(),
            submitted_at: now,
        });
        let mut feedback = submission.judge_feedback.clone();
        upsert_feedback(&mut feedback, FeedbackEntry {
            judge_id: score.judge_id,
            judge_name: score.judge_name.clone(),
            feedback: score.feedback.clone(),
            submitted_at: now,
        });
        let final_score = blended_score(submission.ai_average(), sheet.average);

        let completing_judge = (!score.privileged).then_some(score.judge_id);
        let updated = self
            .db
            .save_scores(score.submission_id, &sheet, &feedback, final_score, completing_judge)
            .await?;
        debug!(
            "⚖️️ Judge {} scored submission {}: overall {overall:.2}, final score now {final_score:.2}",
            score.judge_id, score.submission_id
        );
        Ok(updated)
    }

    /// The operational leaderboard over the standard eligible statuses, with full identities.
    pub async fn leaderboard(&self, competition_id: i64) -> Result<CompetitionLeaderboard, JudgingApiError> {
        self.build_leaderboard(competition_id, &LEADERBOARD_STATUSES, false).await
    }

    /// The public results view: only available once the competition is Complete, and identifying
    /// fields of non-public submissions are redacted.
    pub async fn results(&self, competition_id: i64) -> Result<CompetitionLeaderboard, JudgingApiError> {
        let competition = self
            .db
            .fetch_competition(competition_id)
            .await?
            .ok_or_else(|| JudgingApiError::NotFound(format!("competition {competition_id}")))?;
        if competition.status != CompetitionStatus::Complete {
            return Err(JudgingApiError::WrongState {
                subject: "Competition".to_string(),
                required: "Complete".to_string(),
                actual: competition.status.to_string(),
            });
        }
        self.build_leaderboard(competition_id, &LEADERBOARD_STATUSES, true).await
    }

    /// Ranks the eligible submissions of a competition. The ranking engine itself is pure; this
    /// gathers its inputs and wraps the result with competition-level statistics.
    async fn build_leaderboard(
        &self,
        competition_id: i64,
        statuses: &[SubmissionStatus],
        redact_private: bool,
    ) -> Result<CompetitionLeaderboard, JudgingApiError> {
        let competition = self
            .db
            .fetch_competition(competition_id)
            .await?
            .ok_or_else(|| JudgingApiError::NotFound(format!("competition {competition_id}")))?;
        let submissions = self.db.fetch_submissions_with_status(competition_id, statuses).await?;
        let stats = self.db.judging_stats(competition_id).await?;
        let total_submissions = self.db.count_submissions(competition_id).await?;

        let eligible_submissions = submissions.len();
        let sources: Vec<RankSource> = submissions
            .into_iter()
            .map(|s| {
                let progress = stats.get(&s.id).copied().unwrap_or_default();
                RankSource {
                    submission_id: s.id,
                    user_id: s.user_id,
                    title: s.title,
                    final_score: s.final_score,
                    human_scores_average: s.human_scores.map(|sheet| sheet.average),
                    placement: s.placement,
                    is_public: s.is_public,
                    progress,
                }
            })
            .collect();
        let fully_judged_count = sources.iter().filter(|s| s.progress.is_complete()).count();
        let redact: Vec<i64> = if redact_private {
            sources.iter().filter(|s| !s.is_public).map(|s| s.submission_id).collect()
        } else {
            Vec::new()
        };
        let mut entries = rank(sources);
        for entry in entries.iter_mut() {
            if redact.contains(&entry.submission_id) {
                entry.user_id = None;
            }
        }
        trace!("⚖️️ Leaderboard for competition {competition_id}: {} entries", entries.len());
        Ok(CompetitionLeaderboard {
            competition_id,
            competition_title: competition.title,
            status: competition.status,
            prize_pool: competition.prize_pool,
            prize_structure: competition.prize_structure,
            entries,
            total_submissions,
            eligible_submissions,
            fully_judged_count,
        })
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> std::fmt::Debug for JudgingApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JudgingApi")
    }
}

// The StorageError → JudgingApiError conversion maps missing-row errors onto NotFound so route
// handlers can translate them to 404s without inspecting storage internals.
impl From<StorageError> for JudgingApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::CompetitionNotFound(id) => JudgingApiError::NotFound(format!("competition {id}")),
            StorageError::SubmissionNotFound(id) => JudgingApiError::NotFound(format!("submission {id}")),
            other => JudgingApiError::StorageError(other),
        }
    }
}
