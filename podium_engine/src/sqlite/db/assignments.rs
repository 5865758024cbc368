use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{JudgeAssignment, NewJudgeAssignment},
    ranking::JudgingProgress,
    traits::{JudgingStats, StorageError},
};

/// Inserts the assignment, returning `None` if the (judge, submission) pair already exists. The
/// unique constraint makes the call idempotent.
pub async fn idempotent_insert(
    assignment: &NewJudgeAssignment,
    conn: &mut SqliteConnection,
) -> Result<Option<JudgeAssignment>, StorageError> {
    let inserted: Option<JudgeAssignment> = sqlx::query_as(
        r#"
            INSERT INTO judge_assignments (judge_id, submission_id, assigned_by)
            VALUES ($1, $2, $3)
            ON CONFLICT (judge_id, submission_id) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(assignment.judge_id)
    .bind(assignment.submission_id)
    .bind(assignment.assigned_by)
    .fetch_optional(conn)
    .await?;
    if inserted.is_none() {
        trace!(
            "🗃️ Judge {} is already assigned to submission {}; skipping",
            assignment.judge_id,
            assignment.submission_id
        );
    }
    Ok(inserted)
}

pub async fn fetch_assignment(
    judge_id: i64,
    submission_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<JudgeAssignment>, StorageError> {
    let assignment =
        sqlx::query_as("SELECT * FROM judge_assignments WHERE judge_id = $1 AND submission_id = $2")
            .bind(judge_id)
            .bind(submission_id)
            .fetch_optional(conn)
            .await?;
    Ok(assignment)
}

pub async fn fetch_for_submission(
    submission_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<JudgeAssignment>, StorageError> {
    let assignments =
        sqlx::query_as("SELECT * FROM judge_assignments WHERE submission_id = $1 ORDER BY assigned_at ASC")
            .bind(submission_id)
            .fetch_all(conn)
            .await?;
    Ok(assignments)
}

pub async fn fetch_for_competition(
    competition_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<JudgeAssignment>, StorageError> {
    let assignments = sqlx::query_as(
        r#"
        SELECT judge_assignments.*
        FROM judge_assignments JOIN submissions ON judge_assignments.submission_id = submissions.id
        WHERE submissions.competition_id = $1
        ORDER BY judge_assignments.submission_id, judge_assignments.assigned_at
        "#,
    )
    .bind(competition_id)
    .fetch_all(conn)
    .await?;
    Ok(assignments)
}

/// Sets `completed_at` on the judge's assignment — but only the first time. Subsequent score
/// edits leave the original completion timestamp in place.
pub(crate) async fn complete_once(
    judge_id: i64,
    submission_id: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, StorageError> {
    let result = sqlx::query(
        r#"
        UPDATE judge_assignments
        SET completed_at = CURRENT_TIMESTAMP
        WHERE judge_id = $1 AND submission_id = $2 AND completed_at IS NULL
        "#,
    )
    .bind(judge_id)
    .bind(submission_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Assigned/completed counts per submission for the whole competition.
pub async fn judging_stats(competition_id: i64, conn: &mut SqliteConnection) -> Result<JudgingStats, StorageError> {
    let rows: Vec<(i64, i64, i64)> = sqlx::query_as(
        r#"
        SELECT
            judge_assignments.submission_id,
            COUNT(*) AS assigned,
            COUNT(judge_assignments.completed_at) AS completed
        FROM judge_assignments JOIN submissions ON judge_assignments.submission_id = submissions.id
        WHERE submissions.competition_id = $1
        GROUP BY judge_assignments.submission_id
        "#,
    )
    .bind(competition_id)
    .fetch_all(conn)
    .await?;
    #[allow(clippy::cast_sign_loss)]
    let stats = rows
        .into_iter()
        .map(|(submission_id, assigned, completed)| {
            (submission_id, JudgingProgress::new(assigned as usize, completed as usize))
        })
        .collect();
    Ok(stats)
}
