use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewSubmission, Submission, SubmissionStatus},
    scoring::{FeedbackEntry, ScoreSheet},
    traits::StorageError,
};

pub async fn insert_submission(
    submission: NewSubmission,
    conn: &mut SqliteConnection,
) -> Result<Submission, StorageError> {
    let attachments = serde_json::to_string(&submission.attachments)?;
    let result = sqlx::query_as(
        r#"
            INSERT INTO submissions (competition_id, user_id, title, attachments, is_public)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(submission.competition_id)
    .bind(submission.user_id)
    .bind(submission.title)
    .bind(attachments)
    .bind(submission.is_public)
    .fetch_one(conn)
    .await?;
    Ok(result)
}

pub async fn fetch_submission(id: i64, conn: &mut SqliteConnection) -> Result<Option<Submission>, StorageError> {
    let submission =
        sqlx::query_as("SELECT * FROM submissions WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(submission)
}

/// Fetches the competition's submissions whose status is in the given set, ordered by id.
pub async fn fetch_with_status(
    competition_id: i64,
    statuses: &[SubmissionStatus],
    conn: &mut SqliteConnection,
) -> Result<Vec<Submission>, StorageError> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new("SELECT * FROM submissions WHERE competition_id = ");
    builder.push_bind(competition_id);
    builder.push(" AND status IN (");
    let mut in_clause = builder.separated(", ");
    for status in statuses {
        in_clause.push_bind(status.to_string());
    }
    builder.push(") ORDER BY id ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let submissions = builder.build_query_as::<Submission>().fetch_all(conn).await?;
    Ok(submissions)
}

pub async fn count_for_competition(competition_id: i64, conn: &mut SqliteConnection) -> Result<i64, StorageError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM submissions WHERE competition_id = $1")
        .bind(competition_id)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

pub async fn count_with_status(
    competition_id: i64,
    status: SubmissionStatus,
    conn: &mut SqliteConnection,
) -> Result<i64, StorageError> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM submissions WHERE competition_id = $1 AND status = $2")
            .bind(competition_id)
            .bind(status.to_string())
            .fetch_one(conn)
            .await?;
    Ok(count)
}

pub async fn update_status(
    id: i64,
    status: SubmissionStatus,
    conn: &mut SqliteConnection,
) -> Result<Submission, StorageError> {
    let result: Option<Submission> = sqlx::query_as(
        "UPDATE submissions SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(status.to_string())
    .bind(id)
    .fetch_optional(conn)
    .await?;
    result.ok_or(StorageError::SubmissionNotFound(id))
}

/// Persists the recomputed score aggregates for a submission. The final score is always written
/// together with the sheets; it is never set on its own.
pub(crate) async fn save_scores(
    id: i64,
    human_scores: &ScoreSheet,
    judge_feedback: &[FeedbackEntry],
    final_score: f64,
    conn: &mut SqliteConnection,
) -> Result<Submission, StorageError> {
    let scores_json = serde_json::to_string(human_scores)?;
    let feedback_json = serde_json::to_string(judge_feedback)?;
    let result: Option<Submission> = sqlx::query_as(
        r#"
        UPDATE submissions
        SET human_scores = $1,
            judge_feedback = $2,
            final_score = $3,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(scores_json)
    .bind(feedback_json)
    .bind(final_score)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    result.ok_or(StorageError::SubmissionNotFound(id))
}

/// Moves the submission to Submitted, stamping `submitted_at` only if it has not been set before.
pub(crate) async fn mark_submitted(id: i64, conn: &mut SqliteConnection) -> Result<Submission, StorageError> {
    let result: Option<Submission> = sqlx::query_as(
        r#"
        UPDATE submissions
        SET status = 'Submitted',
            submitted_at = COALESCE(submitted_at, CURRENT_TIMESTAMP),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    result.ok_or(StorageError::SubmissionNotFound(id))
}

pub(crate) async fn set_winner(id: i64, place: &str, conn: &mut SqliteConnection) -> Result<(), StorageError> {
    let result = sqlx::query(
        "UPDATE submissions SET status = 'Winner', placement = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2",
    )
    .bind(place)
    .bind(id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::SubmissionNotFound(id));
    }
    Ok(())
}

/// Moves every remaining eligible (Submitted/UnderReview) submission of the competition to
/// NotSelected. The winners must already have been transitioned.
pub(crate) async fn mark_not_selected(
    competition_id: i64,
    conn: &mut SqliteConnection,
) -> Result<u64, StorageError> {
    let result = sqlx::query(
        r#"
        UPDATE submissions
        SET status = 'NotSelected', updated_at = CURRENT_TIMESTAMP
        WHERE competition_id = $1 AND status IN ('Submitted', 'UnderReview')
        "#,
    )
    .bind(competition_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
