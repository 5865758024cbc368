use log::debug;
use podium_common::Cents;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Competition, CompetitionStatus, NewCompetition},
    traits::StorageError,
};

pub async fn insert_competition(
    competition: NewCompetition,
    conn: &mut SqliteConnection,
) -> Result<Competition, StorageError> {
    let rubric = serde_json::to_string(&competition.rubric)?;
    let prize_structure = serde_json::to_string(&competition.prize_structure)?;
    let result = sqlx::query_as(
        r#"
            INSERT INTO competitions (
                title,
                entry_fee,
                platform_fee_percentage,
                max_entries,
                prize_structure,
                rubric,
                created_by
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(competition.title)
    .bind(competition.entry_fee.value())
    .bind(competition.platform_fee_percentage)
    .bind(competition.max_entries)
    .bind(prize_structure)
    .bind(rubric)
    .bind(competition.created_by)
    .fetch_one(conn)
    .await?;
    Ok(result)
}

pub async fn fetch_competition(
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Competition>, StorageError> {
    let competition =
        sqlx::query_as("SELECT * FROM competitions WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(competition)
}

pub async fn update_status(
    id: i64,
    status: CompetitionStatus,
    conn: &mut SqliteConnection,
) -> Result<Competition, StorageError> {
    let result: Option<Competition> = sqlx::query_as(
        "UPDATE competitions SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(status.to_string())
    .bind(id)
    .fetch_optional(conn)
    .await?;
    result.ok_or(StorageError::CompetitionNotFound(id))
}

pub async fn delete_competition(id: i64, conn: &mut SqliteConnection) -> Result<(), StorageError> {
    let result = sqlx::query("DELETE FROM competitions WHERE id = $1").bind(id).execute(conn).await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::CompetitionNotFound(id));
    }
    debug!("🗃️ Competition {id} deleted (cascading to its submissions and payments)");
    Ok(())
}

/// Applies the competition-side success effects of one settled entry fee: bumps the entry count
/// and credits the pool. Must run inside the same transaction as the payment transition.
pub(crate) async fn apply_entry_credit(
    id: i64,
    contribution: Cents,
    conn: &mut SqliteConnection,
) -> Result<(), StorageError> {
    let result = sqlx::query(
        r#"
        UPDATE competitions
        SET current_entries = current_entries + 1,
            prize_pool = prize_pool + $1,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $2
        "#,
    )
    .bind(contribution.value())
    .bind(id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::CompetitionNotFound(id));
    }
    Ok(())
}
