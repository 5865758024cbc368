//! Row decoding for entities carrying semi-structured JSON columns.
//!
//! The score sheets, rubric, prize structure, feedback and attachment columns are stored as JSON
//! text. They are parsed into their typed forms here, at the storage boundary, so the rest of the
//! engine never has to reason about loosely-shaped maps.

use sqlx::{sqlite::SqliteRow, FromRow, Row};

use crate::{
    db_types::{Attachment, Competition, PrizeStructure, Submission},
    scoring::{FeedbackEntry, Rubric, ScoreSheet},
};

fn decode_json<T: serde::de::DeserializeOwned>(column: &'static str, raw: &str) -> Result<T, sqlx::Error> {
    serde_json::from_str(raw).map_err(|e| sqlx::Error::ColumnDecode { index: column.to_string(), source: Box::new(e) })
}

fn decode_json_opt<T: serde::de::DeserializeOwned>(
    column: &'static str,
    raw: Option<String>,
) -> Result<Option<T>, sqlx::Error> {
    raw.map(|s| decode_json(column, &s)).transpose()
}

impl FromRow<'_, SqliteRow> for Competition {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let rubric_raw: String = row.try_get("rubric")?;
        let rubric: Rubric = decode_json("rubric", &rubric_raw)?;
        let prize_raw: String = row.try_get("prize_structure")?;
        let prize_structure: PrizeStructure = decode_json("prize_structure", &prize_raw)?;
        Ok(Competition {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            status: row.try_get("status")?,
            entry_fee: row.try_get("entry_fee")?,
            platform_fee_percentage: row.try_get("platform_fee_percentage")?,
            prize_pool: row.try_get("prize_pool")?,
            max_entries: row.try_get("max_entries")?,
            current_entries: row.try_get("current_entries")?,
            prize_structure,
            rubric,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl FromRow<'_, SqliteRow> for Submission {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let attachments_raw: String = row.try_get("attachments")?;
        let attachments: Vec<Attachment> = decode_json("attachments", &attachments_raw)?;
        let ai_scores: Option<ScoreSheet> = decode_json_opt("ai_scores", row.try_get("ai_scores")?)?;
        let human_scores: Option<ScoreSheet> = decode_json_opt("human_scores", row.try_get("human_scores")?)?;
        let feedback_raw: String = row.try_get("judge_feedback")?;
        let judge_feedback: Vec<FeedbackEntry> = decode_json("judge_feedback", &feedback_raw)?;
        Ok(Submission {
            id: row.try_get("id")?,
            competition_id: row.try_get("competition_id")?,
            user_id: row.try_get("user_id")?,
            title: row.try_get("title")?,
            status: row.try_get("status")?,
            attachments,
            ai_scores,
            human_scores,
            judge_feedback,
            final_score: row.try_get("final_score")?,
            placement: row.try_get("placement")?,
            is_public: row.try_get("is_public")?,
            submitted_at: row.try_get("submitted_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
