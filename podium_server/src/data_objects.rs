use std::collections::BTreeMap;

use podium_engine::{db_types::CompetitionStatus, winners::WinnerPick};
use serde::{Deserialize, Serialize};

/// Body of webhook acknowledgments. Webhook responses carry their outcome in this envelope
/// rather than the HTTP status, because the processor treats any non-2xx as "please redeliver".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Into<String>>(message: S) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn failure<S: Into<String>>(message: S) -> Self {
        Self { success: false, message: message.into() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransitionRequest {
    pub status: CompetitionStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JudgeAssignmentEntry {
    pub judge_id: i64,
    pub submission_ids: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkJudgeAssignmentRequest {
    pub assignments: Vec<JudgeAssignmentEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JudgeScoreSubmit {
    pub criteria_scores: BTreeMap<String, f64>,
    #[serde(default)]
    pub feedback: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectWinnersRequest {
    pub winners: Vec<WinnerPick>,
}
