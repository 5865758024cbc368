use podium_common::Cents;
use serde::Serialize;

use crate::{
    db_types::{CompetitionStatus, PaymentStatus, PrizeStructure, Submission, SubmissionStatus},
    ranking::RankedEntry,
    winners::PlannedWinner,
};

//--------------------------------------    Leaderboards      --------------------------------------------------------
#[derive(Debug, Clone, Serialize)]
pub struct CompetitionLeaderboard {
    pub competition_id: i64,
    pub competition_title: String,
    pub status: CompetitionStatus,
    pub prize_pool: Cents,
    pub prize_structure: PrizeStructure,
    pub entries: Vec<RankedEntry>,
    pub total_submissions: i64,
    pub eligible_submissions: usize,
    pub fully_judged_count: usize,
}

//--------------------------------------  Winner selection    --------------------------------------------------------
#[derive(Debug, Clone, Serialize)]
pub struct WinnerSelectionOutcome {
    pub competition_id: i64,
    pub status: CompetitionStatus,
    pub winners: Vec<PlannedWinner>,
}

//--------------------------------------   Entry-fee path     --------------------------------------------------------
/// What came back from asking for an entry-fee charge. The three variants are the three legs of
/// the idempotency-by-lookup protocol: the charge had already settled, a live charge is still
/// awaiting the payer, or a fresh charge was created.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EntryChargeOutcome {
    /// The processor reported the existing charge as settled; the success effects have been
    /// applied and no new charge was created.
    AlreadyPaid { submission_id: i64, submission_status: SubmissionStatus },
    /// An existing charge is still open on the processor side; complete it with this token.
    AwaitingPayment { charge_id: String, client_secret: String },
    /// A new charge was created; complete it with this token.
    NewCharge { charge_id: String, client_secret: String },
}

/// Result of a client-initiated status poll against the processor.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentPollOutcome {
    pub submission_status: SubmissionStatus,
    pub payment_status: PaymentStatus,
    pub message: String,
}

//--------------------------------------    Prize payouts     --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutClassification {
    Success,
    PendingConnectAccount,
    PendingConnectOnboarding,
    AlreadyPaid,
    Error,
}

impl std::fmt::Display for PayoutClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayoutClassification::Success => write!(f, "success"),
            PayoutClassification::PendingConnectAccount => write!(f, "pending_connect_account"),
            PayoutClassification::PendingConnectOnboarding => write!(f, "pending_connect_onboarding"),
            PayoutClassification::AlreadyPaid => write!(f, "already_paid"),
            PayoutClassification::Error => write!(f, "error"),
        }
    }
}

/// The independently-classified outcome for one winner in a payout batch.
#[derive(Debug, Clone, Serialize)]
pub struct PayoutResult {
    pub submission_id: i64,
    pub user_id: i64,
    pub placement: String,
    pub prize_amount: Cents,
    pub transfer_id: Option<String>,
    pub status: PayoutClassification,
    pub message: String,
}

/// The result of one invocation of the payout batch. `total_distributed` counts only transfers
/// initiated by *this* invocation, while `total_expected` is every winner's theoretical prize —
/// the two deliberately diverge because the batch is resumable across invocations.
#[derive(Debug, Clone, Serialize)]
pub struct PrizeDistribution {
    pub competition_id: i64,
    pub competition_title: String,
    pub successful_payouts: Vec<PayoutResult>,
    pub pending_bank_info: Vec<PayoutResult>,
    pub failed_payouts: Vec<PayoutResult>,
    pub already_paid: Vec<PayoutResult>,
    pub total_distributed: Cents,
    pub total_expected: Cents,
    pub summary: String,
}

impl PrizeDistribution {
    pub fn build_summary(&mut self) {
        let mut parts = Vec::new();
        if !self.successful_payouts.is_empty() {
            parts.push(format!("{} payouts initiated successfully", self.successful_payouts.len()));
        }
        if !self.pending_bank_info.is_empty() {
            parts.push(format!("{} winners need payout account setup", self.pending_bank_info.len()));
        }
        if !self.failed_payouts.is_empty() {
            parts.push(format!("{} payouts failed", self.failed_payouts.len()));
        }
        if !self.already_paid.is_empty() {
            parts.push(format!("{} already paid", self.already_paid.len()));
        }
        self.summary =
            if parts.is_empty() { "No payouts processed".to_string() } else { parts.join(". ") };
    }
}

//--------------------------------------   helper views       --------------------------------------------------------
/// A submission as returned from scoring operations, with the caller's own score surfaced.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredSubmission {
    pub submission_id: i64,
    pub status: SubmissionStatus,
    pub final_score: Option<f64>,
    pub human_scores_average: Option<f64>,
    pub judge_count: usize,
    pub your_overall: Option<f64>,
}

impl ScoredSubmission {
    pub fn from_submission(submission: &Submission, judge_id: Option<i64>) -> Self {
        let sheet = submission.human_scores.as_ref();
        Self {
            submission_id: submission.id,
            status: submission.status,
            final_score: submission.final_score,
            human_scores_average: sheet.map(|s| s.average),
            judge_count: sheet.map(|s| s.judges.len()).unwrap_or(0),
            your_overall: judge_id
                .and_then(|id| sheet.and_then(|s| s.score_for(id)))
                .map(|entry| entry.overall),
        }
    }
}
