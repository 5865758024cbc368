use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use podium_common::Cents;
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::scoring::{FeedbackEntry, ScoreSheet};

#[derive(Debug, Clone, Error)]
#[error("Invalid value for {0}: {1}")]
pub struct ConversionError(pub &'static str, pub String);

//--------------------------------------        Role          --------------------------------------------------------
/// Roles assigned by the (external) auth layer. The engine only consults these for privileged
/// overrides; the server enforces them per-route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Founder,
    Judge,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Founder => write!(f, "founder"),
            Role::Judge => write!(f, "judge"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "founder" => Ok(Self::Founder),
            "judge" => Ok(Self::Judge),
            "admin" => Ok(Self::Admin),
            s => Err(ConversionError("role", s.to_string())),
        }
    }
}

//--------------------------------------  CompetitionStatus   --------------------------------------------------------
/// The competition lifecycle. Transitions only ever move forward, one state at a time:
/// Draft → Upcoming → Active → Closed → Judging → Complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum CompetitionStatus {
    Draft,
    Upcoming,
    Active,
    Closed,
    Judging,
    Complete,
}

impl Display for CompetitionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompetitionStatus::Draft => write!(f, "Draft"),
            CompetitionStatus::Upcoming => write!(f, "Upcoming"),
            CompetitionStatus::Active => write!(f, "Active"),
            CompetitionStatus::Closed => write!(f, "Closed"),
            CompetitionStatus::Judging => write!(f, "Judging"),
            CompetitionStatus::Complete => write!(f, "Complete"),
        }
    }
}

impl FromStr for CompetitionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(Self::Draft),
            "Upcoming" => Ok(Self::Upcoming),
            "Active" => Ok(Self::Active),
            "Closed" => Ok(Self::Closed),
            "Judging" => Ok(Self::Judging),
            "Complete" => Ok(Self::Complete),
            s => Err(ConversionError("competition status", s.to_string())),
        }
    }
}

impl From<String> for CompetitionStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid competition status: {value}. But this conversion cannot fail. Defaulting to Draft");
            CompetitionStatus::Draft
        })
    }
}

//--------------------------------------   SubmissionStatus   --------------------------------------------------------
/// A submission's lifecycle. `Draft` and `PendingPayment` are mutable by the owner; every later
/// state is immutable to the owner. `Submitted` is only ever entered by the settlement reconciler
/// once the entry fee has been confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum SubmissionStatus {
    Draft,
    PendingPayment,
    Submitted,
    UnderReview,
    Winner,
    NotSelected,
    Rejected,
}

impl Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionStatus::Draft => write!(f, "Draft"),
            SubmissionStatus::PendingPayment => write!(f, "PendingPayment"),
            SubmissionStatus::Submitted => write!(f, "Submitted"),
            SubmissionStatus::UnderReview => write!(f, "UnderReview"),
            SubmissionStatus::Winner => write!(f, "Winner"),
            SubmissionStatus::NotSelected => write!(f, "NotSelected"),
            SubmissionStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

impl FromStr for SubmissionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(Self::Draft),
            "PendingPayment" => Ok(Self::PendingPayment),
            "Submitted" => Ok(Self::Submitted),
            "UnderReview" => Ok(Self::UnderReview),
            "Winner" => Ok(Self::Winner),
            "NotSelected" => Ok(Self::NotSelected),
            "Rejected" => Ok(Self::Rejected),
            s => Err(ConversionError("submission status", s.to_string())),
        }
    }
}

impl From<String> for SubmissionStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid submission status: {value}. But this conversion cannot fail. Defaulting to Draft");
            SubmissionStatus::Draft
        })
    }
}

impl SubmissionStatus {
    /// The owner may still edit or delete the submission in these states.
    pub fn is_owner_mutable(&self) -> bool {
        matches!(self, SubmissionStatus::Draft | SubmissionStatus::PendingPayment)
    }
}

//--------------------------------------     PaymentType      --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentType {
    EntryFee,
    PrizePayout,
    Refund,
}

impl Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentType::EntryFee => write!(f, "EntryFee"),
            PaymentType::PrizePayout => write!(f, "PrizePayout"),
            PaymentType::Refund => write!(f, "Refund"),
        }
    }
}

impl From<String> for PaymentType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "EntryFee" => Self::EntryFee,
            "PrizePayout" => Self::PrizePayout,
            "Refund" => Self::Refund,
            _ => {
                error!("Invalid payment type: {value}. But this conversion cannot fail. Defaulting to EntryFee");
                Self::EntryFee
            },
        }
    }
}

//--------------------------------------    PaymentStatus     --------------------------------------------------------
/// Payments are created `Pending` at the moment an external charge or transfer is requested, and
/// only the settlement reconciler moves them to a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Completed => write!(f, "Completed"),
            PaymentStatus::Failed => write!(f, "Failed"),
            PaymentStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Pending" => Self::Pending,
            "Completed" => Self::Completed,
            "Failed" => Self::Failed,
            "Refunded" => Self::Refunded,
            _ => {
                error!("Invalid payment status: {value}. But this conversion cannot fail. Defaulting to Pending");
                Self::Pending
            },
        }
    }
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

//--------------------------------------   PrizeStructure     --------------------------------------------------------
/// Maps a place label (e.g. "first") to the fraction of the prize pool paid out for that place.
/// Fractions are applied independently per place and do not need to sum to 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrizeStructure(BTreeMap<String, f64>);

impl PrizeStructure {
    pub fn new(places: BTreeMap<String, f64>) -> Self {
        Self(places)
    }

    pub fn fraction(&self, place: &str) -> Option<f64> {
        self.0.get(place).copied()
    }

    pub fn places(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn contains(&self, place: &str) -> bool {
        self.0.contains_key(place)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<const N: usize> From<[(&str, f64); N]> for PrizeStructure {
    fn from(places: [(&str, f64); N]) -> Self {
        Self(places.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

//--------------------------------------      Attachment      --------------------------------------------------------
/// A typed artifact attached to a submission. The settlement core only ever looks at the kind
/// (e.g. does a "video" exist); the content itself lives in object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: String,
    pub url: String,
}

//--------------------------------------     Competition      --------------------------------------------------------
#[derive(Debug, Clone)]
pub struct Competition {
    pub id: i64,
    pub title: String,
    pub status: CompetitionStatus,
    pub entry_fee: Cents,
    /// Platform cut of each entry fee, as a percentage in [0, 100].
    pub platform_fee_percentage: f64,
    /// Monotonically non-decreasing. Starts at zero and only grows through confirmed entry fees.
    pub prize_pool: Cents,
    pub max_entries: i64,
    pub current_entries: i64,
    pub prize_structure: PrizeStructure,
    pub rubric: crate::scoring::Rubric,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Competition {
    /// The amount added to the prize pool when one entry fee settles:
    /// `entry_fee × (1 − platform_fee_percentage/100)`, rounded to the nearest cent.
    pub fn pool_contribution(&self) -> Cents {
        self.entry_fee.mul_f64(1.0 - self.platform_fee_percentage / 100.0)
    }

    pub fn is_full(&self) -> bool {
        self.current_entries >= self.max_entries
    }

    /// The payout owed for the given place label, or `None` if the place is not in the prize
    /// structure.
    pub fn prize_for(&self, place: &str) -> Option<Cents> {
        self.prize_structure.fraction(place).map(|f| self.prize_pool.mul_f64(f))
    }
}

//--------------------------------------    NewCompetition    --------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewCompetition {
    pub title: String,
    pub entry_fee: Cents,
    pub platform_fee_percentage: f64,
    pub max_entries: i64,
    pub prize_structure: PrizeStructure,
    pub rubric: crate::scoring::Rubric,
    pub created_by: i64,
}

impl NewCompetition {
    pub fn new(title: &str, entry_fee: Cents, created_by: i64) -> Self {
        Self {
            title: title.to_string(),
            entry_fee,
            platform_fee_percentage: 0.0,
            max_entries: 100,
            prize_structure: PrizeStructure::default(),
            rubric: crate::scoring::Rubric::default(),
            created_by,
        }
    }

    pub fn with_platform_fee(mut self, percentage: f64) -> Self {
        self.platform_fee_percentage = percentage;
        self
    }

    pub fn with_max_entries(mut self, max_entries: i64) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_prize_structure(mut self, structure: PrizeStructure) -> Self {
        self.prize_structure = structure;
        self
    }

    pub fn with_rubric(mut self, rubric: crate::scoring::Rubric) -> Self {
        self.rubric = rubric;
        self
    }
}

//--------------------------------------      Submission      --------------------------------------------------------
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: i64,
    pub competition_id: i64,
    pub user_id: i64,
    pub title: String,
    pub status: SubmissionStatus,
    pub attachments: Vec<Attachment>,
    /// Scores contributed by the (currently zero-weighted) automated scoring channel.
    pub ai_scores: Option<ScoreSheet>,
    pub human_scores: Option<ScoreSheet>,
    pub judge_feedback: Vec<FeedbackEntry>,
    /// Blended scalar score. Never set directly; always recomputed from the score sheets.
    pub final_score: Option<f64>,
    /// Place label assigned by winner selection, e.g. "first".
    pub placement: Option<String>,
    pub is_public: bool,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    pub fn human_average(&self) -> Option<f64> {
        self.human_scores.as_ref().map(|s| s.average)
    }

    pub fn ai_average(&self) -> f64 {
        self.ai_scores.as_ref().map(|s| s.average).unwrap_or(0.0)
    }
}

//--------------------------------------    NewSubmission     --------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub competition_id: i64,
    pub user_id: i64,
    pub title: String,
    pub attachments: Vec<Attachment>,
    pub is_public: bool,
}

impl NewSubmission {
    pub fn new(competition_id: i64, user_id: i64, title: &str) -> Self {
        Self { competition_id, user_id, title: title.to_string(), attachments: Vec::new(), is_public: false }
    }
}

//--------------------------------------       Payment        --------------------------------------------------------
/// A single charge or transfer attempt against the external processor, with its last-known
/// status. Payment rows are append-mostly: they are never deleted, only transitioned.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Payment {
    pub id: i64,
    pub user_id: i64,
    pub competition_id: i64,
    pub submission_id: Option<i64>,
    pub amount: Cents,
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    /// External charge-intent reference, set once the charge was created on the processor.
    pub processor_charge_id: Option<String>,
    /// External transfer reference, set once the transfer was created on the processor.
    pub processor_transfer_id: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      NewPayment      --------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub user_id: i64,
    pub competition_id: i64,
    pub submission_id: Option<i64>,
    pub amount: Cents,
    pub payment_type: PaymentType,
    pub processor_charge_id: Option<String>,
    pub processor_transfer_id: Option<String>,
}

impl NewPayment {
    pub fn entry_fee(user_id: i64, competition_id: i64, submission_id: i64, amount: Cents, charge_id: &str) -> Self {
        Self {
            user_id,
            competition_id,
            submission_id: Some(submission_id),
            amount,
            payment_type: PaymentType::EntryFee,
            processor_charge_id: Some(charge_id.to_string()),
            processor_transfer_id: None,
        }
    }

    pub fn prize_payout(
        user_id: i64,
        competition_id: i64,
        submission_id: i64,
        amount: Cents,
        transfer_id: &str,
    ) -> Self {
        Self {
            user_id,
            competition_id,
            submission_id: Some(submission_id),
            amount,
            payment_type: PaymentType::PrizePayout,
            processor_charge_id: None,
            processor_transfer_id: Some(transfer_id.to_string()),
        }
    }
}

//--------------------------------------   JudgeAssignment    --------------------------------------------------------
/// A unique (judge, submission) pairing. `completed_at` is null until the judge has recorded a
/// score, and is set exactly once.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct JudgeAssignment {
    pub id: i64,
    pub judge_id: i64,
    pub submission_id: i64,
    pub assigned_by: i64,
    pub assigned_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewJudgeAssignment {
    pub judge_id: i64,
    pub submission_id: i64,
    pub assigned_by: i64,
}

impl NewJudgeAssignment {
    pub fn new(judge_id: i64, submission_id: i64, assigned_by: i64) -> Self {
        Self { judge_id, submission_id, assigned_by }
    }
}

//--------------------------------------    PayoutAccount     --------------------------------------------------------
/// The payout-capability record for a user, mirroring the state of their account on the external
/// processor. Account creation and onboarding happen outside this core; the settlement reconciler
/// only reads these flags to decide whether a transfer may be attempted.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PayoutAccount {
    pub user_id: i64,
    pub provider_account_id: Option<String>,
    pub onboarding_complete: bool,
    pub payouts_enabled: bool,
}

impl PayoutAccount {
    pub fn can_receive_transfers(&self) -> bool {
        self.provider_account_id.is_some() && self.onboarding_complete && self.payouts_enabled
    }
}
