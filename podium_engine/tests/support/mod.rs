//! Shared fixtures for the engine integration tests. Each test gets its own throwaway SQLite
//! database under `../data/`.
#![allow(dead_code)]

use mockall::mock;
use podium_common::Cents;
use podium_engine::{
    db_types::{
        Competition,
        CompetitionStatus,
        NewCompetition,
        NewSubmission,
        PayoutAccount,
        PrizeStructure,
        Submission,
        SubmissionStatus,
    },
    scoring::Rubric,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{
        ChargeIntent,
        ChargeMetadata,
        LedgerBalance,
        LedgerError,
        MoneyLedger,
        TransferRef,
        TransferRequest,
    },
    CompetitionManagement,
    SettlementDatabase,
    SqliteDatabase,
};

mock! {
    pub Ledger {}
    impl MoneyLedger for Ledger {
        async fn create_charge(&self, amount: Cents, currency: &str, metadata: ChargeMetadata) -> Result<ChargeIntent, LedgerError>;
        async fn get_charge(&self, charge_id: &str) -> Result<ChargeIntent, LedgerError>;
        async fn create_transfer(&self, request: TransferRequest) -> Result<TransferRef, LedgerError>;
        async fn get_balance(&self) -> Result<LedgerBalance, LedgerError>;
    }
}

pub async fn new_test_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

/// A competition with a $100 entry fee, 10% platform fee, a two-place prize structure and a
/// weighted two-criterion rubric.
pub async fn seed_competition(db: &SqliteDatabase, status: CompetitionStatus) -> Competition {
    let new = NewCompetition::new("Pitch Battle", Cents::from_dollars(100), 1)
        .with_platform_fee(10.0)
        .with_max_entries(25)
        .with_prize_structure(PrizeStructure::from([("first", 0.5), ("second", 0.3)]))
        .with_rubric(Rubric::from([("innovation", 2.0), ("feasibility", 1.0)]));
    let competition = db.insert_competition(new).await.expect("Error creating competition");
    if status == CompetitionStatus::Draft {
        competition
    } else {
        db.update_competition_status(competition.id, status).await.expect("Error setting competition status")
    }
}

pub async fn seed_submission(
    db: &SqliteDatabase,
    competition_id: i64,
    user_id: i64,
    status: SubmissionStatus,
) -> Submission {
    let new = NewSubmission::new(competition_id, user_id, &format!("Entry by founder {user_id}"));
    let submission = db.insert_submission(new).await.expect("Error creating submission");
    if status == SubmissionStatus::Draft {
        submission
    } else {
        db.update_submission_status(submission.id, status).await.expect("Error setting submission status")
    }
}

pub async fn set_prize_pool(db: &SqliteDatabase, competition_id: i64, pool: Cents) {
    sqlx::query("UPDATE competitions SET prize_pool = $1 WHERE id = $2")
        .bind(pool.value())
        .bind(competition_id)
        .execute(db.pool())
        .await
        .expect("Error setting prize pool");
}

pub async fn seed_payout_account(db: &SqliteDatabase, user_id: i64, account: Option<&str>, onboarded: bool) {
    db.upsert_payout_account(PayoutAccount {
        user_id,
        provider_account_id: account.map(|s| s.to_string()),
        onboarding_complete: onboarded,
        payouts_enabled: onboarded,
    })
    .await
    .expect("Error seeding payout account");
}
