use podium_common::Cents;
use podium_engine::{
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
    SqliteDatabase,
};

pub async fn test_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating test database")
}

/// A ledger double for endpoint tests that never expect a processor call. Every call fails, so a
/// test that accidentally reaches the processor shows up as an explicit error.
#[derive(Clone)]
pub struct NullLedger;

impl MoneyLedger for NullLedger {
    async fn create_charge(
        &self,
        _amount: Cents,
        _currency: &str,
        _metadata: ChargeMetadata,
    ) -> Result<ChargeIntent, LedgerError> {
        Err(LedgerError::Connection("NullLedger is not wired to a processor".to_string()))
    }

    async fn get_charge(&self, _charge_id: &str) -> Result<ChargeIntent, LedgerError> {
        Err(LedgerError::Connection("NullLedger is not wired to a processor".to_string()))
    }

    async fn create_transfer(&self, _request: TransferRequest) -> Result<TransferRef, LedgerError> {
        Err(LedgerError::Connection("NullLedger is not wired to a processor".to_string()))
    }

    async fn get_balance(&self) -> Result<LedgerBalance, LedgerError> {
        Err(LedgerError::Connection("NullLedger is not wired to a processor".to_string()))
    }
}
