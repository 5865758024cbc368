use sqlx::SqliteConnection;

use crate::{db_types::PayoutAccount, traits::StorageError};

pub async fn fetch_payout_account(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<PayoutAccount>, StorageError> {
    let account = sqlx::query_as("SELECT * FROM payout_accounts WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(account)
}

pub async fn upsert_payout_account(
    account: &PayoutAccount,
    conn: &mut SqliteConnection,
) -> Result<(), StorageError> {
    sqlx::query(
        r#"
        INSERT INTO payout_accounts (user_id, provider_account_id, onboarding_complete, payouts_enabled)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id) DO UPDATE SET
            provider_account_id = excluded.provider_account_id,
            onboarding_complete = excluded.onboarding_complete,
            payouts_enabled = excluded.payouts_enabled,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(account.user_id)
    .bind(&account.provider_account_id)
    .bind(account.onboarding_complete)
    .bind(account.payouts_enabled)
    .execute(conn)
    .await?;
    Ok(())
}
