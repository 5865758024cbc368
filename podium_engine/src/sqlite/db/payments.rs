use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPayment, Payment, PaymentStatus},
    traits::StorageError,
};

pub async fn insert_payment(payment: NewPayment, conn: &mut SqliteConnection) -> Result<Payment, StorageError> {
    let result: Payment = sqlx::query_as(
        r#"
            INSERT INTO payments (
                user_id,
                competition_id,
                submission_id,
                amount,
                payment_type,
                status,
                processor_charge_id,
                processor_transfer_id
            ) VALUES ($1, $2, $3, $4, $5, 'Pending', $6, $7)
            RETURNING *;
        "#,
    )
    .bind(payment.user_id)
    .bind(payment.competition_id)
    .bind(payment.submission_id)
    .bind(payment.amount.value())
    .bind(payment.payment_type.to_string())
    .bind(payment.processor_charge_id)
    .bind(payment.processor_transfer_id)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ {} payment {} recorded as Pending", result.payment_type, result.id);
    Ok(result)
}

/// The submission's current entry-fee payment: a non-failed one if it exists, otherwise the most
/// recent failed attempt.
pub async fn fetch_entry_fee_payment(
    submission_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, StorageError> {
    let payment = sqlx::query_as(
        r#"
        SELECT * FROM payments
        WHERE submission_id = $1 AND payment_type = 'EntryFee'
        ORDER BY CASE WHEN status = 'Failed' THEN 1 ELSE 0 END, created_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(submission_id)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

pub async fn pending_entry_fee_exists(
    submission_id: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, StorageError> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM payments WHERE submission_id = $1 AND payment_type = 'EntryFee' AND status = 'Pending'",
    )
    .bind(submission_id)
    .fetch_one(conn)
    .await?;
    Ok(count > 0)
}

pub async fn fetch_by_charge_id(
    charge_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, StorageError> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE processor_charge_id = $1 ORDER BY id DESC LIMIT 1")
        .bind(charge_id)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

pub async fn fetch_by_transfer_id(
    transfer_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, StorageError> {
    let payment =
        sqlx::query_as("SELECT * FROM payments WHERE processor_transfer_id = $1 ORDER BY id DESC LIMIT 1")
            .bind(transfer_id)
            .fetch_optional(conn)
            .await?;
    Ok(payment)
}

/// Transitions the Pending payment for the given charge to Completed.
///
/// This is the idempotency boundary of the entry-fee path: the status predicate makes the update
/// a no-op for any payment that is already terminal, no matter how many webhooks and polls race
/// on it. Returns `None` when nothing was updated.
pub(crate) async fn complete_pending_by_charge(
    charge_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, StorageError> {
    let payment = sqlx::query_as(
        r#"
        UPDATE payments
        SET status = 'Completed', processed_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
        WHERE processor_charge_id = $1 AND status = 'Pending'
        RETURNING *
        "#,
    )
    .bind(charge_id)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

/// Transitions the Pending payment for the given charge to Failed. Same conditional shape as
/// [`complete_pending_by_charge`]; already-terminal payments are left untouched.
pub(crate) async fn fail_pending_by_charge(
    charge_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, StorageError> {
    let payment = sqlx::query_as(
        r#"
        UPDATE payments
        SET status = 'Failed', processed_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
        WHERE processor_charge_id = $1 AND status = 'Pending'
        RETURNING *
        "#,
    )
    .bind(charge_id)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

/// Transitions the Pending payment carrying the given transfer reference to the given terminal
/// status.
pub(crate) async fn settle_pending_by_transfer(
    transfer_id: &str,
    status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, StorageError> {
    let payment = sqlx::query_as(
        r#"
        UPDATE payments
        SET status = $1, processed_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
        WHERE processor_transfer_id = $2 AND status = 'Pending'
        RETURNING *
        "#,
    )
    .bind(status.to_string())
    .bind(transfer_id)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

/// The submission's most relevant prize payout: a non-failed one if any exists, otherwise the
/// latest failed attempt.
pub async fn fetch_payout_for_submission(
    submission_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, StorageError> {
    let payment = sqlx::query_as(
        r#"
        SELECT * FROM payments
        WHERE submission_id = $1 AND payment_type = 'PrizePayout'
        ORDER BY CASE WHEN status = 'Failed' THEN 1 ELSE 0 END, created_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(submission_id)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

pub async fn fetch_payouts_for_competition(
    competition_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, StorageError> {
    let payments = sqlx::query_as(
        "SELECT * FROM payments WHERE competition_id = $1 AND payment_type = 'PrizePayout' ORDER BY created_at DESC, \
         id DESC",
    )
    .bind(competition_id)
    .fetch_all(conn)
    .await?;
    Ok(payments)
}

pub async fn fetch_payouts_for_user(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, StorageError> {
    let payments = sqlx::query_as(
        "SELECT * FROM payments WHERE user_id = $1 AND payment_type = 'PrizePayout' ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(payments)
}
