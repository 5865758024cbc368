//! Integration tests for the settlement reconciler: the entry-fee path with its racing
//! webhook/poll triggers, and the prize-payout batch.

mod support;

use podium_common::Cents;
use podium_engine::{
    db_types::{CompetitionStatus, PaymentStatus, SubmissionStatus},
    objects::EntryChargeOutcome,
    traits::{ChargeIntent, ChargeState, LedgerBalance, LedgerError, LedgerEvent, TransferRef},
    api::transfer_idempotency_key,
    winners::PlannedWinner,
    CompetitionManagement,
    SettlementApi,
    SettlementApiError,
    SettlementDatabase,
};
use support::{
    new_test_db,
    seed_competition,
    seed_payout_account,
    seed_submission,
    set_prize_pool,
    MockLedger,
};

fn intent(charge_id: &str, status: ChargeState) -> ChargeIntent {
    ChargeIntent { charge_id: charge_id.to_string(), client_secret: format!("{charge_id}_secret"), status }
}

#[tokio::test]
async fn entry_fee_success_effects_are_applied_exactly_once() {
    let db = new_test_db().await;
    let competition = seed_competition(&db, CompetitionStatus::Active).await;
    set_prize_pool(&db, competition.id, Cents::from_dollars(1000)).await;
    let submission = seed_submission(&db, competition.id, 42, SubmissionStatus::Draft).await;

    let mut ledger = MockLedger::new();
    ledger
        .expect_create_charge()
        .times(1)
        .returning(|_, _, _| Ok(intent("ch_1", ChargeState::RequiresPaymentMethod)));
    let api = SettlementApi::new(db.clone(), ledger);

    let outcome = api.request_entry_charge(submission.id, 42, false).await.unwrap();
    assert!(matches!(outcome, EntryChargeOutcome::NewCharge { ref charge_id, .. } if charge_id == "ch_1"));
    let pending = db.fetch_entry_fee_payment(submission.id).await.unwrap().unwrap();
    assert_eq!(pending.status, PaymentStatus::Pending);
    let submission = db.fetch_submission(submission.id).await.unwrap().unwrap();
    assert_eq!(submission.status, SubmissionStatus::PendingPayment);

    // First delivery applies the success effects
    api.handle_ledger_event(LedgerEvent::ChargeSucceeded { charge_id: "ch_1".to_string() }).await.unwrap();
    let competition = db.fetch_competition(competition.id).await.unwrap().unwrap();
    assert_eq!(competition.current_entries, 1);
    // $100 fee at 10% platform cut credits $90 on top of the $1000 pool
    assert_eq!(competition.prize_pool, Cents::from_dollars(1090));
    let submission = db.fetch_submission(submission.id).await.unwrap().unwrap();
    assert_eq!(submission.status, SubmissionStatus::Submitted);
    assert!(submission.submitted_at.is_some());

    // A duplicate delivery of the same event changes nothing
    api.handle_ledger_event(LedgerEvent::ChargeSucceeded { charge_id: "ch_1".to_string() }).await.unwrap();
    let competition = db.fetch_competition(competition.id).await.unwrap().unwrap();
    assert_eq!(competition.current_entries, 1);
    assert_eq!(competition.prize_pool, Cents::from_dollars(1090));
    let payment = db.fetch_entry_fee_payment(submission.id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert!(payment.processed_at.is_some());
}

#[tokio::test]
async fn poll_and_webhook_converge_without_double_credit() {
    let db = new_test_db().await;
    let competition = seed_competition(&db, CompetitionStatus::Active).await;
    let submission = seed_submission(&db, competition.id, 7, SubmissionStatus::Draft).await;

    let mut ledger = MockLedger::new();
    ledger
        .expect_create_charge()
        .times(1)
        .returning(|_, _, _| Ok(intent("ch_poll", ChargeState::Processing)));
    ledger.expect_get_charge().returning(|id| Ok(intent(id, ChargeState::Succeeded)));
    let api = SettlementApi::new(db.clone(), ledger);

    api.request_entry_charge(submission.id, 7, false).await.unwrap();
    // the poll settles the charge first...
    let outcome = api.poll_entry_payment(submission.id, 7, false).await.unwrap();
    assert_eq!(outcome.payment_status, PaymentStatus::Completed);
    assert_eq!(outcome.submission_status, SubmissionStatus::Submitted);
    // ...and the webhook arriving second finds the payment terminal and applies nothing
    api.handle_ledger_event(LedgerEvent::ChargeSucceeded { charge_id: "ch_poll".to_string() }).await.unwrap();

    let competition = db.fetch_competition(competition.id).await.unwrap().unwrap();
    assert_eq!(competition.current_entries, 1);
    assert_eq!(competition.prize_pool, Cents::from(9_000));

    // once the submission has left PendingPayment, further polls are rejected at the gate
    let err = api.poll_entry_payment(submission.id, 7, false).await.unwrap_err();
    assert!(matches!(err, SettlementApiError::PreconditionFailed(_)));
}

#[tokio::test]
async fn open_charge_is_surfaced_instead_of_duplicated() {
    let db = new_test_db().await;
    let competition = seed_competition(&db, CompetitionStatus::Active).await;
    let submission = seed_submission(&db, competition.id, 9, SubmissionStatus::Draft).await;

    let mut ledger = MockLedger::new();
    ledger
        .expect_create_charge()
        .times(1)
        .returning(|_, _, _| Ok(intent("ch_open", ChargeState::RequiresPaymentMethod)));
    ledger.expect_get_charge().returning(|id| Ok(intent(id, ChargeState::RequiresAction)));
    let api = SettlementApi::new(db.clone(), ledger);

    api.request_entry_charge(submission.id, 9, false).await.unwrap();
    // The second request must NOT create another charge: the live one is surfaced
    let outcome = api.request_entry_charge(submission.id, 9, false).await.unwrap();
    match outcome {
        EntryChargeOutcome::AwaitingPayment { charge_id, client_secret } => {
            assert_eq!(charge_id, "ch_open");
            assert_eq!(client_secret, "ch_open_secret");
        },
        other => panic!("Expected AwaitingPayment, got {other:?}"),
    }
}

#[tokio::test]
async fn dead_charge_is_replaced_and_the_old_one_failed() {
    let db = new_test_db().await;
    let competition = seed_competition(&db, CompetitionStatus::Active).await;
    let submission = seed_submission(&db, competition.id, 9, SubmissionStatus::Draft).await;

    let mut ledger = MockLedger::new();
    let mut charge_counter = 0;
    ledger.expect_create_charge().times(2).returning(move |_, _, _| {
        charge_counter += 1;
        Ok(intent(&format!("ch_{charge_counter}"), ChargeState::RequiresPaymentMethod))
    });
    ledger.expect_get_charge().returning(|id| Ok(intent(id, ChargeState::Canceled)));
    let api = SettlementApi::new(db.clone(), ledger);

    api.request_entry_charge(submission.id, 9, false).await.unwrap();
    let outcome = api.request_entry_charge(submission.id, 9, false).await.unwrap();
    assert!(matches!(outcome, EntryChargeOutcome::NewCharge { ref charge_id, .. } if charge_id == "ch_2"));

    let old = db.fetch_payment_by_charge_id("ch_1").await.unwrap().unwrap();
    assert_eq!(old.status, PaymentStatus::Failed);
    let current = db.fetch_entry_fee_payment(submission.id).await.unwrap().unwrap();
    assert_eq!(current.processor_charge_id.as_deref(), Some("ch_2"));
    assert_eq!(current.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn failed_charge_webhook_touches_only_the_payment() {
    let db = new_test_db().await;
    let competition = seed_competition(&db, CompetitionStatus::Active).await;
    let submission = seed_submission(&db, competition.id, 5, SubmissionStatus::Draft).await;

    let mut ledger = MockLedger::new();
    ledger
        .expect_create_charge()
        .returning(|_, _, _| Ok(intent("ch_bad", ChargeState::RequiresPaymentMethod)));
    let api = SettlementApi::new(db.clone(), ledger);
    api.request_entry_charge(submission.id, 5, false).await.unwrap();

    api.handle_ledger_event(LedgerEvent::ChargeFailed {
        charge_id: "ch_bad".to_string(),
        message: Some("card_declined".to_string()),
    })
    .await
    .unwrap();

    let payment = db.fetch_payment_by_charge_id("ch_bad").await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Failed);
    assert!(payment.processed_at.is_some());
    let competition = db.fetch_competition(competition.id).await.unwrap().unwrap();
    assert_eq!(competition.current_entries, 0);
    assert_eq!(competition.prize_pool, Cents::from(0));
    let submission = db.fetch_submission(submission.id).await.unwrap().unwrap();
    assert_eq!(submission.status, SubmissionStatus::PendingPayment);
}

#[tokio::test]
async fn entry_charge_gates_on_competition_state() {
    let db = new_test_db().await;
    let competition = seed_competition(&db, CompetitionStatus::Closed).await;
    let submission = seed_submission(&db, competition.id, 5, SubmissionStatus::Draft).await;
    let api = SettlementApi::new(db.clone(), MockLedger::new());

    let err = api.request_entry_charge(submission.id, 5, false).await.unwrap_err();
    assert!(matches!(err, SettlementApiError::PreconditionFailed(_)));

    // wrong owner
    let err = api.request_entry_charge(submission.id, 999, false).await.unwrap_err();
    assert!(matches!(err, SettlementApiError::Forbidden(_)));
}

#[tokio::test]
async fn unknown_webhook_events_are_acknowledged_without_changes() {
    let db = new_test_db().await;
    let api = SettlementApi::new(db.clone(), MockLedger::new());
    api.handle_ledger_event(LedgerEvent::Unrecognized { event_type: "charge.refund.updated".to_string() })
        .await
        .unwrap();
    // transfer events for unknown references are logged and dropped, not errors
    api.handle_ledger_event(LedgerEvent::TransferPaid { transfer_id: "tr_ghost".to_string() }).await.unwrap();
}

async fn complete_competition_with_winners(
    db: &podium_engine::SqliteDatabase,
) -> (i64, i64, i64) {
    let competition = seed_competition(db, CompetitionStatus::Judging).await;
    set_prize_pool(db, competition.id, Cents::from_dollars(1000)).await;
    let first = seed_submission(db, competition.id, 100, SubmissionStatus::Submitted).await;
    let second = seed_submission(db, competition.id, 200, SubmissionStatus::Submitted).await;
    let winners = vec![
        PlannedWinner {
            submission_id: first.id,
            user_id: 100,
            title: first.title.clone(),
            place: "first".to_string(),
            prize_amount: Cents::from_dollars(500),
        },
        PlannedWinner {
            submission_id: second.id,
            user_id: 200,
            title: second.title.clone(),
            place: "second".to_string(),
            prize_amount: Cents::from_dollars(300),
        },
    ];
    db.commit_winner_selection(competition.id, &winners).await.unwrap();
    db.update_competition_status(competition.id, CompetitionStatus::Complete).await.unwrap();
    (competition.id, first.id, second.id)
}

#[tokio::test]
async fn prize_distribution_is_idempotent_across_invocations() {
    let db = new_test_db().await;
    let (competition_id, first_id, second_id) = complete_competition_with_winners(&db).await;
    // the first-place founder can receive transfers; the runner-up never onboarded
    seed_payout_account(&db, 100, Some("acct_100"), true).await;

    let mut ledger = MockLedger::new();
    ledger.expect_get_balance().returning(|| Ok(LedgerBalance { available: Cents::from_dollars(10_000) }));
    let expected_key = transfer_idempotency_key(competition_id, first_id);
    ledger
        .expect_create_transfer()
        .withf(move |req| req.idempotency_key == expected_key && req.destination == "acct_100")
        .times(1)
        .returning(|req| Ok(TransferRef { transfer_id: format!("tr_{}", req.metadata.submission_id) }));
    let api = SettlementApi::new(db.clone(), ledger);

    let run1 = api.distribute_prizes(competition_id).await.unwrap();
    assert_eq!(run1.successful_payouts.len(), 1);
    assert_eq!(run1.pending_bank_info.len(), 1);
    assert_eq!(run1.pending_bank_info[0].submission_id, second_id);
    assert_eq!(run1.total_distributed, Cents::from_dollars(500));
    assert_eq!(run1.total_expected, Cents::from_dollars(800));

    // Re-running the whole batch issues no second transfer (create_transfer is times(1))
    let run2 = api.distribute_prizes(competition_id).await.unwrap();
    assert_eq!(run2.successful_payouts.len(), 0);
    assert_eq!(run2.already_paid.len(), 1);
    assert_eq!(run2.pending_bank_info.len(), 1);
    assert_eq!(run2.total_distributed, Cents::from(0));
    assert_eq!(run2.total_expected, Cents::from_dollars(800));

    // the transfer settles via webhook and stays already_paid afterwards
    let transfer_id = format!("tr_{first_id}");
    api.handle_ledger_event(LedgerEvent::TransferPaid { transfer_id: transfer_id.clone() }).await.unwrap();
    let payout = db.fetch_prize_payout(first_id).await.unwrap().unwrap();
    assert_eq!(payout.status, PaymentStatus::Completed);
    let run3 = api.distribute_prizes(competition_id).await.unwrap();
    assert_eq!(run3.already_paid.len(), 1);
}

#[tokio::test]
async fn confirmed_balance_shortfall_blocks_the_whole_batch() {
    let db = new_test_db().await;
    let (competition_id, _, _) = complete_competition_with_winners(&db).await;
    seed_payout_account(&db, 100, Some("acct_100"), true).await;
    seed_payout_account(&db, 200, Some("acct_200"), true).await;

    let mut ledger = MockLedger::new();
    ledger.expect_get_balance().returning(|| Ok(LedgerBalance { available: Cents::from_dollars(100) }));
    ledger.expect_create_transfer().times(0);
    let api = SettlementApi::new(db.clone(), ledger);

    let err = api.distribute_prizes(competition_id).await.unwrap_err();
    match err {
        SettlementApiError::InsufficientBalance { needed, available } => {
            assert_eq!(needed, Cents::from_dollars(800));
            assert_eq!(available, Cents::from_dollars(100));
        },
        other => panic!("Expected InsufficientBalance, got {other}"),
    }
}

#[tokio::test]
async fn balance_query_failure_does_not_block_the_batch() {
    let db = new_test_db().await;
    let (competition_id, first_id, _) = complete_competition_with_winners(&db).await;
    seed_payout_account(&db, 100, Some("acct_100"), true).await;

    let mut ledger = MockLedger::new();
    ledger.expect_get_balance().returning(|| Err(LedgerError::Connection("timeout".to_string())));
    ledger
        .expect_create_transfer()
        .times(1)
        .returning(|req| Ok(TransferRef { transfer_id: format!("tr_{}", req.metadata.submission_id) }));
    let api = SettlementApi::new(db.clone(), ledger);

    let result = api.distribute_prizes(competition_id).await.unwrap();
    assert_eq!(result.successful_payouts.len(), 1);
    assert_eq!(result.successful_payouts[0].submission_id, first_id);
}

#[tokio::test]
async fn transfer_errors_fail_only_that_winner() {
    let db = new_test_db().await;
    let (competition_id, first_id, second_id) = complete_competition_with_winners(&db).await;
    seed_payout_account(&db, 100, Some("acct_100"), true).await;
    seed_payout_account(&db, 200, Some("acct_200"), true).await;

    let mut ledger = MockLedger::new();
    ledger.expect_get_balance().returning(|| Ok(LedgerBalance { available: Cents::from_dollars(10_000) }));
    ledger.expect_create_transfer().returning(move |req| {
        if req.metadata.submission_id == first_id {
            Err(LedgerError::Api("destination account frozen".to_string()))
        } else {
            Ok(TransferRef { transfer_id: format!("tr_{}", req.metadata.submission_id) })
        }
    });
    let api = SettlementApi::new(db.clone(), ledger);

    let result = api.distribute_prizes(competition_id).await.unwrap();
    assert_eq!(result.failed_payouts.len(), 1);
    assert_eq!(result.failed_payouts[0].submission_id, first_id);
    assert_eq!(result.successful_payouts.len(), 1);
    assert_eq!(result.successful_payouts[0].submission_id, second_id);
    // no payment row is written for the failed transfer
    assert!(db.fetch_prize_payout(first_id).await.unwrap().is_none());
    assert_eq!(result.total_distributed, Cents::from_dollars(300));
    assert_eq!(result.total_expected, Cents::from_dollars(800));
}

#[tokio::test]
async fn distribution_requires_a_complete_competition() {
    let db = new_test_db().await;
    let competition = seed_competition(&db, CompetitionStatus::Judging).await;
    let api = SettlementApi::new(db.clone(), MockLedger::new());
    let err = api.distribute_prizes(competition.id).await.unwrap_err();
    assert!(matches!(err, SettlementApiError::PreconditionFailed(_)));
}
