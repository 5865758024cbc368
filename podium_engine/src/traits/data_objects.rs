use std::collections::HashMap;

use podium_common::Cents;

use crate::{db_types::Payment, ranking::JudgingProgress};

//--------------------------------------   EntryFeeReceipt    --------------------------------------------------------
/// The outcome of attempting to settle an entry-fee charge.
///
/// `applied` is true only for the single invocation that actually transitioned the payment from
/// Pending to Completed and credited the competition pool. Every later attempt (a racing webhook,
/// a duplicate delivery, a client poll) sees `applied == false` and must make no further changes.
#[derive(Debug, Clone)]
pub struct EntryFeeReceipt {
    pub payment: Payment,
    pub applied: bool,
    /// The amount added to the prize pool, zero when `applied` is false.
    pub pool_contribution: Cents,
}

//--------------------------------------     JudgingStats     --------------------------------------------------------
/// Judging progress per submission, keyed by submission id.
pub type JudgingStats = HashMap<i64, JudgingProgress>;
