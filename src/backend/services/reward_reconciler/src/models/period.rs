use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use reward_models::ValidatorId;

/// Settled amount per validator, in gwei.
pub type ValidatorAggregates = BTreeMap<ValidatorId, i128>;

/// Epochs of one validator between two balance withdrawals: after the previous
/// withdrawal (exclusive) up to the next one (inclusive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalPeriod {
    pub validator_id: ValidatorId,
    /// 1-based.
    pub ordinal: u64,
    pub first_epoch: u64,
    pub last_epoch: u64,
    pub earned_sum: i128,
    /// Present only once the period has been closed by an observed withdrawal.
    pub withdrawn_sum: Option<i128>,
}

impl WithdrawalPeriod {
    pub fn is_closed(&self) -> bool {
        self.withdrawn_sum.is_some()
    }

    /// Amount this period adds to the validator total; `None` while open.
    pub fn contribution(&self) -> Option<i128> {
        self.withdrawn_sum
            .map(|withdrawn| settle(self.earned_sum, withdrawn))
    }
}

/// The withdrawn amount is trusted while it stays below twice the earned amount;
/// past that the payout is capped at what was earned.
pub fn settle(earned_sum: i128, withdrawn_sum: i128) -> i128 {
    if withdrawn_sum < earned_sum.saturating_mul(2) {
        withdrawn_sum
    } else {
        earned_sum
    }
}
