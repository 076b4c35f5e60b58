use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::units::ValidatorId;

/// Per-epoch earned rewards and penalties of one validator, in gwei.
/// Any component may be missing in the warehouse; missing means zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardComponents {
    pub attestation_reward: Option<i64>,
    pub proposal_reward: Option<i64>,
    pub sync_reward: Option<i64>,
    pub attestation_penalty: Option<i64>,
    pub proposal_penalty: Option<i64>,
    pub sync_penalty: Option<i64>,
}

impl RewardComponents {
    /// Earned rewards minus penalties.
    pub fn net(&self) -> i128 {
        let v = |c: Option<i64>| c.unwrap_or(0) as i128;
        v(self.attestation_reward) + v(self.proposal_reward) + v(self.sync_reward)
            - v(self.attestation_penalty)
            - v(self.proposal_penalty)
            - v(self.sync_penalty)
    }
}

/// One row of the validator accounting ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorEpochRecord {
    pub validator_id: ValidatorId,
    pub epoch: u64,
    pub epoch_date: NaiveDate,
    /// Balance swept to the withdrawal address in this epoch, in gwei.
    #[serde(default)]
    pub balance_withdrawn: Option<u64>,
    #[serde(flatten)]
    pub rewards: RewardComponents,
    #[serde(default)]
    pub slashed: bool,
}

impl ValidatorEpochRecord {
    pub fn closes_period(&self) -> bool {
        self.balance_withdrawn.is_some()
    }
}
