use reward_models::{Gwei, GroupId};
use serde::{Deserialize, Serialize};
use sp_core::{H160, H256};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawalOutcome {
    Withdrawn {
        distributor: H160,
        group_id: GroupId,
        amount: Gwei,
        tx_hash: H256,
    },
    SkippedZeroBalance {
        distributor: H160,
    },
    Failed {
        distributor: H160,
        error: String,
    },
}

impl WithdrawalOutcome {
    pub fn distributor(&self) -> H160 {
        match self {
            WithdrawalOutcome::Withdrawn { distributor, .. }
            | WithdrawalOutcome::SkippedZeroBalance { distributor }
            | WithdrawalOutcome::Failed { distributor, .. } => *distributor,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalReport {
    pub outcomes: Vec<WithdrawalOutcome>,
}

impl WithdrawalReport {
    pub fn withdrawn(&self) -> usize {
        self.count(|o| matches!(o, WithdrawalOutcome::Withdrawn { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, WithdrawalOutcome::SkippedZeroBalance { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, WithdrawalOutcome::Failed { .. }))
    }

    pub fn total_withdrawn(&self) -> Gwei {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                WithdrawalOutcome::Withdrawn { amount, .. } => Some(*amount),
                _ => None,
            })
            .sum()
    }

    fn count(&self, pred: impl Fn(&WithdrawalOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}
