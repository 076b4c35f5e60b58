use reward_models::Gwei;
use serde::{Deserialize, Serialize};
use sp_core::{H160, H256};
use std::fmt;

/// Sequence number of the operator account.
///
/// Deliberately neither `Clone` nor `Copy`: the only way to obtain the next value is
/// to give the current one up, so two submissions can never share a nonce.
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub struct Nonce(u64);

impl Nonce {
    /// Seed from the operator's confirmed transaction count.
    pub fn from_transaction_count(count: u64) -> Self {
        Nonce(count)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn advance(self) -> Nonce {
        Nonce(self.0 + 1)
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State-mutating contract calls made under the operator identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractCall {
    /// `oracle.report(root)`
    Report { oracle: H160, root: H256 },
    /// `distributor.withdraw(proof, amountInGwei)`
    Withdraw {
        distributor: H160,
        proof: Vec<H256>,
        amount: Gwei,
    },
}

impl ContractCall {
    pub fn target(&self) -> H160 {
        match self {
            ContractCall::Report { oracle, .. } => *oracle,
            ContractCall::Withdraw { distributor, .. } => *distributor,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ContractCall::Report { .. } => "report",
            ContractCall::Withdraw { .. } => "withdraw",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSettings {
    pub gas_limit: u64,
}

/// A transaction with one confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: H256,
    pub block_number: u64,
    pub nonce: u64,
}

/// `FeeDistributorCreated` event emitted by the factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributorCreated {
    pub distributor: H160,
    pub block_number: u64,
}
