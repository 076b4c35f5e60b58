use serde::{Deserialize, Serialize};
use sp_core::H256;

use crate::units::{Gwei, GroupId};
use crate::GroupScoped;

/// One committed row: `(group_id, validator_count, amount)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleLeaf {
    pub group_id: GroupId,
    pub validator_count: u64,
    pub amount: Gwei,
}

impl MerkleLeaf {
    pub fn new(group_id: GroupId, validator_count: u64, amount: Gwei) -> Self {
        Self { group_id, validator_count, amount }
    }
}

impl GroupScoped for MerkleLeaf {
    fn group_id(&self) -> GroupId {
        self.group_id
    }
}

/// The root the oracle currently holds. A confirmed report replaces any earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleReport {
    pub root: H256,
    /// `None` when the oracle already held this root and nothing was sent.
    pub tx_hash: Option<H256>,
    pub block_number: Option<u64>,
}
