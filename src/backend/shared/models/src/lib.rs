pub mod commitment;
pub mod distributor;
pub mod ledger;
pub mod units;

pub use commitment::{MerkleLeaf, OracleReport};
pub use distributor::{DistributorDescriptor, DistributorGroup, LegacyRecord, ValidatorRange};
pub use ledger::{RewardComponents, ValidatorEpochRecord};
pub use units::{Gwei, GroupId, ValidatorId, VALIDATOR_PRINCIPAL_GWEI, WEI_PER_GWEI};

// Common shared traits

/// Anything that belongs to exactly one distributor group.
pub trait GroupScoped {
    fn group_id(&self) -> GroupId;
}
