use serde::{Deserialize, Serialize};
use sp_core::H160;
use std::ops::Range;

use crate::units::{Gwei, GroupId, ValidatorId};
use crate::GroupScoped;

/// Contiguous validator-ID range `[first, first + count)` owned by a distributor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorRange {
    pub first_validator_id: ValidatorId,
    pub validator_count: u64,
}

impl ValidatorRange {
    pub fn new(first_validator_id: ValidatorId, validator_count: u64) -> Self {
        Self { first_validator_id, validator_count }
    }

    /// Exclusive upper bound.
    pub fn end(&self) -> ValidatorId {
        self.first_validator_id.saturating_add(self.validator_count)
    }

    pub fn ids(&self) -> Range<ValidatorId> {
        self.first_validator_id..self.end()
    }

    pub fn contains(&self, id: ValidatorId) -> bool {
        self.ids().contains(&id)
    }

    pub fn overlaps(&self, other: &ValidatorRange) -> bool {
        self.first_validator_id < other.end() && other.first_validator_id < self.end()
    }
}

/// What discovery learns about one deployed distributor contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributorDescriptor {
    pub address: H160,
    pub group_id: GroupId,
    pub range: ValidatorRange,
}

/// Rewards a distributor already paid out before it moved to proof-based withdrawals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyRecord {
    pub group_id: GroupId,
    pub address: H160,
    pub carry_over: Gwei,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributorGroup {
    pub group_id: GroupId,
    pub range: ValidatorRange,
    pub legacy_carry_over: Gwei,
    /// Sum of settled validator amounts; signed because penalties can dominate.
    pub aggregated_sum: i128,
}

impl DistributorGroup {
    /// Amount committed for the group, or `None` if it would be negative or overflow.
    pub fn total(&self) -> Option<Gwei> {
        let aggregated = u128::try_from(self.aggregated_sum).ok()?;
        Gwei(aggregated).checked_add(self.legacy_carry_over)
    }
}

impl GroupScoped for DistributorDescriptor {
    fn group_id(&self) -> GroupId {
        self.group_id
    }
}

impl GroupScoped for LegacyRecord {
    fn group_id(&self) -> GroupId {
        self.group_id
    }
}

impl GroupScoped for DistributorGroup {
    fn group_id(&self) -> GroupId {
        self.group_id
    }
}
