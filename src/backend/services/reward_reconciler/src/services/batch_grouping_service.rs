use std::collections::BTreeMap;
use tracing::info;

use crate::models::period::ValidatorAggregates;
use crate::models::{
    DistributorDescriptor, DistributorGroup, Gwei, GroupId, GroupScoped, LegacyRecord,
    MerkleLeaf, ValidatorId,
};
use crate::utils::errors::{ReconcilerError, Result};

/// Upper bound on validators covered by all distributors together, well above the
/// size of the beacon chain's validator set.
pub const MAX_TRACKED_VALIDATORS: u64 = 1 << 22;

/// Folds per-validator aggregates into per-distributor leaves.
pub struct BatchGroupingService;

impl BatchGroupingService {
    /// Checks ranges read from chain before anything is sized from them: group ids
    /// unique, counts non-zero, ranges disjoint, total within [`MAX_TRACKED_VALIDATORS`].
    pub fn validate_descriptors(descriptors: &[DistributorDescriptor]) -> Result<()> {
        ensure_unique(descriptors)?;

        let mut total: u64 = 0;
        for d in descriptors {
            if d.range.validator_count == 0 {
                return Err(ReconcilerError::MalformedLeaf {
                    group_id: d.group_id,
                    reason: "validator count is zero".to_string(),
                });
            }
            total = total.saturating_add(d.range.validator_count);
            if total > MAX_TRACKED_VALIDATORS {
                return Err(ReconcilerError::MalformedLeaf {
                    group_id: d.group_id,
                    reason: format!(
                        "validator count {} brings the total past {}",
                        d.range.validator_count, MAX_TRACKED_VALIDATORS
                    ),
                });
            }
        }

        ensure_disjoint(descriptors)
    }

    /// Every validator id owned by the given distributors, ascending.
    pub fn validator_ids(descriptors: &[DistributorDescriptor]) -> Vec<ValidatorId> {
        let mut ids: Vec<ValidatorId> = descriptors.iter().flat_map(|d| d.range.ids()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn group(
        descriptors: &[DistributorDescriptor],
        legacy: &[LegacyRecord],
        aggregates: &ValidatorAggregates,
    ) -> Result<Vec<DistributorGroup>> {
        ensure_unique(descriptors)?;
        ensure_unique(legacy)?;
        ensure_disjoint(descriptors)?;

        let legacy_by_group: BTreeMap<GroupId, &LegacyRecord> =
            legacy.iter().map(|r| (r.group_id, r)).collect();

        let mut groups = descriptors
            .iter()
            .map(|d| {
                let record = legacy_by_group
                    .get(&d.group_id)
                    .ok_or(ReconcilerError::UnmatchedGroup(d.group_id))?;
                let aggregated_sum = aggregates.range(d.range.ids()).map(|(_, amount)| *amount).sum();

                Ok(DistributorGroup {
                    group_id: d.group_id,
                    range: d.range,
                    legacy_carry_over: record.carry_over,
                    aggregated_sum,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        groups.sort_by_key(|g| g.group_id);

        Ok(groups)
    }

    pub fn leaves(groups: &[DistributorGroup]) -> Result<Vec<MerkleLeaf>> {
        if groups.is_empty() {
            return Err(ReconcilerError::EmptyLeafSet);
        }

        let mut leaves = groups
            .iter()
            .map(|g| {
                if g.range.validator_count == 0 {
                    return Err(ReconcilerError::MalformedLeaf {
                        group_id: g.group_id,
                        reason: "validator count is zero".to_string(),
                    });
                }
                let amount = g.total().ok_or_else(|| ReconcilerError::MalformedLeaf {
                    group_id: g.group_id,
                    reason: format!(
                        "total of {} + {} is not a valid amount",
                        g.aggregated_sum, g.legacy_carry_over
                    ),
                })?;
                Ok(MerkleLeaf::new(g.group_id, g.range.validator_count, amount))
            })
            .collect::<Result<Vec<_>>>()?;
        leaves.sort_by_key(|l| l.group_id);

        info!(
            groups = leaves.len(),
            total = %leaves.iter().map(|l| l.amount).sum::<Gwei>(),
            "built commitment leaves"
        );

        Ok(leaves)
    }

    pub fn build_leaves(
        descriptors: &[DistributorDescriptor],
        legacy: &[LegacyRecord],
        aggregates: &ValidatorAggregates,
    ) -> Result<Vec<MerkleLeaf>> {
        let groups = Self::group(descriptors, legacy, aggregates)?;
        Self::leaves(&groups)
    }
}

fn ensure_unique<T: GroupScoped>(items: &[T]) -> Result<()> {
    let mut seen = std::collections::BTreeSet::new();
    for item in items {
        if !seen.insert(item.group_id()) {
            return Err(ReconcilerError::DuplicateGroup(item.group_id()));
        }
    }
    Ok(())
}

fn ensure_disjoint(descriptors: &[DistributorDescriptor]) -> Result<()> {
    let mut by_start: Vec<&DistributorDescriptor> = descriptors.iter().collect();
    by_start.sort_by_key(|d| (d.range.first_validator_id, d.range.end()));

    for pair in by_start.windows(2) {
        if pair[0].range.overlaps(&pair[1].range) {
            return Err(ReconcilerError::OverlappingRanges(pair[0].group_id, pair[1].group_id));
        }
    }
    Ok(())
}
