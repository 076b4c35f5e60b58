//! Merkle commitment over distributor leaves.
//!
//! Leaves are ordered by ascending group id and hashed with
//! [`CryptoUtils::hash_leaf`]. Inner nodes use the commutative
//! [`CryptoUtils::hash_pair`], so a proof is only the list of sibling hashes.
//! When a level has an odd number of nodes the last node is promoted unchanged to
//! the next level and contributes no proof element at that level.

use reward_models::{Gwei, GroupId, MerkleLeaf};
use serde::{Deserialize, Serialize};
use sp_core::H256;

use crate::utils::crypto::CryptoUtils;
use crate::utils::errors::{ReconcilerError, Result};

pub const DUMP_FORMAT: &str = "reward-merkle-v1";
pub const LEAF_ENCODING: [&str; 3] = ["uint256", "uint256", "uint256"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    leaves: Vec<MerkleLeaf>,
    /// `levels[0]` holds the leaf hashes, the last level holds only the root.
    levels: Vec<Vec<H256>>,
}

/// Serialized tree: the artifact handed to the withdrawer and to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDump {
    pub format: String,
    pub leaf_encoding: Vec<String>,
    pub root: String,
    /// Node hashes per level, leaves first.
    pub tree: Vec<Vec<String>>,
    pub values: Vec<DumpValue>,
}

/// Leaf value as decimal strings `[groupId, validatorCount, amount]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpValue {
    pub value: [String; 3],
    pub leaf_index: usize,
}

impl MerkleTree {
    pub fn build(mut leaves: Vec<MerkleLeaf>) -> Result<Self> {
        if leaves.is_empty() {
            return Err(ReconcilerError::EmptyLeafSet);
        }

        leaves.sort_by_key(|leaf| leaf.group_id);
        if let Some(pair) = leaves.windows(2).find(|pair| pair[0].group_id == pair[1].group_id) {
            return Err(ReconcilerError::DuplicateGroup(pair[0].group_id));
        }
        if let Some(leaf) = leaves.iter().find(|leaf| leaf.validator_count == 0) {
            return Err(ReconcilerError::MalformedLeaf {
                group_id: leaf.group_id,
                reason: "validator count is zero".to_string(),
            });
        }

        let hashes = leaves.iter().map(CryptoUtils::hash_leaf).collect();
        let levels = Self::build_levels(hashes);

        Ok(Self { leaves, levels })
    }

    fn build_levels(leaf_hashes: Vec<H256>) -> Vec<Vec<H256>> {
        let mut levels = Vec::new();
        let mut current = leaf_hashes;

        while current.len() > 1 {
            let next = current
                .chunks(2)
                .map(|chunk| match chunk {
                    [left, right] => CryptoUtils::hash_pair(left, right),
                    _ => chunk[0],
                })
                .collect();
            levels.push(std::mem::replace(&mut current, next));
        }
        levels.push(current);

        levels
    }

    pub fn root(&self) -> H256 {
        self.levels[self.levels.len() - 1][0]
    }

    pub fn leaves(&self) -> &[MerkleLeaf] {
        &self.leaves
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn leaf_index(&self, group_id: GroupId) -> Option<usize> {
        self.leaves
            .binary_search_by_key(&group_id, |leaf| leaf.group_id)
            .ok()
    }

    /// Sibling hashes from the leaf up to (excluding) the root.
    pub fn proof(&self, leaf_index: usize) -> Option<Vec<H256>> {
        if leaf_index >= self.leaves.len() {
            return None;
        }

        let mut proof = Vec::with_capacity(self.levels.len() - 1);
        let mut index = leaf_index;
        for level in &self.levels[..self.levels.len() - 1] {
            if let Some(sibling) = level.get(index ^ 1) {
                proof.push(*sibling);
            }
            index /= 2;
        }

        Some(proof)
    }

    pub fn proof_for_group(&self, group_id: GroupId) -> Result<(MerkleLeaf, Vec<H256>)> {
        let index = self
            .leaf_index(group_id)
            .ok_or(ReconcilerError::LeafNotFound(group_id))?;
        let proof = self
            .proof(index)
            .ok_or(ReconcilerError::LeafNotFound(group_id))?;

        Ok((self.leaves[index], proof))
    }

    pub fn verify(root: H256, leaf: &MerkleLeaf, proof: &[H256]) -> bool {
        CryptoUtils::verify_merkle_proof(root, proof, CryptoUtils::hash_leaf(leaf))
    }

    pub fn dump(&self) -> TreeDump {
        TreeDump {
            format: DUMP_FORMAT.to_string(),
            leaf_encoding: LEAF_ENCODING.iter().map(|s| s.to_string()).collect(),
            root: CryptoUtils::to_hex(&self.root()),
            tree: self
                .levels
                .iter()
                .map(|level| level.iter().map(CryptoUtils::to_hex).collect())
                .collect(),
            values: self
                .leaves
                .iter()
                .enumerate()
                .map(|(leaf_index, leaf)| DumpValue {
                    value: [
                        leaf.group_id.to_string(),
                        leaf.validator_count.to_string(),
                        leaf.amount.0.to_string(),
                    ],
                    leaf_index,
                })
                .collect(),
        }
    }

    /// Rebuild from a dump, rejecting it unless every stored hash matches.
    pub fn load(dump: &TreeDump) -> Result<Self> {
        if dump.format != DUMP_FORMAT {
            return Err(ReconcilerError::MalformedDump(format!(
                "unknown format {:?}",
                dump.format
            )));
        }
        if dump.leaf_encoding != LEAF_ENCODING {
            return Err(ReconcilerError::MalformedDump(format!(
                "unsupported leaf encoding {:?}",
                dump.leaf_encoding
            )));
        }

        let mut values: Vec<&DumpValue> = dump.values.iter().collect();
        values.sort_by_key(|v| v.leaf_index);
        let leaves = values
            .iter()
            .enumerate()
            .map(|(position, v)| {
                if v.leaf_index != position {
                    return Err(ReconcilerError::MalformedDump(format!(
                        "leaf index {} out of sequence",
                        v.leaf_index
                    )));
                }
                parse_leaf(&v.value)
            })
            .collect::<Result<Vec<_>>>()?;

        let tree = Self::build(leaves)?;
        let stored: Vec<Vec<String>> = dump.tree.iter().map(|l| l.iter().map(|h| h.to_lowercase()).collect()).collect();
        if tree.dump().tree != stored {
            return Err(ReconcilerError::MalformedDump(
                "stored node hashes do not match leaf values".to_string(),
            ));
        }
        if CryptoUtils::parse_hash(&dump.root) != Some(tree.root()) {
            return Err(ReconcilerError::MalformedDump(format!(
                "stored root {} does not match",
                dump.root
            )));
        }

        Ok(tree)
    }
}

fn parse_leaf(value: &[String; 3]) -> Result<MerkleLeaf> {
    let malformed = |field: &str, raw: &str| {
        ReconcilerError::MalformedDump(format!("invalid {} {:?}", field, raw))
    };

    let group_id = value[0].parse::<u64>().map_err(|_| malformed("group id", &value[0]))?;
    let validator_count = value[1]
        .parse::<u64>()
        .map_err(|_| malformed("validator count", &value[1]))?;
    let amount = value[2].parse::<u128>().map_err(|_| malformed("amount", &value[2]))?;

    Ok(MerkleLeaf::new(group_id, validator_count, Gwei(amount)))
}
