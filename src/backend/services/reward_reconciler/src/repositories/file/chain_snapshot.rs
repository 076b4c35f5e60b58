use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sp_core::{H160, H256};
use std::path::Path;

use crate::models::chain::DistributorCreated;
use crate::models::{GroupId, ValidatorRange};
use crate::repositories::traits::ChainReader;

/// Point-in-time copy of the on-chain state the reconciler reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub latest_block: u64,
    #[serde(default)]
    pub operator_transaction_count: u64,
    #[serde(default)]
    pub distributors: Vec<DistributorSnapshot>,
    #[serde(default)]
    pub oracles: Vec<OracleSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributorSnapshot {
    pub address: H160,
    pub created_at_block: u64,
    pub group_id: GroupId,
    pub first_validator_id: u64,
    pub validator_count: u64,
    #[serde(default)]
    pub legacy_cumulative_reward_wei: u128,
    #[serde(default)]
    pub balance_wei: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleSnapshot {
    pub address: H160,
    pub root: Option<H256>,
}

pub struct SnapshotChainReader {
    snapshot: ChainSnapshot,
}

impl SnapshotChainReader {
    pub fn new(snapshot: ChainSnapshot) -> Self {
        Self { snapshot }
    }

    pub async fn from_file(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading chain snapshot {}", path.display()))?;
        let snapshot = serde_json::from_str(&raw)
            .with_context(|| format!("parsing chain snapshot {}", path.display()))?;
        Ok(Self::new(snapshot))
    }

    fn distributor(&self, address: H160) -> Result<&DistributorSnapshot> {
        self.snapshot
            .distributors
            .iter()
            .find(|d| d.address == address)
            .ok_or_else(|| anyhow!("no distributor at {:?} in snapshot", address))
    }
}

#[async_trait]
impl ChainReader for SnapshotChainReader {
    async fn latest_block(&self) -> Result<u64> {
        Ok(self.snapshot.latest_block)
    }

    async fn distributor_created_events(
        &self,
        _factory: H160,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<DistributorCreated>> {
        let mut events: Vec<DistributorCreated> = self
            .snapshot
            .distributors
            .iter()
            .filter(|d| (from_block..=to_block).contains(&d.created_at_block))
            .map(|d| DistributorCreated {
                distributor: d.address,
                block_number: d.created_at_block,
            })
            .collect();
        events.sort_by_key(|e| e.block_number);
        Ok(events)
    }

    async fn validator_range(&self, distributor: H160) -> Result<ValidatorRange> {
        let d = self.distributor(distributor)?;
        Ok(ValidatorRange::new(d.first_validator_id, d.validator_count))
    }

    async fn group_id(&self, distributor: H160) -> Result<GroupId> {
        Ok(self.distributor(distributor)?.group_id)
    }

    async fn legacy_cumulative_reward(&self, distributor: H160) -> Result<u128> {
        Ok(self.distributor(distributor)?.legacy_cumulative_reward_wei)
    }

    async fn balance(&self, account: H160) -> Result<u128> {
        Ok(self
            .snapshot
            .distributors
            .iter()
            .find(|d| d.address == account)
            .map_or(0, |d| d.balance_wei))
    }

    async fn active_root(&self, oracle: H160) -> Result<Option<H256>> {
        Ok(self
            .snapshot
            .oracles
            .iter()
            .find(|o| o.address == oracle)
            .and_then(|o| o.root))
    }

    async fn transaction_count(&self, _account: H160) -> Result<u64> {
        Ok(self.snapshot.operator_transaction_count)
    }
}
