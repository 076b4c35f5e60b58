use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use sp_core::{H160, H256};

use crate::models::chain::{ContractCall, DistributorCreated, TxReceipt, TxSettings};
use crate::models::{GroupId, ValidatorEpochRecord, ValidatorId, ValidatorRange};
use crate::utils::errors::ChainError;
use crate::utils::merkle::TreeDump;

/// Authoritative per-epoch accounting rows.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Rows for the given validators, optionally only those dated on or after `cutoff`.
    async fn fetch_epoch_records(
        &self,
        validator_ids: &[ValidatorId],
        cutoff: Option<NaiveDate>,
    ) -> Result<Vec<ValidatorEpochRecord>>;
}

/// Read-only chain queries. Safe to issue concurrently.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn latest_block(&self) -> Result<u64>;
    async fn distributor_created_events(
        &self,
        factory: H160,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<DistributorCreated>>;
    async fn validator_range(&self, distributor: H160) -> Result<ValidatorRange>;
    async fn group_id(&self, distributor: H160) -> Result<GroupId>;
    /// `legacyCumulativeReward()` in wei.
    async fn legacy_cumulative_reward(&self, distributor: H160) -> Result<u128>;
    /// Balance in wei.
    async fn balance(&self, account: H160) -> Result<u128>;
    async fn active_root(&self, oracle: H160) -> Result<Option<H256>>;
    async fn transaction_count(&self, account: H160) -> Result<u64>;
}

/// Mutating calls under the operator identity. `submit` resolves after one
/// confirmation. Callers must serialize submissions; see `SubmissionQueue`.
#[async_trait]
pub trait ChainWriter: Send + Sync {
    async fn submit(
        &self,
        call: &ContractCall,
        nonce: u64,
        settings: &TxSettings,
    ) -> std::result::Result<TxReceipt, ChainError>;
}

/// Durable home of the commitment artifact.
#[async_trait]
pub trait CommitmentRepository: Send + Sync {
    async fn save(&self, dump: &TreeDump) -> Result<()>;
    async fn load(&self) -> Result<Option<TreeDump>>;
}
