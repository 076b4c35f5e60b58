#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sp_core::{H160, H256};
use std::collections::HashMap;
use std::sync::Mutex;

use reward_reconciler::models::chain::{ContractCall, DistributorCreated, TxReceipt, TxSettings};
use reward_reconciler::models::{
    GroupId, MerkleLeaf, RewardComponents, ValidatorEpochRecord, ValidatorId, ValidatorRange, WEI_PER_GWEI,
};
use reward_reconciler::repositories::traits::{
    ChainReader, ChainWriter, CommitmentRepository, LedgerRepository,
};
use reward_reconciler::utils::errors::ChainError;
use reward_reconciler::{MerkleTree, Network, ReconcilerConfig, TreeDump};

pub const FACTORY: H160 = H160([0xfa; 20]);
pub const ORACLE: H160 = H160([0x0c; 20]);
pub const OPERATOR: H160 = H160([0x0e; 20]);

pub fn address(n: u8) -> H160 {
    H160::repeat_byte(n)
}

pub fn gwei_to_wei(gwei: u128) -> u128 {
    gwei * WEI_PER_GWEI
}

pub fn test_config() -> ReconcilerConfig {
    ReconcilerConfig {
        network: Network::Testnet,
        factory_address: FACTORY,
        oracle_address: ORACLE,
        operator_address: OPERATOR,
        log_chunk_size: 10,
        ledger_export_path: Some("ledger.json".into()),
        ..Default::default()
    }
}

/// One ledger row with all earnings booked as attestation rewards.
pub fn record(validator_id: ValidatorId, epoch: u64, earned: i64, withdrawn: Option<u64>) -> ValidatorEpochRecord {
    ValidatorEpochRecord {
        validator_id,
        epoch,
        epoch_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(epoch as i64),
        balance_withdrawn: withdrawn,
        rewards: RewardComponents {
            attestation_reward: Some(earned),
            ..Default::default()
        },
        slashed: false,
    }
}

/// How an injected submission failure behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Mined and reverted: nonce spent, no state change.
    Revert,
    /// Refused before broadcast: nothing happens on chain.
    Reject,
    /// Connection lost before the node saw it.
    TransportLost,
    /// Connection lost after the transaction landed.
    TransportLanded,
}

#[derive(Debug, Clone)]
pub struct ChainDistributor {
    pub address: H160,
    pub created_at_block: u64,
    pub group_id: GroupId,
    pub range: ValidatorRange,
    pub legacy_wei: u128,
    pub balance_wei: u128,
    /// Oracle whose root the distributor checks withdrawals against.
    pub oracle: H160,
}

/// A submission that reached the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Landed {
    pub nonce: u64,
    pub call: ContractCall,
    pub reverted: bool,
}

#[derive(Default)]
struct ChainState {
    latest_block: u64,
    distributors: Vec<ChainDistributor>,
    roots: HashMap<H160, H256>,
    transaction_count: u64,
    landed: Vec<Landed>,
    faults: HashMap<H160, Fault>,
}

/// Stateful chain double: reports set the oracle root, withdrawals empty the
/// distributor, and nonces are checked against the operator's transaction count.
/// A withdrawal reverts unless its proof and amount verify against the root of the
/// distributor's oracle.
#[derive(Default)]
pub struct InMemoryChain {
    state: Mutex<ChainState>,
}

impl InMemoryChain {
    pub fn new(latest_block: u64, transaction_count: u64) -> Self {
        Self {
            state: Mutex::new(ChainState {
                latest_block,
                transaction_count,
                ..Default::default()
            }),
        }
    }

    pub fn add_distributor(&self, distributor: ChainDistributor) {
        self.state.lock().unwrap().distributors.push(distributor);
    }

    pub fn fund(&self, address: H160, wei: u128) {
        let mut state = self.state.lock().unwrap();
        if let Some(d) = state.distributors.iter_mut().find(|d| d.address == address) {
            d.balance_wei = wei;
        }
    }

    /// Fault applied to the next submission targeting `target`.
    pub fn fail_next(&self, target: H160, fault: Fault) {
        self.state.lock().unwrap().faults.insert(target, fault);
    }

    pub fn landed(&self) -> Vec<Landed> {
        self.state.lock().unwrap().landed.clone()
    }

    pub fn nonces(&self) -> Vec<u64> {
        self.landed().iter().map(|l| l.nonce).collect()
    }

    pub fn root(&self, oracle: H160) -> Option<H256> {
        self.state.lock().unwrap().roots.get(&oracle).copied()
    }

    pub fn set_root(&self, oracle: H160, root: H256) {
        self.state.lock().unwrap().roots.insert(oracle, root);
    }

    /// A transaction sent from the operator account by someone else.
    pub fn send_external(&self) {
        let mut state = self.state.lock().unwrap();
        state.transaction_count += 1;
        state.latest_block += 1;
    }

    pub fn confirmed_count(&self) -> u64 {
        self.state.lock().unwrap().transaction_count
    }

    /// What the contract checks: reports always pass, withdrawals need a proof of
    /// `(group, live validator count, amount)` under the oracle's current root.
    fn accepts(state: &ChainState, call: &ContractCall) -> bool {
        match call {
            ContractCall::Report { .. } => true,
            ContractCall::Withdraw {
                distributor,
                proof,
                amount,
            } => {
                let Ok(d) = Self::distributor(state, *distributor) else {
                    return false;
                };
                let Some(root) = state.roots.get(&d.oracle) else {
                    return false;
                };
                let leaf = MerkleLeaf::new(d.group_id, d.range.validator_count, *amount);
                MerkleTree::verify(*root, &leaf, proof)
            }
        }
    }

    fn distributor(state: &ChainState, address: H160) -> Result<ChainDistributor> {
        state
            .distributors
            .iter()
            .find(|d| d.address == address)
            .cloned()
            .ok_or_else(|| anyhow!("no contract at {:?}", address))
    }
}

/// The three distributors used across the end-to-end tests. Ledger rows from
/// [`three_group_ledger`] bring the totals to 1000, 550 and 200 gwei.
pub fn three_group_chain() -> InMemoryChain {
    let chain = InMemoryChain::new(25, 7);
    let groups = [
        (address(0xa0), 3, 0, ValidatorRange::new(0, 100), 900),
        (address(0xa1), 12, 1, ValidatorRange::new(100, 50), 550),
        (address(0xa2), 21, 2, ValidatorRange::new(150, 20), 150),
    ];
    for (address, created_at_block, group_id, range, legacy_gwei) in groups {
        chain.add_distributor(ChainDistributor {
            address,
            created_at_block,
            group_id,
            range,
            legacy_wei: gwei_to_wei(legacy_gwei) + 123,
            balance_wei: gwei_to_wei(1),
            oracle: ORACLE,
        });
    }
    chain
}

pub fn three_group_ledger() -> Vec<ValidatorEpochRecord> {
    vec![
        // group 0: one closed period worth 100
        record(0, 1, 60, None),
        record(0, 2, 40, Some(100)),
        // open period, contributes nothing
        record(0, 3, 500, None),
        // group 2: one closed period worth 50
        record(150, 1, 50, Some(50)),
        // outside every range
        record(999, 1, 10_000, Some(10_000)),
    ]
}

#[async_trait]
impl ChainReader for InMemoryChain {
    async fn latest_block(&self) -> Result<u64> {
        Ok(self.state.lock().unwrap().latest_block)
    }

    async fn distributor_created_events(
        &self,
        _factory: H160,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<DistributorCreated>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .distributors
            .iter()
            .filter(|d| (from_block..=to_block).contains(&d.created_at_block))
            .map(|d| DistributorCreated {
                distributor: d.address,
                block_number: d.created_at_block,
            })
            .collect())
    }

    async fn validator_range(&self, distributor: H160) -> Result<ValidatorRange> {
        let state = self.state.lock().unwrap();
        Ok(Self::distributor(&state, distributor)?.range)
    }

    async fn group_id(&self, distributor: H160) -> Result<GroupId> {
        let state = self.state.lock().unwrap();
        Ok(Self::distributor(&state, distributor)?.group_id)
    }

    async fn legacy_cumulative_reward(&self, distributor: H160) -> Result<u128> {
        let state = self.state.lock().unwrap();
        Ok(Self::distributor(&state, distributor)?.legacy_wei)
    }

    async fn balance(&self, account: H160) -> Result<u128> {
        let state = self.state.lock().unwrap();
        Ok(Self::distributor(&state, account).map_or(0, |d| d.balance_wei))
    }

    async fn active_root(&self, oracle: H160) -> Result<Option<H256>> {
        Ok(self.root(oracle))
    }

    async fn transaction_count(&self, _account: H160) -> Result<u64> {
        Ok(self.confirmed_count())
    }
}

#[async_trait]
impl ChainWriter for InMemoryChain {
    async fn submit(
        &self,
        call: &ContractCall,
        nonce: u64,
        _settings: &TxSettings,
    ) -> std::result::Result<TxReceipt, ChainError> {
        let mut state = self.state.lock().unwrap();
        if nonce != state.transaction_count {
            return Err(ChainError::Rejected(format!(
                "nonce {} does not match account nonce {}",
                nonce, state.transaction_count
            )));
        }

        let fault = state.faults.remove(&call.target());
        if fault == Some(Fault::Reject) {
            return Err(ChainError::Rejected("insufficient funds for gas".to_string()));
        }
        if fault == Some(Fault::TransportLost) {
            return Err(ChainError::Transport("connection reset".to_string()));
        }

        state.latest_block += 1;
        state.transaction_count += 1;
        let tx_hash = H256::from_low_u64_be(nonce + 1);
        let reverted = fault == Some(Fault::Revert) || !Self::accepts(&state, call);
        state.landed.push(Landed {
            nonce,
            call: call.clone(),
            reverted,
        });
        if reverted {
            return Err(ChainError::Reverted { tx_hash });
        }

        match call {
            ContractCall::Report { oracle, root } => {
                state.roots.insert(*oracle, *root);
            }
            ContractCall::Withdraw { distributor, .. } => {
                if let Some(d) = state.distributors.iter_mut().find(|d| d.address == *distributor) {
                    d.balance_wei = 0;
                }
            }
        }

        if fault == Some(Fault::TransportLanded) {
            return Err(ChainError::Transport("timed out waiting for receipt".to_string()));
        }

        Ok(TxReceipt {
            tx_hash,
            block_number: state.latest_block,
            nonce,
        })
    }
}

pub struct InMemoryLedger {
    records: Vec<ValidatorEpochRecord>,
}

impl InMemoryLedger {
    pub fn new(records: Vec<ValidatorEpochRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl LedgerRepository for InMemoryLedger {
    async fn fetch_epoch_records(
        &self,
        validator_ids: &[ValidatorId],
        cutoff: Option<NaiveDate>,
    ) -> Result<Vec<ValidatorEpochRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| validator_ids.contains(&r.validator_id))
            .filter(|r| cutoff.map_or(true, |c| r.epoch_date >= c))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryCommitments {
    dump: Mutex<Option<TreeDump>>,
}

impl InMemoryCommitments {
    pub fn stored(&self) -> Option<TreeDump> {
        self.dump.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommitmentRepository for InMemoryCommitments {
    async fn save(&self, dump: &TreeDump) -> Result<()> {
        *self.dump.lock().unwrap() = Some(dump.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<TreeDump>> {
        Ok(self.stored())
    }
}
