use sp_core::{H160, H256};
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::config::ReconcilerConfig;
use crate::models::withdrawal::WithdrawalReport;
use crate::models::OracleReport;
use crate::repositories::traits::{ChainReader, ChainWriter, CommitmentRepository, LedgerRepository};
use crate::services::batch_grouping_service::BatchGroupingService;
use crate::services::discovery_service::DiscoveryService;
use crate::services::oracle_service::OracleService;
use crate::services::reward_aggregation_service::RewardAggregationService;
use crate::services::submission_queue::SubmissionQueue;
use crate::services::withdrawal_service::WithdrawalService;
use crate::utils::crypto::CryptoUtils;
use crate::utils::errors::{ReconcilerError, Result};
use crate::utils::merkle::MerkleTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Build and persist the commitment, touch nothing on chain.
    ReportOnly,
    /// Build, persist, publish the root and withdraw every distributor.
    Full,
}

#[derive(Debug)]
pub struct ReconciliationSummary {
    pub run_id: Uuid,
    pub root: H256,
    pub leaves: usize,
    pub report: Option<OracleReport>,
    pub withdrawals: Option<WithdrawalReport>,
}

/// Drives one reconciliation cycle end to end.
pub struct ReconciliationService {
    config: ReconcilerConfig,
    ledger: Arc<dyn LedgerRepository>,
    reader: Arc<dyn ChainReader>,
    writer: Arc<dyn ChainWriter>,
    commitments: Arc<dyn CommitmentRepository>,
}

impl ReconciliationService {
    pub fn new(
        config: ReconcilerConfig,
        ledger: Arc<dyn LedgerRepository>,
        reader: Arc<dyn ChainReader>,
        writer: Arc<dyn ChainWriter>,
        commitments: Arc<dyn CommitmentRepository>,
    ) -> Self {
        Self {
            config,
            ledger,
            reader,
            writer,
            commitments,
        }
    }

    fn discovery(&self) -> DiscoveryService {
        DiscoveryService::new(
            Arc::clone(&self.reader),
            self.config.factory_from_block,
            self.config.log_chunk_size,
        )
    }

    /// Discovery, aggregation and grouping. Returns the tree together with the
    /// discovered distributor addresses in creation order.
    pub async fn build_commitment(&self) -> Result<(MerkleTree, Vec<H160>)> {
        let discovery = self.discovery();
        let addresses = discovery.discover_addresses(self.config.factory_address).await?;
        let descriptors = discovery.describe(&addresses).await?;
        BatchGroupingService::validate_descriptors(&descriptors)?;

        let validator_ids = BatchGroupingService::validator_ids(&descriptors);
        let cutoff = self.config.ledger_cutoff();
        let aggregator = RewardAggregationService::new(cutoff);

        let aggregation = async {
            let records = self
                .ledger
                .fetch_epoch_records(&validator_ids, cutoff)
                .await
                .map_err(|e| ReconcilerError::LedgerUnavailable(format!("{:#}", e)))?;
            Ok::<_, ReconcilerError>(aggregator.aggregate(&records))
        };
        let (legacy, aggregates) = tokio::try_join!(discovery.legacy_records(&descriptors), aggregation)?;

        let leaves = BatchGroupingService::build_leaves(&descriptors, &legacy, &aggregates)?;
        let tree = MerkleTree::build(leaves)?;
        info!(root = %CryptoUtils::to_hex(&tree.root()), leaves = tree.len(), "commitment built");

        Ok((tree, addresses))
    }

    pub async fn run(&self, mode: ReconcileMode) -> Result<ReconciliationSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("reconcile", run_id = %run_id);

        self.cycle(run_id, mode).instrument(span).await
    }

    async fn cycle(&self, run_id: Uuid, mode: ReconcileMode) -> Result<ReconciliationSummary> {
        info!(?mode, network = ?self.config.network, "reconciliation started");

        let (tree, addresses) = self.build_commitment().await?;
        self.commitments
            .save(&tree.dump())
            .await
            .map_err(|e| ReconcilerError::CommitmentStore(format!("{:#}", e)))?;
        info!("commitment persisted");

        let mut summary = ReconciliationSummary {
            run_id,
            root: tree.root(),
            leaves: tree.len(),
            report: None,
            withdrawals: None,
        };
        if mode == ReconcileMode::ReportOnly {
            info!("report-only run finished");
            return Ok(summary);
        }

        let (handle, worker) = self.submission_queue().start().await?;

        let oracle = OracleService::new(Arc::clone(&self.reader), handle.clone(), self.config.oracle_address);
        summary.report = Some(oracle.publish(tree.root()).await?);

        let withdrawals = WithdrawalService::new(Arc::clone(&self.reader), handle);
        summary.withdrawals = Some(withdrawals.withdraw_all(&tree, &addresses).await);

        // The queue drains once the last handle is gone.
        drop(oracle);
        drop(withdrawals);
        let nonce = worker.await.map_err(|_| ReconcilerError::QueueClosed)?;
        info!(next_nonce = nonce.value(), "reconciliation finished");

        Ok(summary)
    }

    fn submission_queue(&self) -> SubmissionQueue {
        SubmissionQueue::new(
            Arc::clone(&self.writer),
            Arc::clone(&self.reader),
            self.config.operator_address,
            self.config.tx_settings(),
        )
    }

    /// Withdraw against a previously persisted commitment without recomputing it.
    /// The artifact's root is published first unless the oracle already serves it.
    pub async fn withdraw_from_artifact(&self) -> Result<WithdrawalReport> {
        let dump = self
            .commitments
            .load()
            .await
            .map_err(|e| ReconcilerError::CommitmentStore(format!("{:#}", e)))?
            .ok_or_else(|| ReconcilerError::CommitmentStore("no persisted commitment".to_string()))?;
        let tree = MerkleTree::load(&dump)?;

        let addresses = self
            .discovery()
            .discover_addresses(self.config.factory_address)
            .await?;

        let (handle, worker) = self.submission_queue().start().await?;

        // Proofs only hold against the root the oracle serves.
        OracleService::new(Arc::clone(&self.reader), handle.clone(), self.config.oracle_address)
            .publish(tree.root())
            .await?;

        let report = WithdrawalService::new(Arc::clone(&self.reader), handle)
            .withdraw_all(&tree, &addresses)
            .await;
        let nonce = worker.await.map_err(|_| ReconcilerError::QueueClosed)?;
        info!(next_nonce = nonce.value(), "withdrawal from artifact finished");

        Ok(report)
    }
}
