use anyhow::{anyhow, bail, Context, Result};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use reward_models::GroupId;
use reward_reconciler::{
    repositories::{
        postgres::{create_pool, PostgresConfig},
        traits::{ChainReader, CommitmentRepository, LedgerRepository},
        DryRunWriter, FileCommitmentRepository, JsonLedgerRepository, PostgresLedgerRepository,
        SnapshotChainReader,
    },
    services::{ReconcileMode, ReconciliationService},
    utils::crypto::CryptoUtils,
    MerkleTree, ReconcilerConfig,
};

const MAX_DB_CONNECTIONS: u32 = 5;

/// Operator commands
pub struct ReconcilerCommands {
    config: ReconcilerConfig,
}

impl ReconcilerCommands {
    pub fn new(config: ReconcilerConfig) -> Self {
        Self { config }
    }

    /// Build the commitment and persist it without touching the chain.
    pub async fn report(&self) -> Result<()> {
        let summary = self.service().await?.run(ReconcileMode::ReportOnly).await?;

        println!("Root: {}", CryptoUtils::to_hex(&summary.root));
        println!("Leaves: {}", summary.leaves);
        println!("Tree written to {}", self.config.tree_path.display());
        Ok(())
    }

    /// Full cycle: commitment, publish, withdrawals.
    pub async fn run(&self) -> Result<()> {
        let summary = self.service().await?.run(ReconcileMode::Full).await?;

        println!("Run {}", summary.run_id);
        println!("Root: {}", CryptoUtils::to_hex(&summary.root));
        if let Some(report) = &summary.report {
            match report.tx_hash {
                Some(tx_hash) => println!("Published in {}", CryptoUtils::to_hex(&tx_hash)),
                None => println!("Root already active, not republished"),
            }
        }
        if let Some(withdrawals) = &summary.withdrawals {
            println!("{}", serde_json::to_string_pretty(withdrawals)?);
        }
        Ok(())
    }

    /// Withdraw against the persisted tree.
    pub async fn withdraw(&self) -> Result<()> {
        let report = self.service().await?.withdraw_from_artifact().await?;

        println!("{}", serde_json::to_string_pretty(&report)?);
        if report.failed() > 0 {
            bail!("{} of {} withdrawals failed", report.failed(), report.outcomes.len());
        }
        Ok(())
    }

    /// Print the leaf value and proof for one distributor group.
    pub async fn proof(&self, group_id: GroupId) -> Result<()> {
        let tree = self.load_tree().await?;
        let (leaf, proof) = tree.proof_for_group(group_id)?;

        let output = json!({
            "root": CryptoUtils::to_hex(&tree.root()),
            "value": [
                leaf.group_id.to_string(),
                leaf.validator_count.to_string(),
                leaf.amount.0.to_string(),
            ],
            "proof": proof.iter().map(CryptoUtils::to_hex).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    /// Reload the persisted tree and check every proof against its root.
    pub async fn verify(&self) -> Result<()> {
        let tree = self.load_tree().await?;

        for (index, leaf) in tree.leaves().iter().enumerate() {
            let proof = tree
                .proof(index)
                .ok_or_else(|| anyhow!("no proof for leaf {}", index))?;
            if !MerkleTree::verify(tree.root(), leaf, &proof) {
                bail!("proof for group {} does not reproduce the root", leaf.group_id);
            }
        }

        println!("Root: {}", CryptoUtils::to_hex(&tree.root()));
        println!("All {} proofs verified", tree.len());
        Ok(())
    }

    async fn load_tree(&self) -> Result<MerkleTree> {
        let dump = self
            .commitments()
            .load()
            .await?
            .ok_or_else(|| anyhow!("no tree at {}", self.config.tree_path.display()))?;
        Ok(MerkleTree::load(&dump)?)
    }

    fn commitments(&self) -> FileCommitmentRepository {
        FileCommitmentRepository::new(&self.config.tree_path)
    }

    async fn service(&self) -> Result<ReconciliationService> {
        let ledger = self.ledger().await?;
        let reader = self.chain_reader().await?;
        let latest = reader.latest_block().await?;

        Ok(ReconciliationService::new(
            self.config.clone(),
            ledger,
            reader,
            Arc::new(DryRunWriter::new(latest + 1)),
            Arc::new(self.commitments()),
        ))
    }

    async fn ledger(&self) -> Result<Arc<dyn LedgerRepository>> {
        if let Some(url) = &self.config.database_url {
            let pool = create_pool(&PostgresConfig {
                connection_string: url.clone(),
                max_connections: MAX_DB_CONNECTIONS,
            })
            .await
            .context("connecting to the ledger database")?;
            info!("using postgres ledger");
            return Ok(Arc::new(PostgresLedgerRepository::new(pool)));
        }

        let path = self
            .config
            .ledger_export_path
            .as_deref()
            .ok_or_else(|| anyhow!("no ledger source configured"))?;
        info!(path = %path.display(), "using ledger export");
        Ok(Arc::new(JsonLedgerRepository::new(path)))
    }

    async fn chain_reader(&self) -> Result<Arc<dyn ChainReader>> {
        let path: &Path = self
            .config
            .chain_snapshot_path
            .as_deref()
            .ok_or_else(|| anyhow!("chain_snapshot_path is required; this binary has no RPC client"))?;
        info!(path = %path.display(), "using chain snapshot");
        Ok(Arc::new(SnapshotChainReader::from_file(path).await?))
    }
}
