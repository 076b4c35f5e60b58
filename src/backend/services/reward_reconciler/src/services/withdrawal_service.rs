use sp_core::H160;
use std::sync::Arc;
use tracing::{error, info};

use crate::models::chain::ContractCall;
use crate::models::withdrawal::{WithdrawalOutcome, WithdrawalReport};
use crate::repositories::traits::ChainReader;
use crate::services::submission_queue::SubmissionHandle;
use crate::utils::errors::{ReconcilerError, Result};
use crate::utils::merkle::MerkleTree;

/// Withdraws every distributor's committed amount with its Merkle proof.
///
/// Distributors are processed one at a time. A failure is recorded against that
/// distributor and the batch moves on.
pub struct WithdrawalService {
    reader: Arc<dyn ChainReader>,
    submitter: SubmissionHandle,
}

impl WithdrawalService {
    pub fn new(reader: Arc<dyn ChainReader>, submitter: SubmissionHandle) -> Self {
        Self { reader, submitter }
    }

    pub async fn withdraw_all(&self, tree: &MerkleTree, distributors: &[H160]) -> WithdrawalReport {
        info!(distributors = distributors.len(), "withdrawal pass started");

        let mut report = WithdrawalReport::default();
        for &distributor in distributors {
            let outcome = match self.withdraw_one(tree, distributor).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(distributor = ?distributor, error = %e, "withdrawal failed");
                    WithdrawalOutcome::Failed {
                        distributor,
                        error: e.to_string(),
                    }
                }
            };
            report.outcomes.push(outcome);
        }

        info!(
            withdrawn = report.withdrawn(),
            skipped = report.skipped(),
            failed = report.failed(),
            total = %report.total_withdrawn(),
            "withdrawal pass finished"
        );
        report
    }

    pub async fn withdraw_one(&self, tree: &MerkleTree, distributor: H160) -> Result<WithdrawalOutcome> {
        let (range, group_id) = tokio::try_join!(
            self.reader.validator_range(distributor),
            self.reader.group_id(distributor)
        )
        .map_err(ReconcilerError::chain_read)?;

        let (leaf, proof) = tree.proof_for_group(group_id)?;
        if leaf.validator_count != range.validator_count {
            return Err(ReconcilerError::LeafMismatch {
                address: distributor,
                reason: format!(
                    "leaf covers {} validators, contract reports {}",
                    leaf.validator_count, range.validator_count
                ),
            });
        }
        if !MerkleTree::verify(tree.root(), &leaf, &proof) {
            return Err(ReconcilerError::LeafMismatch {
                address: distributor,
                reason: "proof does not reproduce the root".to_string(),
            });
        }

        let balance = self
            .reader
            .balance(distributor)
            .await
            .map_err(ReconcilerError::chain_read)?;
        if balance == 0 {
            info!(distributor = ?distributor, group_id, "zero balance, skipping");
            return Ok(WithdrawalOutcome::SkippedZeroBalance { distributor });
        }

        info!(distributor = ?distributor, group_id, amount = %leaf.amount, balance_wei = balance, "will withdraw");
        let receipt = self
            .submitter
            .submit(ContractCall::Withdraw {
                distributor,
                proof,
                amount: leaf.amount,
            })
            .await?;
        info!(distributor = ?distributor, tx_hash = ?receipt.tx_hash, "withdrew");

        Ok(WithdrawalOutcome::Withdrawn {
            distributor,
            group_id,
            amount: leaf.amount,
            tx_hash: receipt.tx_hash,
        })
    }
}
