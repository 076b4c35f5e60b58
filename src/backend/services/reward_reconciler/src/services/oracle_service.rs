use sp_core::{H160, H256};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::models::chain::ContractCall;
use crate::models::OracleReport;
use crate::repositories::traits::ChainReader;
use crate::services::submission_queue::SubmissionHandle;
use crate::utils::crypto::CryptoUtils;
use crate::utils::errors::Result;

/// Publishes commitment roots to the oracle. The oracle holds exactly one root; a
/// confirmed report replaces whatever was there.
pub struct OracleService {
    reader: Arc<dyn ChainReader>,
    submitter: SubmissionHandle,
    oracle: H160,
    active: RwLock<Option<OracleReport>>,
}

impl OracleService {
    pub fn new(reader: Arc<dyn ChainReader>, submitter: SubmissionHandle, oracle: H160) -> Self {
        Self {
            reader,
            submitter,
            oracle,
            active: RwLock::new(None),
        }
    }

    pub async fn publish(&self, root: H256) -> Result<OracleReport> {
        let current = match self.reader.active_root(self.oracle).await {
            Ok(current) => current,
            Err(e) => {
                warn!(oracle = ?self.oracle, error = %e, "could not read active root, publishing anyway");
                None
            }
        };

        let report = if current == Some(root) {
            info!(root = %CryptoUtils::to_hex(&root), "root already active, nothing to publish");
            OracleReport {
                root,
                tx_hash: None,
                block_number: None,
            }
        } else {
            info!(oracle = ?self.oracle, root = %CryptoUtils::to_hex(&root), "publishing root");
            let receipt = self
                .submitter
                .submit(ContractCall::Report {
                    oracle: self.oracle,
                    root,
                })
                .await?;
            OracleReport {
                root,
                tx_hash: Some(receipt.tx_hash),
                block_number: Some(receipt.block_number),
            }
        };

        *self.active.write().await = Some(report.clone());
        Ok(report)
    }

    /// The report most recently confirmed by this service.
    pub async fn active_report(&self) -> Option<OracleReport> {
        self.active.read().await.clone()
    }
}
