use async_trait::async_trait;
use sp_core::H256;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use crate::models::chain::{ContractCall, TxReceipt, TxSettings};
use crate::repositories::traits::ChainWriter;
use crate::utils::errors::ChainError;

/// Logs every call instead of broadcasting it and answers with a synthetic receipt.
pub struct DryRunWriter {
    next_block: AtomicU64,
}

impl DryRunWriter {
    pub fn new(start_block: u64) -> Self {
        Self {
            next_block: AtomicU64::new(start_block),
        }
    }
}

#[async_trait]
impl ChainWriter for DryRunWriter {
    async fn submit(
        &self,
        call: &ContractCall,
        nonce: u64,
        settings: &TxSettings,
    ) -> Result<TxReceipt, ChainError> {
        let block_number = self.next_block.fetch_add(1, Ordering::SeqCst);
        let encoded = serde_json::to_vec(call).map_err(|e| ChainError::Rejected(e.to_string()))?;
        let mut preimage = nonce.to_be_bytes().to_vec();
        preimage.extend_from_slice(&encoded);
        let tx_hash = H256::from(sp_core::keccak_256(&preimage));

        info!(
            call = call.name(),
            target = ?call.target(),
            nonce,
            gas_limit = settings.gas_limit,
            tx_hash = ?tx_hash,
            "dry run: transaction not broadcast"
        );

        Ok(TxReceipt {
            tx_hash,
            block_number,
            nonce,
        })
    }
}
