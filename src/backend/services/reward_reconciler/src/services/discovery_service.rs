use futures::future::try_join_all;
use sp_core::H160;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::{DistributorDescriptor, Gwei, LegacyRecord};
use crate::repositories::traits::ChainReader;
use crate::utils::errors::{ReconcilerError, Result};

/// First stage of a run: turns the factory's event log into an ordered list of
/// distributor descriptors. Read-only, so every lookup is issued concurrently.
pub struct DiscoveryService {
    reader: Arc<dyn ChainReader>,
    from_block: u64,
    chunk_size: u64,
}

impl DiscoveryService {
    pub fn new(reader: Arc<dyn ChainReader>, from_block: u64, chunk_size: u64) -> Self {
        Self {
            reader,
            from_block,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Distributor addresses in creation order, replayed from `from_block` to the
    /// latest block.
    pub async fn discover_addresses(&self, factory: H160) -> Result<Vec<H160>> {
        let latest = self
            .reader
            .latest_block()
            .await
            .map_err(ReconcilerError::chain_read)?;

        let mut seen = HashSet::new();
        let mut addresses = Vec::new();
        let mut start = self.from_block;
        while start <= latest {
            let end = start.saturating_add(self.chunk_size - 1).min(latest);
            let events = self
                .reader
                .distributor_created_events(factory, start, end)
                .await
                .map_err(ReconcilerError::chain_read)?;
            debug!(from = start, to = end, events = events.len(), "scanned factory log");

            for event in events {
                if seen.insert(event.distributor) {
                    addresses.push(event.distributor);
                }
            }

            if end == u64::MAX {
                break;
            }
            start = end + 1;
        }

        info!(factory = ?factory, latest_block = latest, distributors = addresses.len(), "discovered distributors");
        Ok(addresses)
    }

    pub async fn describe(&self, addresses: &[H160]) -> Result<Vec<DistributorDescriptor>> {
        let lookups = addresses.iter().map(|&address| {
            let reader = Arc::clone(&self.reader);
            async move {
                let (range, group_id) =
                    tokio::try_join!(reader.validator_range(address), reader.group_id(address))?;
                Ok::<_, anyhow::Error>(DistributorDescriptor {
                    address,
                    group_id,
                    range,
                })
            }
        });

        let mut descriptors = try_join_all(lookups)
            .await
            .map_err(ReconcilerError::chain_read)?;
        descriptors.sort_by_key(|d| d.group_id);

        Ok(descriptors)
    }

    pub async fn legacy_records(&self, descriptors: &[DistributorDescriptor]) -> Result<Vec<LegacyRecord>> {
        let lookups = descriptors.iter().map(|d| {
            let reader = Arc::clone(&self.reader);
            let (address, group_id) = (d.address, d.group_id);
            async move {
                let wei = reader.legacy_cumulative_reward(address).await?;
                Ok::<_, anyhow::Error>(LegacyRecord {
                    group_id,
                    address,
                    carry_over: Gwei::from_wei(wei),
                })
            }
        });

        try_join_all(lookups)
            .await
            .map_err(ReconcilerError::chain_read)
    }
}
