use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::models::{ValidatorEpochRecord, ValidatorId};
use crate::repositories::traits::LedgerRepository;

/// A JSON array of ledger rows, as exported from the warehouse.
pub struct JsonLedgerRepository {
    path: PathBuf,
}

impl JsonLedgerRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl LedgerRepository for JsonLedgerRepository {
    async fn fetch_epoch_records(
        &self,
        validator_ids: &[ValidatorId],
        cutoff: Option<NaiveDate>,
    ) -> Result<Vec<ValidatorEpochRecord>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading ledger export {}", self.path.display()))?;
        let rows: Vec<ValidatorEpochRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing ledger export {}", self.path.display()))?;

        let wanted: BTreeSet<ValidatorId> = validator_ids.iter().copied().collect();
        let mut records: Vec<ValidatorEpochRecord> = rows
            .into_iter()
            .filter(|r| wanted.contains(&r.validator_id))
            .filter(|r| cutoff.map_or(true, |date| r.epoch_date >= date))
            .collect();
        records.sort_by_key(|r| (r.validator_id, r.epoch));

        Ok(records)
    }
}
