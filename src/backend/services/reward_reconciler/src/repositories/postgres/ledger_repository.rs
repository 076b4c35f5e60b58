use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};

use crate::models::{RewardComponents, ValidatorEpochRecord, ValidatorId};
use crate::repositories::traits::LedgerRepository;

/// Reads the `validators_summary` warehouse table.
pub struct PostgresLedgerRepository {
    pool: PgPool,
}

impl PostgresLedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    val_id: i64,
    epoch: i64,
    epoch_date: NaiveDate,
    val_balance_withdrawn: Option<i64>,
    att_earned_reward: Option<i64>,
    propose_earned_reward: Option<i64>,
    sync_earned_reward: Option<i64>,
    att_penalty: Option<i64>,
    propose_penalty: Option<i64>,
    sync_penalty: Option<i64>,
    val_slashed: bool,
}

impl TryFrom<SummaryRow> for ValidatorEpochRecord {
    type Error = anyhow::Error;

    fn try_from(r: SummaryRow) -> Result<Self> {
        Ok(ValidatorEpochRecord {
            validator_id: u64::try_from(r.val_id).context("negative validator id")?,
            epoch: u64::try_from(r.epoch).context("negative epoch")?,
            epoch_date: r.epoch_date,
            balance_withdrawn: r
                .val_balance_withdrawn
                .map(u64::try_from)
                .transpose()
                .context("negative withdrawn balance")?,
            rewards: RewardComponents {
                attestation_reward: r.att_earned_reward,
                proposal_reward: r.propose_earned_reward,
                sync_reward: r.sync_earned_reward,
                attestation_penalty: r.att_penalty,
                proposal_penalty: r.propose_penalty,
                sync_penalty: r.sync_penalty,
            },
            slashed: r.val_slashed,
        })
    }
}

#[async_trait]
impl LedgerRepository for PostgresLedgerRepository {
    async fn fetch_epoch_records(
        &self,
        validator_ids: &[ValidatorId],
        cutoff: Option<NaiveDate>,
    ) -> Result<Vec<ValidatorEpochRecord>> {
        let ids = validator_ids
            .iter()
            .map(|id| i64::try_from(*id))
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("validator id out of range")?;

        let rows: Vec<SummaryRow> = sqlx::query_as(
            r#"
            SELECT
                val_id, epoch, epoch_date, val_balance_withdrawn,
                att_earned_reward, propose_earned_reward, sync_earned_reward,
                att_penalty, propose_penalty, sync_penalty,
                COALESCE(val_slashed, 0) = 1 AS val_slashed
            FROM validators_summary
            WHERE val_id = ANY($1)
              AND ($2::date IS NULL OR epoch_date >= $2)
            ORDER BY val_id, epoch
            "#,
        )
        .bind(&ids)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .context("querying validators_summary")?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(ValidatorEpochRecord::try_from(row)?);
        }

        Ok(records)
    }
}
