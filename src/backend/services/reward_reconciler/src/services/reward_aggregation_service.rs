//! Settled reward per validator from raw epoch accounting rows.
//!
//! A validator's history is cut into withdrawal periods, each ending with the epoch
//! in which a balance withdrawal was observed. Only closed periods settle; the open
//! tail is picked up by a later run once its withdrawal lands.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::models::period::{ValidatorAggregates, WithdrawalPeriod};
use crate::models::units::VALIDATOR_PRINCIPAL_GWEI;
use crate::models::{ValidatorEpochRecord, ValidatorId};

pub struct RewardAggregationService {
    cutoff: Option<NaiveDate>,
}

impl RewardAggregationService {
    /// `cutoff` drops every record dated before it (production cutover).
    pub fn new(cutoff: Option<NaiveDate>) -> Self {
        Self { cutoff }
    }

    /// Withdrawal periods of every validator, ordered by validator then ordinal.
    /// Slashed rows and rows dated before the cutoff are left out.
    pub fn withdrawal_periods(&self, records: &[ValidatorEpochRecord]) -> Vec<WithdrawalPeriod> {
        let mut slashed = 0usize;
        let mut histories: BTreeMap<ValidatorId, Vec<&ValidatorEpochRecord>> = BTreeMap::new();
        for record in records {
            if record.slashed {
                slashed += 1;
                continue;
            }
            if self.cutoff.map_or(false, |cutoff| record.epoch_date < cutoff) {
                continue;
            }
            histories.entry(record.validator_id).or_default().push(record);
        }

        if slashed > 0 {
            debug!(rows = slashed, "skipping slashed rows");
        }

        let mut periods = Vec::new();
        for (validator_id, mut history) in histories {
            history.sort_by_key(|r| r.epoch);
            periods.extend(Self::split_periods(validator_id, &history));
        }

        periods
    }

    fn split_periods(validator_id: ValidatorId, history: &[&ValidatorEpochRecord]) -> Vec<WithdrawalPeriod> {
        let mut periods = Vec::new();
        let mut current: Option<WithdrawalPeriod> = None;

        for record in history {
            let ordinal = periods.len() as u64 + 1;
            let period = current.get_or_insert_with(|| WithdrawalPeriod {
                validator_id,
                ordinal,
                first_epoch: record.epoch,
                last_epoch: record.epoch,
                earned_sum: 0,
                withdrawn_sum: None,
            });

            period.earned_sum += record.rewards.net();
            period.last_epoch = record.epoch;

            if let Some(withdrawn) = record.balance_withdrawn {
                let reward_part = (withdrawn % VALIDATOR_PRINCIPAL_GWEI) as i128;
                *period.withdrawn_sum.get_or_insert(0) += reward_part;
                periods.extend(current.take());
            }
        }

        periods.extend(current);
        periods
    }

    /// Sum of closed-period contributions per validator. Validators without a closed
    /// period are absent.
    pub fn aggregate(&self, records: &[ValidatorEpochRecord]) -> ValidatorAggregates {
        let periods = self.withdrawal_periods(records);

        let mut aggregates = ValidatorAggregates::new();
        let mut open = 0usize;
        for period in &periods {
            match period.contribution() {
                Some(amount) => *aggregates.entry(period.validator_id).or_insert(0) += amount,
                None => open += 1,
            }
        }

        info!(
            records = records.len(),
            periods = periods.len(),
            open_periods = open,
            validators = aggregates.len(),
            "aggregated validator rewards"
        );

        aggregates
    }
}
