use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// Beacon-chain validator index.
pub type ValidatorId = u64;

/// Identity of a distributor group, as reported by the distributor contract.
pub type GroupId = u64;

pub const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Principal of one validator in gwei. Withdrawn balances are taken modulo this
/// value so that only the reward part is counted.
pub const VALIDATOR_PRINCIPAL_GWEI: u64 = 32_000_000_000;

/// Canonical amount unit of the whole pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Gwei(pub u128);

impl Gwei {
    pub const ZERO: Gwei = Gwei(0);

    /// Convert an on-chain wei amount, rounding down.
    pub fn from_wei(wei: u128) -> Self {
        Gwei(wei / WEI_PER_GWEI)
    }

    pub fn to_wei(self) -> Option<u128> {
        self.0.checked_mul(WEI_PER_GWEI)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Gwei) -> Option<Gwei> {
        self.0.checked_add(other.0).map(Gwei)
    }
}

impl Add for Gwei {
    type Output = Gwei;

    fn add(self, other: Gwei) -> Gwei {
        Gwei(self.0 + other.0)
    }
}

impl Sum for Gwei {
    fn sum<I: Iterator<Item = Gwei>>(iter: I) -> Gwei {
        iter.fold(Gwei::ZERO, Add::add)
    }
}

impl fmt::Display for Gwei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} gwei", self.0)
    }
}
