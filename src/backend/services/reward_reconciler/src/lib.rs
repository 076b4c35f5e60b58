//! Reconciles validator rewards into a Merkle commitment of per-distributor
//! entitlements, publishes its root to the oracle and withdraws every distributor
//! against it.

pub mod config;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;

pub use config::{Network, ReconcilerConfig};
pub use utils::errors::{ChainError, ReconcilerError, Result};
pub use utils::merkle::{MerkleTree, TreeDump};
