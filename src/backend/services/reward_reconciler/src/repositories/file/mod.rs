//! File-backed adapters for offline reporting and dry runs.

mod chain_snapshot;
mod commitment_repository;
mod ledger_repository;

pub use chain_snapshot::{ChainSnapshot, DistributorSnapshot, OracleSnapshot, SnapshotChainReader};
pub use commitment_repository::FileCommitmentRepository;
pub use ledger_repository::JsonLedgerRepository;
