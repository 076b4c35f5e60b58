pub mod dry_run;
pub mod file;
pub mod postgres;
pub mod traits;

pub use dry_run::DryRunWriter;
pub use file::{FileCommitmentRepository, JsonLedgerRepository, SnapshotChainReader};
pub use postgres::PostgresLedgerRepository;
pub use traits::{ChainReader, ChainWriter, CommitmentRepository, LedgerRepository};
