use reward_models::GroupId;
use sp_core::{H160, H256};
use thiserror::Error;

/// Failure of a single mutating chain call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Mined but reverted; the nonce is spent.
    #[error("transaction {tx_hash:?} reverted")]
    Reverted { tx_hash: H256 },

    /// Refused by the node before broadcast (bad nonce, underpriced, out of gas estimate).
    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl ChainError {
    pub fn consumes_nonce(&self) -> bool {
        matches!(self, ChainError::Reverted { .. })
    }
}

#[derive(Error, Debug)]
pub enum ReconcilerError {
    #[error("no legacy record for distributor group {0}")]
    UnmatchedGroup(GroupId),

    #[error("ledger provider unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("commitment has no leaves")]
    EmptyLeafSet,

    #[error("malformed leaf for group {group_id}: {reason}")]
    MalformedLeaf { group_id: GroupId, reason: String },

    #[error("distributor group {0} appears more than once")]
    DuplicateGroup(GroupId),

    #[error("validator ranges of groups {0} and {1} overlap")]
    OverlappingRanges(GroupId, GroupId),

    #[error("malformed tree dump: {0}")]
    MalformedDump(String),

    #[error("commitment store failed: {0}")]
    CommitmentStore(String),

    #[error("no leaf for distributor group {0}")]
    LeafNotFound(GroupId),

    #[error("leaf mismatch for distributor {address:?}: {reason}")]
    LeafMismatch { address: H160, reason: String },

    #[error("chain read failed: {0}")]
    ChainRead(String),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("submission queue closed")]
    QueueClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReconcilerError {
    pub fn chain_read(err: anyhow::Error) -> Self {
        ReconcilerError::ChainRead(format!("{:#}", err))
    }
}

pub type Result<T> = std::result::Result<T, ReconcilerError>;
