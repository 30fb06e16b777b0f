//! Error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// The ledger bytes are not a JSON document of the expected shape.
    #[error("ledger document is not valid: {0}")]
    Json(#[from] serde_json::Error),

    /// Epoch keys must read `invts-<unix-seconds>`.
    #[error("epoch label {0:?} is not of the form invts-<unix-seconds>")]
    EpochLabel(String),

    #[error("block {block} of epoch {epoch} has no transactions")]
    EmptyBlock { epoch: String, block: usize },

    #[error("transaction {tx} of block {block} in epoch {epoch}: stored id {found:?} does not match derived id {expected}")]
    TransactionId {
        epoch: String,
        block: usize,
        tx: usize,
        expected: String,
        found: String,
    },

    #[error("block {block} of epoch {epoch}: prev-block-hash {found:?} does not link to {expected}")]
    ChainLink {
        epoch: String,
        block: usize,
        expected: String,
        found: String,
    },

    #[error("block {block} of epoch {epoch}: block-hash {found:?} does not match derived hash {expected}")]
    BlockHash {
        epoch: String,
        block: usize,
        expected: String,
        found: String,
    },
}

pub type CoreResult<T> = core::result::Result<T, CoreError>;
