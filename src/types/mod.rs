// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Ledger data model.

pub mod block;
pub mod transaction;

pub use block::Block;
pub use transaction::Transaction;

/// `prev-block-hash` of the very first block ever written to a ledger file.
pub const GENESIS_PREV_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Prefix of the per-invocation keys in the ledger document.
pub const EPOCH_LABEL_PREFIX: &str = "invts-";

/// Key under which one process invocation's blocks are grouped.
pub fn epoch_label(invocation_ts: i64) -> String {
    format!("{EPOCH_LABEL_PREFIX}{invocation_ts}")
}

/// Inverse of [`epoch_label`].
pub fn parse_epoch_label(label: &str) -> Option<i64> {
    label.strip_prefix(EPOCH_LABEL_PREFIX)?.parse().ok()
}
