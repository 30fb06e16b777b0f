// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! blkchain-core: transaction and block model, hash chain, and ledger document verification.

pub mod error;
pub mod hash;
pub mod types;
pub mod verify;

pub use error::{CoreError, CoreResult};
pub use types::{Block, Transaction, GENESIS_PREV_HASH};
pub use verify::{verify_ledger, LedgerDocument, LedgerSummary, LedgerTail};

#[cfg(test)]
pub mod tests;
