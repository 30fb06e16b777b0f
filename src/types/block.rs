// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use serde::{Deserialize, Serialize};

use super::{Transaction, GENESIS_PREV_HASH};
use crate::hash;

/// A batch of transactions closed together and linked to its predecessor.
///
/// `block_hash` stays empty while the block is open and is set once by [`Block::seal`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "prev-block-hash")]
    pub prev_hash: String,
    #[serde(rename = "block-hash")]
    pub block_hash: String,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// An open, empty block chained onto `prev_hash`.
    pub fn open(prev_hash: impl Into<String>) -> Self {
        Self {
            prev_hash: prev_hash.into(),
            block_hash: String::new(),
            transactions: Vec::new(),
        }
    }

    pub fn genesis() -> Self {
        Self::open(GENESIS_PREV_HASH)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn is_sealed(&self) -> bool {
        !self.block_hash.is_empty()
    }

    pub fn push(&mut self, tx: Transaction) {
        debug_assert!(!self.is_sealed(), "push into a sealed block");
        self.transactions.push(tx);
    }

    /// Hash over `prev_hash` and the transaction ids in order.
    pub fn derived_hash(&self) -> String {
        hash::block_hash(&self.prev_hash, self.transactions.iter().map(|tx| tx.id.as_str()))
    }

    /// Closes the block by fixing its hash.
    pub fn seal(&mut self) -> &str {
        debug_assert!(!self.is_sealed(), "block sealed twice");
        self.block_hash = self.derived_hash();
        &self.block_hash
    }

    /// The open block that follows this sealed one.
    pub fn successor(&self) -> Block {
        Block::open(self.block_hash.clone())
    }
}
