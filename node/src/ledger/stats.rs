// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Per-invocation counters. Written under the ledger lock, read without it.
#[derive(Debug, Default)]
pub struct LedgerStats {
    open_block_txs: AtomicU64,
    blocks_appended: AtomicU64,
    transactions_appended: AtomicU64,
    bytes_appended: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub open_block_txs: u64,
    pub blocks_appended: u64,
    pub transactions_appended: u64,
    pub bytes_appended: u64,
}

impl LedgerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_open_block_txs(&self, count: u64) {
        self.open_block_txs.store(count, Ordering::Relaxed);
    }

    /// Records one appended block and resets the open-block count.
    pub fn record_block(&self, transactions: u64, bytes: u64) {
        self.blocks_appended.fetch_add(1, Ordering::Relaxed);
        self.transactions_appended.fetch_add(transactions, Ordering::Relaxed);
        self.bytes_appended.fetch_add(bytes, Ordering::Relaxed);
        self.open_block_txs.store(0, Ordering::Relaxed);
    }

    /// Bytes written outside of a block (closing syntax).
    pub fn record_bytes(&self, bytes: u64) {
        self.bytes_appended.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            open_block_txs: self.open_block_txs.load(Ordering::Relaxed),
            blocks_appended: self.blocks_appended.load(Ordering::Relaxed),
            transactions_appended: self.transactions_appended.load(Ordering::Relaxed),
            bytes_appended: self.bytes_appended.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_block_resets_open_count() {
        let stats = LedgerStats::new();
        stats.set_open_block_txs(3);
        stats.record_block(3, 120);
        stats.record_bytes(2);

        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                open_block_txs: 0,
                blocks_appended: 1,
                transactions_appended: 3,
                bytes_appended: 122,
            }
        );
    }
}
