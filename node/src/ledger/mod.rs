// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Ledger Batching Engine
//!
//! - `Accumulator` owns the single open block and its close timer
//! - `LedgerWriter` appends sealed blocks to the ledger file
//! - `LedgerStats` exposes lock-free counters to metrics readers
//!
//! # Locking
//! The open block, the timer handle and the writer live in one `LedgerState`
//! behind one mutex. Submissions, timer fires and shutdown all take that lock
//! before touching any of them, so a block can only be closed once.

pub mod accumulator;
pub mod ledger_file;
pub mod stats;

pub use accumulator::{Accumulator, AccumulatorConfig, FatalReceiver};
pub use ledger_file::LedgerWriter;
pub use stats::{LedgerStats, StatsSnapshot};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in unix seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
