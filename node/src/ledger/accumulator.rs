// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Block Accumulator
//!
//! Collects submitted transactions into the open block and decides when it
//! closes:
//! 1. The first transaction of a block arms a one-shot close timer, unless
//!    blocks hold exactly one transaction.
//! 2. When a positive per-block maximum is reached, the timer is disarmed and
//!    the block closes before `submit` returns.
//!
//! Closing seals the block (chain hash), appends it to the ledger file and
//! opens its successor.
//!
//! The timer task carries the sequence number of the block it was armed for.
//! A fire that lost the race against a count-triggered close finds a newer
//! sequence (or an empty block) and does nothing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use blkchain_core::{Block, Transaction};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::config::NodeConfig;
use crate::errors::{LedgerError, LedgerResult};
use crate::ledger::ledger_file::LedgerWriter;
use crate::ledger::stats::{LedgerStats, StatsSnapshot};
use crate::ledger::unix_now;
use crate::telemetry;

/// Fatal ledger failures, for the lifecycle controller.
pub type FatalReceiver = mpsc::UnboundedReceiver<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccumulatorConfig {
    /// `<= 0` unbounded by count, `1` closes on every transaction.
    pub max_tx_per_block: i64,
    pub block_close_time: Duration,
}

impl From<&NodeConfig> for AccumulatorConfig {
    fn from(cfg: &NodeConfig) -> Self {
        Self {
            max_tx_per_block: cfg.max_tx_per_block,
            block_close_time: cfg.block_close_time,
        }
    }
}

impl AccumulatorConfig {
    fn arms_timer(&self) -> bool {
        self.max_tx_per_block != 1
    }

    fn is_full(&self, len: usize) -> bool {
        self.max_tx_per_block > 0 && len as i64 == self.max_tx_per_block
    }
}

/// Everything guarded by the ledger lock.
struct LedgerState {
    block: Block,
    /// Incremented each time a block closes.
    sequence: u64,
    timer: Option<JoinHandle<()>>,
    writer: LedgerWriter,
}

impl LedgerState {
    fn disarm_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            tracing::trace!(sequence = self.sequence, "Close timer disarmed");
        }
    }

    /// Seals and appends the open block. Returns false if it was empty.
    fn close_block(&mut self) -> LedgerResult<bool> {
        if self.block.is_empty() {
            return Ok(false);
        }

        let started = Instant::now();
        self.block.seal();
        let bytes = self.writer.append(&self.block)?;

        let next = self.block.successor();
        let closed = std::mem::replace(&mut self.block, next);
        self.sequence += 1;

        telemetry::record_block_appended(closed.len(), bytes, started.elapsed());
        tracing::debug!(
            sequence = self.sequence,
            transactions = closed.len(),
            bytes,
            block_hash = %closed.block_hash,
            "Block closed"
        );
        Ok(true)
    }
}

/// Shared handle to the open block. Cheap to clone.
#[derive(Clone)]
pub struct Accumulator {
    state: Arc<Mutex<LedgerState>>,
    stats: Arc<LedgerStats>,
    config: AccumulatorConfig,
    fatal: mpsc::UnboundedSender<String>,
}

impl Accumulator {
    /// Takes ownership of an opened writer. The first block links to its chain tip.
    pub fn new(writer: LedgerWriter, config: AccumulatorConfig) -> (Self, FatalReceiver) {
        let (fatal, fatal_rx) = mpsc::unbounded_channel();
        let stats = Arc::clone(writer.stats());
        let state = LedgerState {
            block: Block::open(writer.chain_tip()),
            sequence: 0,
            timer: None,
            writer,
        };
        let accumulator = Self {
            state: Arc::new(Mutex::new(state)),
            stats,
            config,
            fatal,
        };
        (accumulator, fatal_rx)
    }

    /// Accepts one transaction into the open block.
    pub async fn submit(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> LedgerResult<Transaction> {
        let key = key.into();
        let value = value.into();
        if key.is_empty() || value.is_empty() {
            return Err(LedgerError::Validation(format!(
                "both transaction key and value must be set; key={key:?} value={value:?}"
            )));
        }

        let tx = Transaction::new(key, value, unix_now());

        let mut state = self.state.lock().await;
        if state.writer.is_poisoned() {
            return Err(LedgerError::Poisoned);
        }
        if state.writer.is_closed() {
            return Err(LedgerError::Closed);
        }

        state.block.push(tx.clone());
        let len = state.block.len();
        self.stats.set_open_block_txs(len as u64);
        tracing::trace!(key = %tx.key, id = %tx.id, open_block_txs = len, "Transaction accepted");

        if len == 1 && self.config.arms_timer() {
            self.arm_timer(&mut state);
        }

        if self.config.is_full(len) {
            if self.config.arms_timer() {
                state.disarm_timer();
            }
            if let Err(e) = state.close_block() {
                self.report_fatal(&e);
                return Err(e);
            }
        }

        Ok(tx)
    }

    /// Key lookup over the ledger. Not supported.
    pub async fn search(&self, _key: &str) -> LedgerResult<Vec<Transaction>> {
        Err(LedgerError::Unimplemented("search by key"))
    }

    /// Closes the open block now if it holds anything.
    pub async fn flush(&self) -> LedgerResult<bool> {
        let mut state = self.state.lock().await;
        state.disarm_timer();
        state.close_block().map_err(|e| {
            self.report_fatal(&e);
            e
        })
    }

    /// Disarms the timer, flushes the open block and terminates the epoch.
    pub async fn shutdown(&self) -> LedgerResult<StatsSnapshot> {
        let mut state = self.state.lock().await;
        state.disarm_timer();
        let flushed = state.close_block()?;
        state.writer.close()?;
        tracing::info!(flushed_partial_block = flushed, "Ledger drained");
        Ok(self.stats.snapshot())
    }

    fn arm_timer(&self, state: &mut LedgerState) {
        // A stale handle can only belong to an already closed block.
        state.disarm_timer();

        let this = self.clone();
        let sequence = state.sequence;
        let delay = self.config.block_close_time;
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.on_timer(sequence).await;
        }));
        tracing::trace!(sequence, ?delay, "Close timer armed");
    }

    async fn on_timer(&self, sequence: u64) {
        let mut state = self.state.lock().await;
        if state.sequence != sequence {
            tracing::trace!(sequence, current = state.sequence, "Stale close timer ignored");
            return;
        }
        // This task is the armed timer; drop the handle instead of aborting it.
        state.timer = None;
        match state.close_block() {
            Ok(true) => tracing::debug!(sequence, "Block closed by timer"),
            Ok(false) => {}
            Err(e) => self.report_fatal(&e),
        }
    }

    pub(crate) fn report_fatal(&self, err: &LedgerError) {
        if err.is_fatal() {
            tracing::error!(error = %err, "Fatal ledger error");
            // The receiver is gone only once the lifecycle has already finished.
            let _ = self.fatal.send(err.to_string());
        }
    }

    pub fn stats(&self) -> &Arc<LedgerStats> {
        &self.stats
    }

    pub fn config(&self) -> AccumulatorConfig {
        self.config
    }

    pub async fn is_timer_armed(&self) -> bool {
        self.state.lock().await.timer.is_some()
    }

    /// Number of transactions in the open block.
    pub async fn open_block_len(&self) -> usize {
        self.state.lock().await.block.len()
    }
}
