// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Append-Only Ledger File Writer
//!
//! The ledger is one JSON object that keeps growing across invocations. Each
//! invocation adds one key, `"invts-<unix-seconds>"`, holding its blocks.
//!
//! # File Format
//! ```text
//! {"invts-1700000000":[Block,
//! Block]}
//! ```
//! A later invocation overwrites the trailing `}` with `,\n` and continues:
//! ```text
//! {"invts-1700000000":[Block,
//! Block],
//! "invts-1700000100":[Block]}
//! ```
//!
//! The file is valid JSON at rest: after `close()`, or before the first append
//! of an invocation. A process killed mid-invocation leaves it unterminated.
//! Partial-write recovery is not attempted.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use blkchain_core::types::epoch_label;
use blkchain_core::{Block, LedgerTail, GENESIS_PREV_HASH};

use crate::errors::{LedgerError, LedgerResult};
use crate::ledger::stats::LedgerStats;

const EPOCH_SEPARATOR: &[u8] = b",\n";
const CLOSING: &[u8] = b"]}";

/// Writer for one invocation's epoch.
///
/// Lifecycle: [`LedgerWriter::open`] → [`LedgerWriter::append`]* → [`LedgerWriter::close`].
/// Any failed write poisons the writer; every later call returns
/// [`LedgerError::Poisoned`].
pub struct LedgerWriter {
    path: PathBuf,
    file: File,
    invocation_ts: i64,
    /// Current file length; the next write lands here.
    file_len: u64,
    /// Hash the next block must link to.
    chain_tip: String,
    /// Whether the existing document already holds an epoch key. `{}` does not.
    has_epochs: bool,
    blocks_written: u64,
    closed: bool,
    poisoned: bool,
    stats: Arc<LedgerStats>,
}

impl LedgerWriter {
    /// Opens (creating if absent) the ledger file for a new epoch.
    ///
    /// A non-empty file must be a complete ledger document ending in `}`, as
    /// left by a clean shutdown. Its last block hash becomes the chain tip.
    pub fn open(
        path: impl AsRef<Path>,
        invocation_ts: i64,
        stats: Arc<LedgerStats>,
    ) -> LedgerResult<Self> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)?;

        let file_len = file.metadata()?.len();
        let (chain_tip, has_epochs) = if file_len == 0 {
            (GENESIS_PREV_HASH.to_string(), false)
        } else {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::Start(file_len - 1))?;
            file.read_exact(&mut last)?;
            if last[0] != b'}' {
                return Err(LedgerError::Corrupt(format!(
                    "{} does not end with a closing brace",
                    path.display()
                )));
            }
            file.seek(SeekFrom::Start(0))?;
            let tail = LedgerTail::from_reader(BufReader::new(&file))
                .map_err(|e| LedgerError::Corrupt(format!("{}: {e}", path.display())))?;
            let tip = tail
                .last_block_hash
                .unwrap_or_else(|| GENESIS_PREV_HASH.to_string());
            (tip, tail.epochs > 0)
        };

        tracing::info!(
            path = %path.display(),
            size = file_len,
            mib = file_len as f64 / (1024.0 * 1024.0),
            "Opened ledger file"
        );

        Ok(Self {
            path,
            file,
            invocation_ts,
            file_len,
            chain_tip,
            has_epochs,
            blocks_written: 0,
            closed: false,
            poisoned: false,
            stats,
        })
    }

    /// Wraps an already open, empty ledger file.
    #[cfg(test)]
    pub(crate) fn from_file(
        path: impl AsRef<Path>,
        file: File,
        invocation_ts: i64,
        stats: Arc<LedgerStats>,
    ) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file,
            invocation_ts,
            file_len: 0,
            chain_tip: GENESIS_PREV_HASH.to_string(),
            has_epochs: false,
            blocks_written: 0,
            closed: false,
            poisoned: false,
            stats,
        }
    }

    /// Appends a sealed block. Empty blocks are skipped.
    ///
    /// Returns the number of bytes written.
    pub fn append(&mut self, block: &Block) -> LedgerResult<u64> {
        self.check_writable()?;
        if block.is_empty() {
            return Ok(0);
        }
        debug_assert!(block.is_sealed(), "appending an unsealed block");
        debug_assert_eq!(block.prev_hash, self.chain_tip, "block does not extend the chain");

        let json = match serde_json::to_vec(block) {
            Ok(json) => json,
            Err(e) => {
                self.poisoned = true;
                return Err(e.into());
            }
        };

        let mut buf = Vec::with_capacity(json.len() + 32);
        let offset = if self.blocks_written == 0 {
            let offset = if self.file_len == 0 {
                buf.push(b'{');
                0
            } else {
                // Replace the closing brace of the previous invocation.
                if self.has_epochs {
                    buf.extend_from_slice(EPOCH_SEPARATOR);
                }
                self.file_len - 1
            };
            buf.extend_from_slice(format!("\"{}\":[", epoch_label(self.invocation_ts)).as_bytes());
            offset
        } else {
            buf.extend_from_slice(EPOCH_SEPARATOR);
            self.file_len
        };
        buf.extend_from_slice(&json);

        self.write_at(offset, &buf)?;

        let written = buf.len() as u64;
        self.blocks_written += 1;
        self.has_epochs = true;
        self.chain_tip = block.block_hash.clone();
        self.stats.record_block(block.len() as u64, written);

        tracing::trace!(bytes = written, block_hash = %block.block_hash, "Appended block");
        Ok(written)
    }

    /// Terminates this invocation's epoch. Writes `]}` only if a block was appended.
    pub fn close(&mut self) -> LedgerResult<()> {
        if self.poisoned {
            return Err(LedgerError::Poisoned);
        }
        if self.closed {
            return Ok(());
        }
        if self.blocks_written > 0 {
            self.write_at(self.file_len, CLOSING)?;
            self.stats.record_bytes(CLOSING.len() as u64);
        }
        self.closed = true;

        tracing::info!(
            path = %self.path.display(),
            size = self.file_len,
            mib = self.file_len as f64 / (1024.0 * 1024.0),
            blocks = self.blocks_written,
            "Closed ledger file"
        );
        Ok(())
    }

    fn check_writable(&self) -> LedgerResult<()> {
        if self.poisoned {
            return Err(LedgerError::Poisoned);
        }
        if self.closed {
            return Err(LedgerError::Closed);
        }
        Ok(())
    }

    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> LedgerResult<()> {
        let result = (|| {
            self.file.seek(SeekFrom::Start(offset))?;
            self.file.write_all(bytes)?;
            self.file.flush()?;
            self.file.sync_data()
        })();

        match result {
            Ok(()) => {
                self.file_len = offset + bytes.len() as u64;
                Ok(())
            }
            Err(e) => {
                self.poisoned = true;
                tracing::error!(path = %self.path.display(), error = %e, "Ledger write failed");
                Err(e.into())
            }
        }
    }

    /// Hash the next block must link to.
    pub fn chain_tip(&self) -> &str {
        &self.chain_tip
    }

    pub fn blocks_written(&self) -> u64 {
        self.blocks_written
    }

    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn invocation_ts(&self) -> i64 {
        self.invocation_ts
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn stats(&self) -> &Arc<LedgerStats> {
        &self.stats
    }
}
