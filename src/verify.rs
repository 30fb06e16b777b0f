// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Ledger Document Parsing and Verification.
//!
//! A ledger file is one JSON object whose keys are epoch labels
//! (`invts-<unix-seconds>`, one per process invocation) in the order they were
//! written, each mapping to an array of blocks:
//!
//! ```text
//! {"invts-1700000000":[Block,Block],
//! "invts-1700000100":[Block]}
//! ```
//!
//! Verification re-derives every transaction id and every block hash, and walks
//! the chain across epochs: the first block ever written links to
//! [`GENESIS_PREV_HASH`], every later block links to the block before it, even
//! when that block sits in an earlier epoch.

use core::fmt;
use std::io;

use serde::de::{Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{parse_epoch_label, Block, GENESIS_PREV_HASH};

/// Blocks appended during one process invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Epoch {
    pub label: String,
    pub blocks: Vec<Block>,
}

/// A parsed ledger file, epochs kept in file order.
///
/// Deserialized through a map visitor rather than into a map type so that file
/// order survives and two invocations started within the same second (same
/// label) stay distinct.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerDocument {
    pub epochs: Vec<Epoch>,
}

impl<'de> Deserialize<'de> for LedgerDocument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DocumentVisitor;

        impl<'de> Visitor<'de> for DocumentVisitor {
            type Value = LedgerDocument;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of epoch labels to arrays of blocks")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut epochs = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((label, blocks)) = map.next_entry::<String, Vec<Block>>()? {
                    epochs.push(Epoch { label, blocks });
                }
                Ok(LedgerDocument { epochs })
            }
        }

        deserializer.deserialize_map(DocumentVisitor)
    }
}

impl LedgerDocument {
    /// Parses ledger bytes. An empty (or whitespace-only) file is an empty ledger.
    pub fn from_slice(bytes: &[u8]) -> CoreResult<Self> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Hash of the most recently written block, if any.
    pub fn last_block_hash(&self) -> Option<&str> {
        self.epochs
            .iter()
            .rev()
            .find_map(|epoch| epoch.blocks.last())
            .map(|block| block.block_hash.as_str())
    }

    pub fn block_count(&self) -> usize {
        self.epochs.iter().map(|e| e.blocks.len()).sum()
    }

    pub fn transaction_count(&self) -> usize {
        self.epochs
            .iter()
            .flat_map(|e| e.blocks.iter())
            .map(Block::len)
            .sum()
    }
}

/// Where a ledger's chain currently ends.
///
/// Read in one streaming pass that holds at most one block at a time, so
/// resuming a long-lived ledger does not load it into memory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerTail {
    pub epochs: usize,
    pub blocks: usize,
    /// `None` when no block was ever written.
    pub last_block_hash: Option<String>,
}

impl LedgerTail {
    pub fn from_reader<R: io::Read>(reader: R) -> CoreResult<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
}

/// One epoch's block array, reduced to its length and last block.
struct EpochTail {
    blocks: usize,
    last: Option<Block>,
}

impl<'de> Deserialize<'de> for EpochTail {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EpochTailVisitor;

        impl<'de> Visitor<'de> for EpochTailVisitor {
            type Value = EpochTail;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an array of blocks")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut tail = EpochTail { blocks: 0, last: None };
                while let Some(block) = seq.next_element::<Block>()? {
                    tail.blocks += 1;
                    tail.last = Some(block);
                }
                Ok(tail)
            }
        }

        deserializer.deserialize_seq(EpochTailVisitor)
    }
}

impl<'de> Deserialize<'de> for LedgerTail {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TailVisitor;

        impl<'de> Visitor<'de> for TailVisitor {
            type Value = LedgerTail;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of epoch labels to arrays of blocks")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut tail = LedgerTail::default();
                while let Some((_label, epoch)) = map.next_entry::<String, EpochTail>()? {
                    tail.epochs += 1;
                    tail.blocks += epoch.blocks;
                    if let Some(block) = epoch.last {
                        tail.last_block_hash = Some(block.block_hash);
                    }
                }
                Ok(tail)
            }
        }

        deserializer.deserialize_map(TailVisitor)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EpochSummary {
    pub label: String,
    pub invocation_ts: i64,
    pub blocks: usize,
    pub transactions: usize,
}

/// Result of a successful verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    pub epochs: Vec<EpochSummary>,
    pub blocks: usize,
    pub transactions: usize,
    /// Hash the next block must link to.
    pub chain_tip: String,
}

/// Parses and fully verifies ledger file contents.
pub fn verify_ledger(bytes: &[u8]) -> CoreResult<LedgerSummary> {
    verify_document(&LedgerDocument::from_slice(bytes)?)
}

/// Verifies an already parsed document. Stops at the first violation.
pub fn verify_document(doc: &LedgerDocument) -> CoreResult<LedgerSummary> {
    let mut expected_prev = GENESIS_PREV_HASH.to_string();
    let mut epochs = Vec::with_capacity(doc.epochs.len());

    for epoch in &doc.epochs {
        let invocation_ts = parse_epoch_label(&epoch.label)
            .ok_or_else(|| CoreError::EpochLabel(epoch.label.clone()))?;

        for (block_idx, block) in epoch.blocks.iter().enumerate() {
            if block.is_empty() {
                return Err(CoreError::EmptyBlock {
                    epoch: epoch.label.clone(),
                    block: block_idx,
                });
            }

            for (tx_idx, tx) in block.transactions.iter().enumerate() {
                let derived = tx.derived_id();
                if tx.id != derived {
                    return Err(CoreError::TransactionId {
                        epoch: epoch.label.clone(),
                        block: block_idx,
                        tx: tx_idx,
                        expected: derived,
                        found: tx.id.clone(),
                    });
                }
            }

            if block.prev_hash != expected_prev {
                return Err(CoreError::ChainLink {
                    epoch: epoch.label.clone(),
                    block: block_idx,
                    expected: expected_prev,
                    found: block.prev_hash.clone(),
                });
            }

            let derived = block.derived_hash();
            if block.block_hash != derived {
                return Err(CoreError::BlockHash {
                    epoch: epoch.label.clone(),
                    block: block_idx,
                    expected: derived,
                    found: block.block_hash.clone(),
                });
            }

            expected_prev = derived;
        }

        epochs.push(EpochSummary {
            label: epoch.label.clone(),
            invocation_ts,
            blocks: epoch.blocks.len(),
            transactions: epoch.blocks.iter().map(Block::len).sum(),
        });
    }

    Ok(LedgerSummary {
        blocks: doc.block_count(),
        transactions: doc.transaction_count(),
        epochs,
        chain_tip: expected_prev,
    })
}
