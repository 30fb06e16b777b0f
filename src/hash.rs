// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Transaction and block hashing.
//!
//! Both digests are SHA-256 rendered as 64 lowercase hex characters. Inputs are
//! concatenated with no separators, so an independent verifier can rebuild every
//! hash from the ledger file alone.

use sha2::{Digest, Sha256};

/// Length of a hex-rendered digest.
pub const HASH_HEX_LEN: usize = 64;

/// Derives a transaction id from `key ++ value ++ decimal(timestamp)`.
///
/// Identical key, value and timestamp produce the same id. Collisions are not
/// detected anywhere.
pub fn transaction_id(key: &str, value: &str, timestamp: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hasher.update(value.as_bytes());
    hasher.update(timestamp.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Derives a block hash from `prev_hash ++ id_0 ++ id_1 ++ ...` in submission order.
pub fn block_hash<'a, I>(prev_hash: &str, ids: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    for id in ids {
        hasher.update(id.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// True if `s` looks like a digest produced by this module.
pub fn is_hex_digest(s: &str) -> bool {
    s.len() == HASH_HEX_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
