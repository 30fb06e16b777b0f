// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use serde::{Deserialize, Serialize};

use crate::hash;

/// One submitted key/value pair.
///
/// `id` is derived from the other three fields and is never taken from a client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub key: String,
    pub value: String,
    pub timestamp: i64,
}

impl Transaction {
    /// Builds a transaction and stamps its id.
    pub fn new(key: impl Into<String>, value: impl Into<String>, timestamp: i64) -> Self {
        let mut tx = Self {
            id: String::new(),
            key: key.into(),
            value: value.into(),
            timestamp,
        };
        tx.id = tx.derived_id();
        tx
    }

    /// The id this transaction's content hashes to.
    pub fn derived_id(&self) -> String {
        hash::transaction_id(&self.key, &self.value, self.timestamp)
    }

    pub fn has_valid_id(&self) -> bool {
        self.id == self.derived_id()
    }
}
