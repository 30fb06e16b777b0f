// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use serde::{Deserialize, Serialize};

use crate::config::NodeConfig;
use crate::ledger::StatsSnapshot;

/// Parameters of `/tx`, from the query string and, on POST, a form body.
/// Missing parameters read as empty and fail validation.
#[derive(Deserialize, Serialize, Debug, Default)]
pub struct TxParams {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// Parameters of `/searchtx`.
#[derive(Deserialize, Serialize, Debug, Default)]
pub struct SearchParams {
    #[serde(default)]
    pub key: String,
}

impl TxParams {
    /// Overlays a form body on the query. Non-empty body fields win.
    pub fn merged(self, body: Option<TxParams>) -> Self {
        match body {
            Some(body) => Self {
                key: prefer(body.key, self.key),
                value: prefer(body.value, self.value),
            },
            None => self,
        }
    }
}

impl SearchParams {
    pub fn merged(self, body: Option<SearchParams>) -> Self {
        match body {
            Some(body) => Self {
                key: prefer(body.key, self.key),
            },
            None => self,
        }
    }
}

fn prefer(primary: String, fallback: String) -> String {
    if primary.is_empty() {
        fallback
    } else {
        primary
    }
}

/// Client-safe rejection body.
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq)]
pub struct ClientError {
    pub clienterrmsg: String,
}

impl ClientError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            clienterrmsg: msg.into(),
        }
    }
}

/// Body of `/debug/vars`: configuration echoes and live counters.
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq)]
pub struct DebugVars {
    #[serde(rename = "1a-blkctime-duration")]
    pub block_close_time: String,
    #[serde(rename = "1a-blkfile")]
    pub ledger_file: String,
    #[serde(rename = "1a-blktxmax")]
    pub max_tx_per_block: i64,
    #[serde(rename = "1b-curblktxcnt")]
    pub open_block_txs: u64,
    #[serde(rename = "1b-totblkappSinv")]
    pub blocks_appended: u64,
    #[serde(rename = "1b-tottxappSinv")]
    pub transactions_appended: u64,
    #[serde(rename = "1b-totwrtbytesSinv")]
    pub bytes_appended: u64,
}

impl DebugVars {
    pub fn new(cfg: &NodeConfig, stats: &StatsSnapshot) -> Self {
        Self {
            block_close_time: format!("{:?}", cfg.block_close_time),
            ledger_file: cfg.ledger_path.display().to_string(),
            max_tx_per_block: cfg.max_tx_per_block,
            open_block_txs: stats.open_block_txs,
            blocks_appended: stats.blocks_appended,
            transactions_appended: stats.transactions_appended,
            bytes_appended: stats.bytes_appended,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(key: &str, value: &str) -> TxParams {
        TxParams {
            key: key.into(),
            value: value.into(),
        }
    }

    #[test]
    fn test_body_fields_override_query() {
        let merged = tx("q-key", "q-value").merged(Some(tx("b-key", "")));
        assert_eq!(merged.key, "b-key");
        assert_eq!(merged.value, "q-value");

        let merged = tx("q-key", "").merged(None);
        assert_eq!(merged.key, "q-key");
        assert_eq!(merged.value, "");

        let search = SearchParams { key: "q".into() }.merged(Some(SearchParams::default()));
        assert_eq!(search.key, "q");
    }
}
