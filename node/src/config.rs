// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

pub const DEFAULT_LEDGER_FILE: &str = "blkchain.json";
pub const DEFAULT_BLOCK_CLOSE_TIME: Duration = Duration::from_secs(60);
/// Shorter close timers are rejected at startup.
pub const MIN_BLOCK_CLOSE_TIME: Duration = Duration::from_secs(5);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid duration {0:?}; expected e.g. 30s, 1m, 1m30s")]
    InvalidDuration(String),
    #[error("block close time {given:?} is too short; minimum is {min:?}")]
    CloseTimeTooShort { given: Duration, min: Duration },
}

/// Command line flags.
#[derive(Parser, Debug, Clone)]
#[command(name = "blkchain-node", version)]
#[command(about = "HTTP API server that records key/value transactions in a hash-chained JSON ledger", long_about = None)]
pub struct NodeArgs {
    /// Block close (commit) time, e.g. 30s, 1m, 1m30s
    #[arg(long, default_value = "1m", value_parser = parse_duration)]
    pub blk_ctime: Duration,

    /// Name of the ledger JSON file
    #[arg(long, default_value = DEFAULT_LEDGER_FILE)]
    pub blk_file: PathBuf,

    /// <1 closes blocks by timer only, >0 is the max transactions in a block
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub blk_txmax: i64,

    /// Host to listen on
    #[arg(long, default_value = "localhost")]
    pub srv_url: String,

    /// Port to listen on
    #[arg(long, default_value_t = 8080)]
    pub srv_port: u16,

    /// Expose live counters at /debug/vars
    #[arg(long)]
    pub expvars: bool,

    /// Include internal error detail in 5xx responses
    #[arg(long)]
    pub devmode: bool,

    /// Log invocation details at startup
    #[arg(long)]
    pub invdetails: bool,

    /// Verbosity level (logging detail only)
    #[arg(long, default_value_t = 0)]
    pub verblvl: u8,
}

/// Validated node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub ledger_path: PathBuf,
    /// `<= 0` unbounded by count, `1` closes on every transaction.
    pub max_tx_per_block: i64,
    pub block_close_time: Duration,
    pub host: String,
    pub port: u16,
    pub expose_vars: bool,
    pub dev_mode: bool,
    pub verbosity: u8,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            ledger_path: PathBuf::from(DEFAULT_LEDGER_FILE),
            max_tx_per_block: 0,
            block_close_time: DEFAULT_BLOCK_CLOSE_TIME,
            host: "localhost".to_string(),
            port: 8080,
            expose_vars: false,
            dev_mode: false,
            verbosity: 0,
        }
    }
}

impl NodeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_close_time < MIN_BLOCK_CLOSE_TIME {
            return Err(ConfigError::CloseTimeTooShort {
                given: self.block_close_time,
                min: MIN_BLOCK_CLOSE_TIME,
            });
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl TryFrom<NodeArgs> for NodeConfig {
    type Error = ConfigError;

    fn try_from(args: NodeArgs) -> Result<Self, Self::Error> {
        let cfg = NodeConfig {
            ledger_path: args.blk_file,
            max_tx_per_block: args.blk_txmax,
            block_close_time: args.blk_ctime,
            host: args.srv_url,
            port: args.srv_port,
            expose_vars: args.expvars,
            dev_mode: args.devmode,
            verbosity: args.verblvl,
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Parses durations written as a sequence of `<number><unit>` pairs
/// (`ns`, `us`, `µs`, `ms`, `s`, `m`, `h`), e.g. `1m30s` or `1.5h`.
/// A bare `0` is accepted.
pub fn parse_duration(input: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidDuration(input.to_string());
    let s = input.trim();
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(invalid());
    }

    let mut total_nanos = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return Err(invalid());
        }
        let number: f64 = rest[..num_len].parse().map_err(|_| invalid())?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];
        total_nanos += number * nanos_per_unit;
    }

    if !total_nanos.is_finite() || total_nanos >= u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_forms() {
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        for bad in ["", "m", "10", "10x", "1m-3s", "s5"] {
            assert!(parse_duration(bad).is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_close_time_floor_is_enforced() {
        let mut cfg = NodeConfig::default();
        assert!(cfg.validate().is_ok());

        cfg.block_close_time = Duration::from_secs(4);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::CloseTimeTooShort {
                given: Duration::from_secs(4),
                min: MIN_BLOCK_CLOSE_TIME,
            })
        );

        cfg.block_close_time = MIN_BLOCK_CLOSE_TIME;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_args_map_onto_config() {
        let args = NodeArgs::parse_from([
            "blkchain-node",
            "--blk-ctime",
            "10s",
            "--blk-txmax",
            "3",
            "--blk-file",
            "chain.json",
            "--srv-port",
            "9000",
            "--expvars",
        ]);
        let cfg = NodeConfig::try_from(args).unwrap();
        assert_eq!(cfg.block_close_time, Duration::from_secs(10));
        assert_eq!(cfg.max_tx_per_block, 3);
        assert_eq!(cfg.ledger_path, PathBuf::from("chain.json"));
        assert_eq!(cfg.bind_addr(), "localhost:9000");
        assert!(cfg.expose_vars);
    }

    #[test]
    fn test_args_defaults_and_short_close_time() {
        let cfg = NodeConfig::try_from(NodeArgs::parse_from(["blkchain-node"])).unwrap();
        assert_eq!(cfg.block_close_time, DEFAULT_BLOCK_CLOSE_TIME);
        assert_eq!(cfg.max_tx_per_block, 0);
        assert_eq!(cfg.ledger_path, PathBuf::from(DEFAULT_LEDGER_FILE));

        let args = NodeArgs::parse_from(["blkchain-node", "--blk-ctime", "2s"]);
        assert!(matches!(
            NodeConfig::try_from(args),
            Err(ConfigError::CloseTimeTooShort { .. })
        ));
    }
}
