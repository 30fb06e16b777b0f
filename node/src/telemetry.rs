// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::OnceLock;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ledger::StatsSnapshot;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Default log directives for a verbosity level. `RUST_LOG` overrides them.
pub fn default_log_directives(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    format!("blkchain_node={level},blkchain_core={level},tower_http={level}")
}

/// Initialize tracing (logs)
pub fn init_tracing(verbosity: u8) {
    let filter = std::env::var("RUST_LOG")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new(default_log_directives(verbosity)));

    if tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_err()
    {
        tracing::warn!("Tracing subscriber already installed");
    }
}

/// Initialize metrics (Prometheus)
pub fn init_metrics() -> Result<(), BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    if PROM_HANDLE.set(handle).is_err() {
        tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
    }

    metrics::describe_counter!("blkchain_blocks_appended_total", "Blocks appended to the ledger file");
    metrics::describe_counter!("blkchain_transactions_appended_total", "Transactions appended to the ledger file");
    metrics::describe_counter!("blkchain_bytes_appended_total", "Bytes appended to the ledger file");
    metrics::describe_histogram!("blkchain_block_append_duration_seconds", "Time taken to seal and append a block");
    metrics::describe_gauge!("blkchain_open_block_transactions", "Transactions in the open block");

    metrics::gauge!("blkchain_node_up", 1.0);
    Ok(())
}

pub fn record_block_appended(transactions: usize, bytes: u64, elapsed: Duration) {
    metrics::counter!("blkchain_blocks_appended_total", 1);
    metrics::counter!("blkchain_transactions_appended_total", transactions as u64);
    metrics::counter!("blkchain_bytes_appended_total", bytes);
    metrics::histogram!("blkchain_block_append_duration_seconds", elapsed.as_secs_f64());
}

/// Mirrors the ledger's atomic counters into gauges before a scrape.
pub fn refresh_ledger_gauges(stats: &StatsSnapshot) {
    metrics::gauge!("blkchain_open_block_transactions", stats.open_block_txs as f64);
    metrics::gauge!("blkchain_invocation_blocks", stats.blocks_appended as f64);
    metrics::gauge!("blkchain_invocation_transactions", stats.transactions_appended as f64);
    metrics::gauge!("blkchain_invocation_bytes", stats.bytes_appended as f64);
}

/// Get the Prometheus handle to render metrics
pub fn get_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_raises_log_level() {
        assert!(default_log_directives(0).contains("blkchain_node=info"));
        assert!(default_log_directives(1).contains("blkchain_node=debug"));
        assert!(default_log_directives(7).contains("blkchain_node=trace"));
    }
}
