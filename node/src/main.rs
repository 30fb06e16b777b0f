// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;

use blkchain_node::config::{NodeArgs, NodeConfig};
use blkchain_node::ledger::{unix_now, Accumulator, AccumulatorConfig, LedgerStats, LedgerWriter};
use blkchain_node::lifecycle::{exit_code, termination_signal, Lifecycle};
use blkchain_node::server::{build_router, AppState};
use blkchain_node::telemetry;

#[tokio::main]
async fn main() -> ExitCode {
    let args = NodeArgs::parse();
    telemetry::init_tracing(args.verblvl);

    if args.invdetails {
        tracing::info!(
            pid = std::process::id(),
            version = env!("CARGO_PKG_VERSION"),
            args = ?std::env::args().collect::<Vec<_>>(),
            "Invocation details"
        );
    }

    let cfg = match NodeConfig::try_from(args) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return ExitCode::from(exit_code::CONFIG_ERROR);
        }
    };
    tracing::info!("Starting blkchain node with config: {:?}", cfg);

    let invocation_ts = unix_now();
    log_file_size("Ledger file at startup", &cfg.ledger_path);

    let stats = Arc::new(LedgerStats::new());
    let writer = match LedgerWriter::open(&cfg.ledger_path, invocation_ts, stats) {
        Ok(w) => w,
        Err(e) => {
            tracing::error!("Failed to open ledger file {:?}: {}", cfg.ledger_path, e);
            return ExitCode::from(exit_code::LEDGER_ERROR);
        }
    };
    tracing::info!(
        epoch = invocation_ts,
        chain_tip = writer.chain_tip(),
        "Ledger opened"
    );

    if let Err(e) = telemetry::init_metrics() {
        tracing::warn!("Prometheus recorder not installed: {}", e);
    }

    let (accumulator, fatal_rx) = Accumulator::new(writer, AccumulatorConfig::from(&cfg));
    let lifecycle = Lifecycle::new(accumulator.clone(), fatal_rx);
    let shutdown = lifecycle.shutdown_token();

    let listener = match bind(&cfg).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("{:#}", e);
            // Nothing was accepted yet, but the epoch still needs a clean ending.
            if let Err(e) = accumulator.shutdown().await {
                tracing::error!("Failed to close ledger: {}", e);
                return ExitCode::from(exit_code::LEDGER_ERROR);
            }
            return ExitCode::from(exit_code::SERVER_ERROR);
        }
    };

    let ledger_path = cfg.ledger_path.clone();
    let app = build_router(AppState::new(accumulator, cfg));
    let server = async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
    };

    let report = lifecycle.run(server, termination_signal()).await;
    log_file_size("Ledger file at exit", &ledger_path);

    let code = report.exit_code();
    tracing::info!(code, "{}", report.message());
    ExitCode::from(code)
}

async fn bind(cfg: &NodeConfig) -> anyhow::Result<TcpListener> {
    let addr = cfg.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    Ok(listener)
}

fn log_file_size(what: &str, path: &Path) {
    match std::fs::metadata(path) {
        Ok(meta) => tracing::info!(path = %path.display(), bytes = meta.len(), "{}", what),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "{}: not present", what)
        }
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "{}: stat failed", what),
    }
}
