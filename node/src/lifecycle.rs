// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Lifecycle and Shutdown
//!
//! `Running` → `Draining` → `Terminated`.
//!
//! The first of these ends `Running`:
//! - an OS termination signal
//! - the HTTP server failing
//! - a fatal ledger error reported by the accumulator
//!
//! Draining stops the HTTP server, then (unless the ledger itself failed)
//! disarms the close timer, flushes the open block and writes the closing
//! syntax.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use crate::errors::LedgerResult;
use crate::ledger::{Accumulator, FatalReceiver, StatsSnapshot};

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const SERVER_ERROR: u8 = 3;
    pub const TERMINATED: u8 = 4;
    pub const LEDGER_ERROR: u8 = 5;
    pub const CONFIG_ERROR: u8 = 201;
}

/// Upper bound on waiting for in-flight requests once shutdown starts.
const SERVER_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Running,
    Draining,
    Terminated,
}

/// Why the node stopped running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Terminated,
    ServerFailed(String),
    LedgerFailed(String),
}

#[derive(Debug)]
pub struct LifecycleReport {
    pub outcome: Outcome,
    /// Result of draining the ledger. `None` when the ledger had already failed.
    pub drained: Option<LedgerResult<StatsSnapshot>>,
}

impl LifecycleReport {
    pub fn exit_code(&self) -> u8 {
        match (&self.outcome, &self.drained) {
            (Outcome::LedgerFailed(_), _) | (_, Some(Err(_))) => exit_code::LEDGER_ERROR,
            (Outcome::ServerFailed(_), _) => exit_code::SERVER_ERROR,
            (Outcome::Terminated, _) => exit_code::TERMINATED,
        }
    }

    pub fn message(&self) -> String {
        let base = match &self.outcome {
            Outcome::Terminated => "exiting: due to 'terminate' signal".to_string(),
            Outcome::ServerFailed(msg) => format!("exiting: server error: {msg}"),
            Outcome::LedgerFailed(msg) => format!("exiting: ledger error: {msg}"),
        };
        match &self.drained {
            Some(Err(e)) => format!("{base}; drain failed: {e}"),
            _ => base,
        }
    }
}

pub struct Lifecycle {
    accumulator: Accumulator,
    fatal_rx: FatalReceiver,
    state: watch::Sender<LifecycleState>,
    shutdown: CancellationToken,
}

impl Lifecycle {
    pub fn new(accumulator: Accumulator, fatal_rx: FatalReceiver) -> Self {
        let (state, _) = watch::channel(LifecycleState::Running);
        Self {
            accumulator,
            fatal_rx,
            state,
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancelled when draining starts. The HTTP server shuts down gracefully on it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Runs until the first termination source fires, then drains.
    pub async fn run<S, T>(mut self, server: S, terminate: T) -> LifecycleReport
    where
        S: Future<Output = std::io::Result<()>> + Send + 'static,
        T: Future<Output = ()>,
    {
        let mut server = tokio::spawn(server);
        tokio::pin!(terminate);

        let (outcome, server_done) = tokio::select! {
            biased;
            _ = &mut terminate => (Outcome::Terminated, false),
            Some(msg) = self.fatal_rx.recv() => (Outcome::LedgerFailed(msg), false),
            res = &mut server => (Outcome::ServerFailed(describe_server_exit(res)), true),
        };

        tracing::info!(?outcome, "Draining");
        self.state.send_replace(LifecycleState::Draining);
        self.shutdown.cancel();

        if !server_done {
            match tokio::time::timeout(SERVER_DRAIN_TIMEOUT, &mut server).await {
                Ok(Ok(Ok(()))) => tracing::debug!("HTTP server stopped"),
                Ok(res) => tracing::warn!("HTTP server stopped with error: {}", describe_server_exit(res)),
                Err(_) => {
                    tracing::warn!("HTTP server did not stop in {:?}; aborting it", SERVER_DRAIN_TIMEOUT);
                    server.abort();
                }
            }
        }

        let drained = match outcome {
            Outcome::LedgerFailed(_) => None,
            _ => Some(self.accumulator.shutdown().await),
        };

        match &drained {
            Some(Ok(stats)) => tracing::info!(
                blocks = stats.blocks_appended,
                transactions = stats.transactions_appended,
                bytes = stats.bytes_appended,
                "Ledger closed"
            ),
            Some(Err(e)) => tracing::error!(error = %e, "Ledger drain failed"),
            None => tracing::error!("Ledger left as-is after fatal error"),
        }

        self.state.send_replace(LifecycleState::Terminated);
        LifecycleReport { outcome, drained }
    }
}

fn describe_server_exit(res: Result<std::io::Result<()>, JoinError>) -> String {
    match res {
        Ok(Ok(())) => "server stopped unexpectedly".to_string(),
        Ok(Err(e)) => e.to_string(),
        Err(e) => e.to_string(),
    }
}

/// Resolves on SIGINT, SIGTERM or SIGHUP (Ctrl-C off unix).
pub async fn termination_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
            signal(SignalKind::hangup()),
        ) {
            (Ok(mut sigint), Ok(mut sigterm), Ok(mut sighup)) => {
                tokio::select! {
                    _ = sigint.recv() => tracing::info!("SIGINT received"),
                    _ = sigterm.recv() => tracing::info!("SIGTERM received"),
                    _ = sighup.recv() => tracing::info!("SIGHUP received"),
                }
                return;
            }
            _ => tracing::warn!("Failed to install unix signal handlers; falling back to Ctrl-C"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C; only server or ledger failures can stop the node");
        std::future::pending::<()>().await;
    }
}
