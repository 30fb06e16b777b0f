// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Re-derives every transaction id and block hash of a ledger file", long_about = None)]
struct Args {
    /// Path to the ledger file (e.g. blkchain.json)
    ledger: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    eprintln!("blkchain verifier v{}", env!("CARGO_PKG_VERSION"));

    let bytes = fs::read(&args.ledger)
        .with_context(|| format!("Failed to read ledger file {}", args.ledger.display()))?;

    let summary = blkchain_core::verify_ledger(&bytes)
        .with_context(|| format!("Ledger {} failed verification", args.ledger.display()))?;

    eprintln!(
        "OK: {} epochs, {} blocks, {} transactions",
        summary.epochs.len(),
        summary.blocks,
        summary.transactions
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
