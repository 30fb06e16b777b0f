use blkchain_core::verify::LedgerDocument;
use blkchain_core::{verify_ledger, GENESIS_PREV_HASH};
use blkchain_node::ledger::{Accumulator, AccumulatorConfig, LedgerStats, LedgerWriter};
use futures::future::join_all;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn open(path: &Path, invocation_ts: i64, max_tx_per_block: i64) -> Accumulator {
    let writer = LedgerWriter::open(path, invocation_ts, Arc::new(LedgerStats::new())).unwrap();
    let (acc, _fatal_rx) = Accumulator::new(
        writer,
        AccumulatorConfig {
            max_tx_per_block,
            block_close_time: Duration::from_secs(5),
        },
    );
    acc
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_fill_exact_blocks() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    let acc = open(&path, 1_000, 10);

    let handles = (0..100).map(|i| {
        let acc = acc.clone();
        tokio::spawn(async move { acc.submit(format!("key-{i}"), format!("value-{i}")).await })
    });
    let results = join_all(handles).await;
    for r in results {
        r.unwrap().unwrap();
    }

    let stats = acc.shutdown().await.unwrap();
    assert_eq!(stats.blocks_appended, 10);
    assert_eq!(stats.transactions_appended, 100);

    let bytes = fs::read(&path).unwrap();
    let summary = verify_ledger(&bytes).unwrap();
    assert_eq!(summary.blocks, 10);
    assert_eq!(summary.transactions, 100);

    let doc = LedgerDocument::from_slice(&bytes).unwrap();
    let mut keys = HashSet::new();
    for block in &doc.epochs[0].blocks {
        assert_eq!(block.len(), 10);
        for tx in &block.transactions {
            assert!(keys.insert(tx.key.clone()), "duplicate {}", tx.key);
        }
    }
    assert_eq!(keys.len(), 100);
}

#[tokio::test]
async fn test_new_epoch_appends_to_closed_ledger() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger.json");

    let first = open(&path, 100, 2);
    for i in 0..3 {
        first.submit(format!("a{i}"), "x").await.unwrap();
    }
    first.shutdown().await.unwrap();
    let after_first = fs::read(&path).unwrap();
    let first_tip = verify_ledger(&after_first).unwrap().chain_tip;

    let second = open(&path, 200, 0);
    second.submit("b", "y").await.unwrap();
    second.shutdown().await.unwrap();

    let bytes = fs::read(&path).unwrap();
    serde_json::from_slice::<serde_json::Value>(&bytes).unwrap();

    let summary = verify_ledger(&bytes).unwrap();
    assert_eq!(summary.epochs.len(), 2);
    assert_eq!(summary.epochs[0].invocation_ts, 100);
    assert_eq!(summary.epochs[0].blocks, 2);
    assert_eq!(summary.epochs[1].invocation_ts, 200);
    assert_eq!(summary.epochs[1].blocks, 1);
    assert_eq!(summary.transactions, 4);

    let doc = LedgerDocument::from_slice(&bytes).unwrap();
    assert_eq!(doc.epochs[0].blocks[0].prev_hash, GENESIS_PREV_HASH);
    assert_eq!(doc.epochs[1].blocks[0].prev_hash, first_tip);

    // The earlier epoch's bytes are untouched apart from the final brace.
    assert_eq!(&bytes[..after_first.len() - 1], &after_first[..after_first.len() - 1]);
}

#[tokio::test]
async fn test_invocation_without_transactions_leaves_file_unchanged() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger.json");

    let first = open(&path, 100, 1);
    first.submit("k", "v").await.unwrap();
    first.shutdown().await.unwrap();
    let before = fs::read(&path).unwrap();

    let idle = open(&path, 200, 1);
    idle.shutdown().await.unwrap();

    assert_eq!(fs::read(&path).unwrap(), before);
}

#[tokio::test]
async fn test_max_one_writes_block_per_transaction() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    let acc = open(&path, 100, 1);

    for i in 0..4 {
        acc.submit(format!("k{i}"), "v").await.unwrap();
        assert_eq!(acc.stats().snapshot().blocks_appended, i + 1);
        assert!(!acc.is_timer_armed().await);
    }
    acc.shutdown().await.unwrap();

    let summary = verify_ledger(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(summary.blocks, 4);
}

#[tokio::test(start_paused = true)]
async fn test_count_and_timer_closes_mix() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    let acc = open(&path, 100, 3);

    for i in 0..7 {
        acc.submit(format!("k{i}"), "v").await.unwrap();
    }
    assert_eq!(acc.stats().snapshot().blocks_appended, 2);
    assert!(acc.is_timer_armed().await);

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(acc.stats().snapshot().blocks_appended, 3);
    assert_eq!(acc.open_block_len().await, 0);

    // Nothing pending, so the drain only writes the closing syntax.
    let stats = acc.shutdown().await.unwrap();
    assert_eq!(stats.blocks_appended, 3);

    let doc = LedgerDocument::from_slice(&fs::read(&path).unwrap()).unwrap();
    let sizes: Vec<usize> = doc.epochs[0].blocks.iter().map(|b| b.len()).collect();
    assert_eq!(sizes, vec![3, 3, 1]);
}
