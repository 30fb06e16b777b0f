// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::types::{epoch_label, parse_epoch_label, Block, Transaction, GENESIS_PREV_HASH};

#[test]
fn test_genesis_prev_hash_is_64_zeros() {
    assert_eq!(GENESIS_PREV_HASH.len(), 64);
    assert!(GENESIS_PREV_HASH.bytes().all(|b| b == b'0'));
    assert_eq!(Block::genesis().prev_hash, GENESIS_PREV_HASH);
}

#[test]
fn test_transaction_id_round_trip() {
    let tx = Transaction::new("user", "alice", 1_700_000_123);
    assert!(tx.has_valid_id());

    let json = serde_json::to_string(&tx).unwrap();
    let back: Transaction = serde_json::from_str(&json).unwrap();
    assert_eq!(back.derived_id(), tx.id);
}

#[test]
fn test_transaction_json_shape() {
    let tx = Transaction::new("k", "v", 7);
    let json = serde_json::to_string(&tx).unwrap();
    assert_eq!(
        json,
        format!(r#"{{"id":"{}","key":"k","value":"v","timestamp":7}}"#, tx.id)
    );
}

#[test]
fn test_block_seal_and_successor() {
    let mut block = Block::genesis();
    assert!(block.is_empty());
    assert!(!block.is_sealed());

    block.push(Transaction::new("a", "1", 1));
    block.push(Transaction::new("b", "2", 2));
    let hash = block.seal().to_string();

    assert!(block.is_sealed());
    assert_eq!(hash, block.derived_hash());

    let next = block.successor();
    assert_eq!(next.prev_hash, hash);
    assert!(next.is_empty());
    assert!(!next.is_sealed());
}

#[test]
fn test_block_hash_changes_when_a_transaction_id_is_tampered() {
    let mut block = Block::genesis();
    block.push(Transaction::new("a", "1", 1));
    block.push(Transaction::new("b", "2", 2));
    let original = block.derived_hash();
    assert_eq!(original, block.derived_hash());

    block.transactions[1].id = Transaction::new("b", "3", 2).id;
    assert_ne!(original, block.derived_hash());
}

#[test]
fn test_block_json_uses_ledger_field_names() {
    let mut block = Block::genesis();
    block.push(Transaction::new("k", "v", 1));
    block.seal();

    let value = serde_json::to_value(&block).unwrap();
    let obj = value.as_object().unwrap();
    let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
    assert!(keys.contains(&"prev-block-hash"));
    assert!(keys.contains(&"block-hash"));
    assert!(keys.contains(&"transactions"));

    let text = serde_json::to_string(&block).unwrap();
    assert!(text.starts_with(r#"{"prev-block-hash":"#));
}

#[test]
fn test_epoch_label_round_trip() {
    assert_eq!(epoch_label(1_700_000_000), "invts-1700000000");
    assert_eq!(parse_epoch_label("invts-1700000000"), Some(1_700_000_000));
    assert_eq!(parse_epoch_label("epoch-1"), None);
    assert_eq!(parse_epoch_label("invts-"), None);
}
