mod common;

use common::*;
use mev_guard_chain::{ChainDataClient, ChainTransaction, Network};
use mev_guard_heuristics::dex_registry::UNISWAP_V2_SWAP_TOPIC;
use mev_guard_heuristics::{
    AttackType, DetectionMode, DetectorConfig, DexRegistry, SandwichDetector, ScanError,
};
use rust_decimal::Decimal;
use std::sync::Arc;

const BLOCK: u64 = 100;

fn victim() -> alloy::primitives::Address {
    wallet(0xa1)
}

fn attacker() -> alloy::primitives::Address {
    wallet(0xb2)
}

/// Attacker at 2 and 5 around the victim at 3; `backrun_to` picks the
/// backrun's recipient.
fn sandwich_block(backrun_to: alloy::primitives::Address) -> Vec<ChainTransaction> {
    vec![
        chain_tx(BLOCK, 0, wallet(0x09), PLAIN),
        chain_tx(BLOCK, 1, wallet(0x08), PLAIN),
        chain_tx(BLOCK, 2, attacker(), ROUTER),
        chain_tx(BLOCK, 3, victim(), ROUTER),
        chain_tx(BLOCK, 4, wallet(0x07), PLAIN),
        chain_tx(BLOCK, 5, attacker(), backrun_to),
    ]
}

fn detector(client: &Arc<MockChainClient>, mode: DetectionMode) -> SandwichDetector {
    let client: Arc<dyn ChainDataClient> = client.clone();
    SandwichDetector::new(
        client,
        Arc::new(DexRegistry::new()),
        DetectorConfig::new(mode, None),
    )
}

#[tokio::test]
async fn detects_router_sandwich() {
    let client = Arc::new(MockChainClient::new(Network::Ethereum).with_block(BLOCK, sandwich_block(ROUTER)));
    let analysis = detector(&client, DetectionMode::Precise)
        .detect(tx_hash(BLOCK, 3))
        .await
        .unwrap();

    assert!(analysis.is_mev_attack);
    assert_eq!(analysis.attack_type, AttackType::Sandwich);
    assert_eq!(analysis.victim_index, 3);
    assert_eq!(analysis.block_size, 6);

    let attack = analysis.attack.unwrap();
    assert_eq!(attack.frontrun_tx_hash, tx_hash(BLOCK, 2));
    assert_eq!(attack.backrun_tx_hash, tx_hash(BLOCK, 5));
    assert_eq!(attack.attacker_address, attacker());
    assert_eq!(attack.victim_address, victim());
    assert_eq!((attack.frontrun_index, attack.backrun_index), (2, 5));
    assert_eq!(attack.victim_loss_usd, Decimal::ZERO);
    assert!(attack.loss_is_estimate);
    assert_eq!(client.calls("get_receipt"), 0);
}

#[tokio::test]
async fn non_router_backrun_is_clean() {
    let client = Arc::new(MockChainClient::new(Network::Ethereum).with_block(BLOCK, sandwich_block(PLAIN)));
    let analysis = detector(&client, DetectionMode::Precise)
        .detect(tx_hash(BLOCK, 3))
        .await
        .unwrap();

    assert!(!analysis.is_mev_attack);
    assert_eq!(analysis.attack_type, AttackType::None);
    assert!(analysis.attack.is_none());
}

#[tokio::test]
async fn detection_is_idempotent() {
    let client = Arc::new(MockChainClient::new(Network::Ethereum).with_block(BLOCK, sandwich_block(ROUTER)));
    let detector = detector(&client, DetectionMode::Precise);

    let mut first = detector.detect(tx_hash(BLOCK, 3)).await.unwrap();
    let mut second = detector.detect(tx_hash(BLOCK, 3)).await.unwrap();
    // Only the detection time may differ between runs.
    for analysis in [&mut first, &mut second] {
        if let Some(attack) = analysis.attack.as_mut() {
            attack.timestamp = 0;
        }
    }
    assert_eq!(first, second);
}

#[tokio::test]
async fn unknown_transaction_is_not_found() {
    let client = Arc::new(MockChainClient::new(Network::Ethereum));
    let err = detector(&client, DetectionMode::Precise)
        .detect(tx_hash(1, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::NotFound(_)));
}

#[tokio::test]
async fn pending_transaction_is_not_found() {
    let mut pending = chain_tx(BLOCK, 0, victim(), ROUTER);
    pending.block_number = None;
    pending.transaction_index = None;
    let mut client = MockChainClient::new(Network::Ethereum);
    client.transactions.insert(pending.hash, pending.clone());
    let client = Arc::new(client);

    let err = detector(&client, DetectionMode::Precise)
        .detect(pending.hash)
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::NotFound(_)));
    assert_eq!(client.calls("get_block_transactions"), 0);
}

#[tokio::test]
async fn missing_block_is_not_found() {
    let tx = chain_tx(BLOCK, 0, victim(), ROUTER);
    let mut client = MockChainClient::new(Network::Ethereum);
    client.transactions.insert(tx.hash, tx.clone());
    let client = Arc::new(client);

    let err = detector(&client, DetectionMode::Precise)
        .detect(tx.hash)
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::NotFound(_)));
}

#[tokio::test]
async fn victim_absent_from_its_block_is_inconsistent() {
    let orphan = chain_tx(BLOCK, 9, victim(), ROUTER);
    let mut client = MockChainClient::new(Network::Ethereum).with_block(BLOCK, sandwich_block(ROUTER));
    client.transactions.insert(orphan.hash, orphan.clone());
    let client = Arc::new(client);

    let err = detector(&client, DetectionMode::Precise)
        .detect(orphan.hash)
        .await
        .unwrap_err();
    match err {
        ScanError::InconsistentState {
            tx_hash,
            block_number,
        } => {
            assert_eq!(tx_hash, orphan.hash);
            assert_eq!(block_number, BLOCK);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn block_fetch_failure_propagates() {
    let mut client = MockChainClient::new(Network::Ethereum).with_block(BLOCK, sandwich_block(ROUTER));
    client.failing_blocks.insert(BLOCK);
    let client = Arc::new(client);

    let err = detector(&client, DetectionMode::Precise)
        .detect(tx_hash(BLOCK, 3))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
}

fn unlisted_sandwich_client() -> MockChainClient {
    let block = vec![
        chain_tx(BLOCK, 0, attacker(), PLAIN),
        chain_tx(BLOCK, 1, victim(), ROUTER),
        chain_tx(BLOCK, 2, attacker(), PLAIN),
    ];
    MockChainClient::new(Network::Ethereum)
        .with_block(BLOCK, block)
        .with_receipt(swap_receipt(tx_hash(BLOCK, 0), UNISWAP_V2_SWAP_TOPIC))
        .with_receipt(swap_receipt(tx_hash(BLOCK, 2), UNISWAP_V2_SWAP_TOPIC))
}

#[tokio::test]
async fn thorough_mode_uses_swap_events() {
    let client = Arc::new(unlisted_sandwich_client());
    let analysis = detector(&client, DetectionMode::Thorough)
        .detect(tx_hash(BLOCK, 1))
        .await
        .unwrap();

    assert!(analysis.is_mev_attack);
    assert_eq!(analysis.window, 20);
    assert_eq!(client.calls("get_receipt"), 2);
}

#[tokio::test]
async fn precise_mode_ignores_swap_events() {
    let client = Arc::new(unlisted_sandwich_client());
    let analysis = detector(&client, DetectionMode::Precise)
        .detect(tx_hash(BLOCK, 1))
        .await
        .unwrap();

    assert!(!analysis.is_mev_attack);
    assert_eq!(client.calls("get_receipt"), 0);
}

#[tokio::test]
async fn thorough_mode_prefers_router_membership() {
    let client = Arc::new(MockChainClient::new(Network::Ethereum).with_block(BLOCK, sandwich_block(ROUTER)));
    let analysis = detector(&client, DetectionMode::Thorough)
        .detect(tx_hash(BLOCK, 3))
        .await
        .unwrap();

    assert!(analysis.is_mev_attack);
    assert_eq!(client.calls("get_receipt"), 0);
}

#[tokio::test]
async fn thorough_mode_classifies_each_transaction_once() {
    // The frontrun has no swap receipt, so both pairs it opens fail on it.
    let block = vec![
        chain_tx(BLOCK, 0, attacker(), PLAIN),
        chain_tx(BLOCK, 1, victim(), ROUTER),
        chain_tx(BLOCK, 2, attacker(), PLAIN),
        chain_tx(BLOCK, 3, attacker(), PLAIN),
    ];
    let client = Arc::new(MockChainClient::new(Network::Ethereum).with_block(BLOCK, block));
    let analysis = detector(&client, DetectionMode::Thorough)
        .detect(tx_hash(BLOCK, 1))
        .await
        .unwrap();

    assert!(!analysis.is_mev_attack);
    assert_eq!(client.calls("get_receipt"), 2);
}

#[tokio::test]
async fn block_context_lists_window_without_verdict() {
    let client = Arc::new(MockChainClient::new(Network::Ethereum).with_block(BLOCK, sandwich_block(ROUTER)));
    let context = detector(&client, DetectionMode::Precise)
        .block_context(tx_hash(BLOCK, 3))
        .await
        .unwrap();

    assert_eq!(context.block_number, BLOCK);
    assert_eq!(context.block_size, 6);
    assert_eq!(context.victim_index, 3);
    assert_eq!(context.window, 5);
    assert_eq!(context.before.len(), 3);
    assert_eq!(context.after.len(), 2);
    assert!(context.victim.touches_router);
    assert_eq!(context.victim.router.as_deref(), Some("uniswap_v2_router02"));
    assert!(context.before[2].touches_router);
    assert!(!context.after[0].touches_router);
    assert_eq!(context.after[1].position, 5);
}
