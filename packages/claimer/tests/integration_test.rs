//! Integration tests for the bridge claimer
//!
//! These tests require real infrastructure:
//! - EVM nodes for every chain in CHAIN_RPC_URLS
//! - Bridge contracts deployed and listed in ROUTING_CONFIG
//!
//! Run with: cargo test -p bridge-claimer --test integration_test -- --ignored --nocapture
//!
//! Required environment variables:
//! - ROUTING_CONFIG, CHAIN_RPC_URLS (see the claimer configuration)
//! - CLAIMER_TXS - JSON file of bridge transactions to inspect
//! - EVM_RPC_URL (default: http://localhost:8545)

use std::env;
use std::time::Duration;

use claimer::app::App;
use claimer::config::Config;
use claimer::records::load_transactions;

fn evm_rpc_url() -> String {
    env::var("EVM_RPC_URL").unwrap_or_else(|_| "http://localhost:8545".to_string())
}

#[tokio::test]
#[ignore = "requires an EVM node"]
async fn test_evm_node_connectivity() {
    let client = reqwest::Client::new();
    let response = client
        .post(evm_rpc_url())
        .header("Content-Type", "application/json")
        .body(r#"{"jsonrpc":"2.0","method":"eth_chainId","params":[],"id":1}"#)
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("EVM node should be reachable");

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.expect("JSON-RPC response");
    assert!(body["result"].is_string(), "unexpected response: {}", body);
}

#[tokio::test]
#[ignore = "requires deployed bridges and recorded transactions"]
async fn test_status_of_recorded_transactions() {
    let config = Config::load().expect("claimer configuration");
    let txs_path = env::var("CLAIMER_TXS").expect("CLAIMER_TXS not set");
    let app = App::new(config).expect("app");

    let txs = load_transactions(txs_path).expect("transaction records");
    assert!(!txs.is_empty(), "no transactions recorded");

    for tx in &txs {
        let report = app.status(tx).await.expect("status report");
        println!("{}", report);
        assert_eq!(Some(report.msg_hash), tx.msg_hash);
    }
}

#[tokio::test]
#[ignore = "requires deployed bridges and recorded transactions"]
async fn test_watch_emits_status() {
    let config = Config::load().expect("claimer configuration");
    let txs_path = env::var("CLAIMER_TXS").expect("CLAIMER_TXS not set");
    let app = App::new(config).expect("app");

    let tx = load_transactions(txs_path)
        .expect("transaction records")
        .into_iter()
        .next()
        .expect("at least one transaction");

    let Some(mut handle) = app
        .registry()
        .start_polling(tx, true)
        .await
        .expect("start polling")
    else {
        println!("Message already processed");
        return;
    };

    let event = tokio::time::timeout(Duration::from_secs(30), handle.recv())
        .await
        .expect("first event within 30s");
    println!("{:?}", event);
    assert!(event.is_some());

    app.shutdown().await;
    assert!(app.registry().is_empty().await);
}
