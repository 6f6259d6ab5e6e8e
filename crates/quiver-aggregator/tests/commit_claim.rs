//! End-to-end `/commit` + `/claim` against a real in-process axum router,
//! in the teacher's own reqwest-against-a-spawned-server style.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use quiver_aggregator::epoch::EpochManager;
use quiver_aggregator::payout::FlatRatePolicy;
use quiver_aggregator::store::Store;
use quiver_aggregator::{router, AppState};
use quiver_core::receipt::{Canary, Ed25519Keypair, RateInfo, Receipt, ReceiptFields};
use serde_json::json;

async fn spawn_server() -> SocketAddr {
    let state = AppState {
        store: Arc::new(Store::new()),
        epochs: Arc::new(EpochManager::new()),
        payout_policy: Arc::new(FlatRatePolicy),
        max_receipt_bytes: 10 * 1024,
    };
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    addr
}

fn signed_receipt(seq: u64, tokens_in: u64, tokens_out: u64) -> serde_json::Value {
    let keypair = Ed25519Keypair::generate();
    let receipt = Receipt::new(ReceiptFields {
        provider_pk: keypair.public_key_base64(),
        model: "llama3".to_string(),
        prompt_hash: "a".repeat(64),
        output_hash: "b".repeat(64),
        tokens_in,
        tokens_out,
        start: Utc.with_ymd_and_hms(2026, 7, 26, 0, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2026, 7, 26, 0, 0, 1).unwrap(),
        seq,
        prev_hash: String::new(),
        canary: Canary::default(),
        rate: RateInfo::default(),
    })
    .unwrap();
    let signed = keypair.sign_receipt(&receipt).unwrap();
    serde_json::to_value(&signed).unwrap()
}

#[tokio::test]
async fn s3_commit_then_claim_round_trips() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let r1 = signed_receipt(1, 5, 10);
    let r1_id = r1["receipt"]["receipt_id"].as_str().unwrap().to_string();
    let r2 = signed_receipt(2, 3, 7);

    let commit_resp: serde_json::Value = client
        .post(format!("{base}/commit"))
        .json(&json!({ "epoch": 19723, "receipts": [r1, r2] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(commit_resp["receipt_count"], 2);
    assert!(!commit_resp["merkle_root_hex"].as_str().unwrap().is_empty());

    let state_resp: serde_json::Value = client
        .get(format!("{base}/state"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let proof = state_resp["proofs"][&r1_id].clone();
    let proof: Vec<String> = serde_json::from_value(proof).unwrap();

    let claim_resp: serde_json::Value = client
        .post(format!("{base}/claim"))
        .json(&json!({ "receipt_id": r1_id, "merkle_proof": proof, "epoch": 19723 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(claim_resp["valid"], true);
    assert_eq!(claim_resp["amount"], "1500");
    let tx_hash = claim_resp["tx_hash"].as_str().unwrap();
    assert!(tx_hash.starts_with("0x"));
    assert_eq!(tx_hash.len(), 2 + 64);
}

#[tokio::test]
async fn s4_claim_before_finalize_is_precondition_failed() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let r1 = signed_receipt(1, 5, 10);
    let r1_id = r1["receipt"]["receipt_id"].as_str().unwrap().to_string();

    client
        .post(format!("{base}/commit"))
        .json(&json!({ "epoch": 1, "receipts": [r1] }))
        .send()
        .await
        .unwrap();

    // Epoch 2 was never committed, so the receipt has no finalized root to
    // verify against.
    let resp = client
        .post(format!("{base}/claim"))
        .json(&json!({ "receipt_id": r1_id, "merkle_proof": [], "epoch": 2 }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("epoch_not_finalized"));
}

#[tokio::test]
async fn claim_for_unknown_receipt_is_not_found() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let resp = client
        .post(format!("{base}/claim"))
        .json(&json!({ "receipt_id": "nope", "merkle_proof": [], "epoch": 999 }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn idempotent_commit_same_root() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let r1 = signed_receipt(1, 1, 1);

    let first: serde_json::Value = client
        .post(format!("{base}/commit"))
        .json(&json!({ "epoch": 42, "receipts": [r1.clone()] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let second: serde_json::Value = client
        .post(format!("{base}/commit"))
        .json(&json!({ "epoch": 42, "receipts": [r1] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(first["merkle_root_hex"], second["merkle_root_hex"]);
}
