//! `/generate` against a `MockOverlay` standing in for a live libp2p swarm
//! (spec §11's prescribed test shape for gateway scenarios S5/S6 and the
//! canary property).

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use quiver_core::overlay::{InboundHandler, InferenceResult, PeerId, StreamRequest, StreamResponse};
use quiver_core::receipt::{Canary, Ed25519Keypair, RateInfo, Receipt, ReceiptFields};
use quiver_core::test_support::MockOverlay;
use quiver_gateway::balancer::LoadBalancer;
use quiver_gateway::ratelimit::PerTokenLimiter;
use quiver_gateway::{router, AppState};
use serde_json::json;

struct EchoHandler;

#[async_trait]
impl InboundHandler for EchoHandler {
    async fn handle(&self, request: StreamRequest) -> InferenceResult {
        let keypair = Ed25519Keypair::generate();
        let receipt = Receipt::new(ReceiptFields {
            provider_pk: keypair.public_key_base64(),
            model: request.model,
            prompt_hash: "a".repeat(64),
            output_hash: "b".repeat(64),
            tokens_in: 3,
            tokens_out: 2,
            start: Utc.with_ymd_and_hms(2026, 7, 26, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2026, 7, 26, 0, 0, 1).unwrap(),
            seq: 1,
            prev_hash: String::new(),
            canary: Canary::default(),
            rate: RateInfo::default(),
        })
        .map_err(|e| e.to_string())?;
        let signed_receipt = keypair.sign_receipt(&receipt).map_err(|e| e.to_string())?;
        Ok(StreamResponse {
            completion: format!("echo: {}", request.prompt),
            signed_receipt,
        })
    }
}

async fn spawn_server(canary_rate: f64, rate_limit_per_token: u32) -> SocketAddr {
    let local = PeerId("gateway-under-test".to_string());
    let overlay = MockOverlay::new(local);
    overlay.register(PeerId("provider-1".to_string()), Arc::new(EchoHandler));

    let state = AppState {
        overlay: Arc::new(overlay),
        limiter: Arc::new(PerTokenLimiter::new(rate_limit_per_token)),
        balancer: Arc::new(LoadBalancer::new()),
        canary_rate,
        max_prompt_bytes: 4096,
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn s5_prompt_oversize_rejected() {
    let addr = spawn_server(0.0, 100).await;
    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let resp = client
        .post(format!("{base}/generate"))
        .json(&json!({ "prompt": "x".repeat(4097), "model": "llama3", "token": "t1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn s5_prompt_at_limit_proceeds() {
    let addr = spawn_server(0.0, 100).await;
    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let resp = client
        .post(format!("{base}/generate"))
        .json(&json!({ "prompt": "x".repeat(4096), "model": "llama3", "token": "t1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn s6_rate_limit_burst_then_denial() {
    let addr = spawn_server(0.0, 1).await;
    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let resp = client
            .post(format!("{base}/generate"))
            .json(&json!({ "prompt": "hello", "model": "llama3", "token": "same-token" }))
            .send()
            .await
            .unwrap();
        statuses.push(resp.status());
    }

    assert_eq!(statuses[0], reqwest::StatusCode::OK);
    assert_eq!(statuses[1], reqwest::StatusCode::OK);
    assert_eq!(statuses[2], reqwest::StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn canary_completion_never_leaks_to_client() {
    let addr = spawn_server(1.0, 100).await;
    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let resp: serde_json::Value = client
        .post(format!("{base}/generate"))
        .json(&json!({ "prompt": "tell me a joke", "model": "llama3", "token": "t2" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(resp["completion"], "Canary response hidden");
    assert!(!resp["receipt"]["receipt"]["canary"]["id"]
        .as_str()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn empty_prompt_is_invalid_request() {
    let addr = spawn_server(0.0, 100).await;
    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let resp = client
        .post(format!("{base}/generate"))
        .json(&json!({ "prompt": "", "model": "llama3", "token": "t3" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
}
