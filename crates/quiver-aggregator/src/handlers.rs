//! `/commit`, `/claim`, `/state`, `/health` (spec §4.4). Grounded on the
//! teacher's `api::handlers` shape: plain async fns taking
//! `State<AppState>`/`Json<Req>` and returning `Result<Json<Resp>, ApiError>`.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use quiver_core::hashing::sha256_hex;
use quiver_core::merkle::{self, MerkleTree};
use quiver_core::receipt::SignedReceipt;
use quiver_core::Error;

use crate::errors::ApiError;
use crate::AppState;

pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "quiver-aggregator",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CommitRequest {
    pub epoch: u64,
    pub receipts: Vec<SignedReceipt>,
}

#[derive(Debug, Serialize)]
pub struct CommitResponse {
    pub merkle_root_hex: String,
    pub epoch: u64,
    pub receipt_count: usize,
}

pub async fn commit(
    State(state): State<AppState>,
    Json(req): Json<CommitRequest>,
) -> Result<Json<CommitResponse>, ApiError> {
    info!(epoch = req.epoch, count = req.receipts.len(), "committing receipt batch");

    for signed in &req.receipts {
        let canonical = signed
            .receipt
            .canonical_bytes()
            .map_err(ApiError::from)?;
        if canonical.len() > state.max_receipt_bytes {
            return Err(Error::InvalidInput(format!(
                "receipt {} exceeds max size of {} bytes",
                signed.receipt.receipt_id, state.max_receipt_bytes
            ))
            .into());
        }
        state.store.upsert(req.epoch, signed.clone());
    }

    // §4.4 step 2: ordering only observable via /state; the tree below
    // re-sorts leaves by hash regardless.
    let ordered = state.store.epoch_receipts(req.epoch);

    let leaves: Vec<Vec<u8>> = ordered
        .iter()
        .map(|s| s.receipt.canonical_bytes())
        .collect::<Result<_, _>>()
        .map_err(ApiError::from)?;

    let tree = MerkleTree::build(&leaves)
        .map_err(|e| Error::Internal(format!("merkle build failed: {e}")))?;

    let root = tree.root();
    for (i, signed) in ordered.iter().enumerate() {
        let proof = tree
            .proof(i)
            .map_err(|e| Error::Internal(format!("merkle proof failed: {e}")))?;
        state.store.store_proof(&signed.receipt.receipt_id, proof);
    }

    state
        .epochs
        .finalize(req.epoch, root.clone(), ordered.len())?;

    Ok(Json(CommitResponse {
        merkle_root_hex: root,
        epoch: req.epoch,
        receipt_count: ordered.len(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub receipt_id: String,
    pub merkle_proof: Vec<String>,
    pub epoch: u64,
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub valid: bool,
    pub amount: String,
    pub tx_hash: String,
}

pub async fn claim(
    State(state): State<AppState>,
    Json(req): Json<ClaimRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    info!(receipt_id = %req.receipt_id, epoch = req.epoch, "verifying claim");

    let signed = state
        .store
        .get(&req.receipt_id)
        .ok_or_else(|| Error::NotFound(format!("receipt {} not found", req.receipt_id)))?;

    let epoch_info = state
        .epochs
        .get(req.epoch)
        .filter(|info| info.finalized)
        .ok_or_else(|| Error::PreconditionFailed("epoch_not_finalized".to_string()))?;

    let leaf = signed.receipt.canonical_bytes().map_err(ApiError::from)?;
    let valid = merkle::verify(&leaf, &req.merkle_proof, &epoch_info.root);

    let amount = if valid {
        state
            .payout_policy
            .amount(signed.receipt.tokens_in, signed.receipt.tokens_out)
    } else {
        "0".to_string()
    };

    let tx_hash = format!(
        "0x{}",
        sha256_hex(format!("{}{}", req.receipt_id, epoch_info.root).as_bytes())
    );

    Ok(Json(ClaimResponse {
        valid,
        amount,
        tx_hash,
    }))
}

pub async fn state(State(state): State<AppState>) -> Json<serde_json::Value> {
    let exported = state.store.export_state();
    Json(serde_json::to_value(&exported).unwrap_or_else(|_| json!({})))
}
