//! Aggregator library surface: the pieces `main.rs` wires together, pulled
//! out so integration tests can spawn the real router without duplicating
//! it.

pub mod config;
pub mod epoch;
pub mod errors;
pub mod handlers;
pub mod payout;
pub mod store;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use epoch::EpochManager;
use payout::PayoutPolicy;
use store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub epochs: Arc<EpochManager>,
    pub payout_policy: Arc<dyn PayoutPolicy>,
    pub max_receipt_bytes: usize,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/commit", post(handlers::commit))
        .route("/claim", post(handlers::claim))
        .route("/state", get(handlers::state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
