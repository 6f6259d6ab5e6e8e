//! Gateway library surface, split out of `main.rs` so integration tests
//! can spawn the real router against a `MockOverlay`.

pub mod balancer;
pub mod canary;
pub mod config;
pub mod errors;
pub mod handler;
pub mod ratelimit;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use quiver_core::overlay::Overlay;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use balancer::LoadBalancer;
use ratelimit::PerTokenLimiter;

#[derive(Clone)]
pub struct AppState {
    pub overlay: Arc<dyn Overlay>,
    pub limiter: Arc<PerTokenLimiter>,
    pub balancer: Arc<LoadBalancer>,
    pub canary_rate: f64,
    pub max_prompt_bytes: usize,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handler::health_check))
        .route("/generate", post(handler::generate))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
