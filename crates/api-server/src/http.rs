use std::collections::HashSet;
use std::net::IpAddr;

use axum::routing::{get, post};
use axum::{Router, middleware};
use shared::agent::SessionDriver;

mod chat;
mod chat_stream;
mod dedup;
mod errors;
mod health;
mod observability;
mod rate_limit;
mod reset;

pub use dedup::DedupStore;
pub use rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub driver: SessionDriver,
    pub rate_limiter: RateLimiter,
    pub dedup: DedupStore,
    pub trusted_proxy_ips: HashSet<IpAddr>,
    pub max_message_chars: usize,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/v1/chat", post(chat::chat))
        .route("/v1/chat/stream", post(chat_stream::chat_stream))
        .route("/v1/chat/reset", post(reset::reset_conversation))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::chat_rate_limit_middleware,
        ))
        .layer(middleware::from_fn(
            observability::request_observability_middleware,
        ))
        .with_state(state)
}
