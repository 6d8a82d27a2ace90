//! Fixed-window request limiting for the chat endpoints.
//!
//! The first request for a key (or the first after window expiry) resets
//! the record to a count of one and a fresh expiry; further requests in the
//! window increment the count and are denied once the maximum is reached.
//! Expired records are swept lazily with a small probability per call.

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;
use shared::config::RateLimitConfig;
use tracing::warn;

use super::AppState;
use super::errors::too_many_requests_response;

const CLEANUP_PROBABILITY: f64 = 0.01;

#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    entries: Arc<Mutex<HashMap<String, RateRecord>>>,
}

#[derive(Debug, Clone, Copy)]
struct RateRecord {
    count: u32,
    window_reset: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Denied { retry_after_seconds: u64 },
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn allow(&self, client_key: &str) -> RateLimitDecision {
        if rand::random::<f64>() < CLEANUP_PROBABILITY {
            self.sweep_at(Instant::now());
        }
        self.allow_at(client_key, Instant::now())
    }

    fn allow_at(&self, client_key: &str, now: Instant) -> RateLimitDecision {
        let window = Duration::from_secs(self.config.window_seconds);
        let mut entries = self
            .entries
            .lock()
            .expect("rate limiter mutex should not be poisoned");

        let record = entries.entry(client_key.to_string()).or_insert(RateRecord {
            count: 0,
            window_reset: now + window,
        });

        if now >= record.window_reset {
            *record = RateRecord {
                count: 1,
                window_reset: now + window,
            };
            return RateLimitDecision::Allowed;
        }

        if record.count >= self.config.max_requests {
            let retry_after_seconds = record
                .window_reset
                .saturating_duration_since(now)
                .as_secs()
                .max(1);
            return RateLimitDecision::Denied {
                retry_after_seconds,
            };
        }

        record.count += 1;
        RateLimitDecision::Allowed
    }

    fn sweep_at(&self, now: Instant) {
        let mut entries = self
            .entries
            .lock()
            .expect("rate limiter sweep mutex should not be poisoned");
        entries.retain(|_, record| now < record.window_reset);
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.entries
            .lock()
            .expect("test mutex should not be poisoned")
            .len()
    }
}

pub(super) async fn chat_rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let is_chat_post = req.method() == Method::POST
        && matches!(req.uri().path(), "/v1/chat" | "/v1/chat/stream");
    if !is_chat_post {
        return next.run(req).await;
    }

    let client_key = client_key(&req, &state.trusted_proxy_ips);

    match state.rate_limiter.allow(&client_key) {
        RateLimitDecision::Allowed => next.run(req).await,
        RateLimitDecision::Denied {
            retry_after_seconds,
        } => {
            warn!(
                %client_key,
                retry_after_seconds, "chat request denied by rate limit"
            );
            too_many_requests_response(retry_after_seconds)
        }
    }
}

/// Derive the limiter key from the peer address. Forwarding headers are
/// spoofable, so they are consulted only when the direct peer is one of the
/// configured trusted proxies; the key is then the rightmost address in the
/// chain that is not itself a trusted proxy.
fn client_key(req: &Request, trusted_proxy_ips: &HashSet<IpAddr>) -> String {
    let Some(peer_ip) = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|connect_info| connect_info.0.ip())
    else {
        return "unknown".to_string();
    };

    if !trusted_proxy_ips.contains(&peer_ip) {
        return format!("ip:{peer_ip}");
    }

    let forwarded_ip = forwarded_chain(req)
        .into_iter()
        .rev()
        .find(|ip| !trusted_proxy_ips.contains(ip));

    format!("ip:{}", forwarded_ip.unwrap_or(peer_ip))
}

fn forwarded_chain(req: &Request) -> Vec<IpAddr> {
    req.headers()
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(','))
        .map(str::trim)
        .filter_map(|entry| entry.parse::<IpAddr>().ok())
        .collect()
}
