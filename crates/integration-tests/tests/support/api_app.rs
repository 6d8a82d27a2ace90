#![allow(dead_code)]

use std::collections::HashSet;
use std::net::SocketAddr;

use api_server::http::{AppState, DedupStore, RateLimiter, build_router};
use shared::agent::{AgentClient, SessionDriver};
use shared::config::{AgentConfig, DedupConfig, RateLimitConfig};

pub struct TestApi {
    pub base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for TestApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Agent config pointed at a mock server, with short intervals so tests run
/// in milliseconds instead of minutes.
pub fn agent_config(agent_base_url: &str) -> AgentConfig {
    AgentConfig {
        base_url: agent_base_url.trim_end_matches('/').to_string(),
        agent_id: "asst_test".to_string(),
        api_key: "test-api-key".to_string(),
        api_version: "2024-05-01-preview".to_string(),
        timeout_ms: 2_000,
        max_retries: 1,
        retry_base_backoff_ms: 5,
        poll_interval_ms: 10,
        max_polls_blocking: 5,
        max_polls_streaming: 10,
        reuse_session: false,
        max_response_chars: 500_000,
    }
}

pub async fn start_api(agent: AgentConfig) -> TestApi {
    start_api_with_rate_limit(
        agent,
        RateLimitConfig {
            max_requests: 20,
            window_seconds: 60,
        },
    )
    .await
}

pub async fn start_api_with_rate_limit(
    agent: AgentConfig,
    rate_limit: RateLimitConfig,
) -> TestApi {
    let client = AgentClient::new(agent).expect("agent client should initialize");

    let app = build_router(AppState {
        driver: SessionDriver::new(client),
        rate_limiter: RateLimiter::new(rate_limit),
        dedup: DedupStore::new(DedupConfig {
            ttl_ms: 5_000,
            max_entries: 100,
            cleanup_threshold: 150,
        }),
        trusted_proxy_ips: HashSet::new(),
        max_message_chars: 2_000,
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("api listener should bind");
    let bind_addr = listener
        .local_addr()
        .expect("api listener local address should exist");

    let handle = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("api server should run");
    });

    TestApi {
        base_url: format!("http://{bind_addr}"),
        handle,
    }
}
