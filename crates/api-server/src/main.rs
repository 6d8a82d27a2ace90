use std::net::SocketAddr;

use api_server::http;
use shared::agent::{AgentClient, SessionDriver};
use shared::config::ApiConfig;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "api_server=debug,shared=debug,axum=info".to_string()),
        )
        .init();

    let config = match ApiConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("failed to read config: {err}");
            std::process::exit(1);
        }
    };

    let client = match AgentClient::new(config.agent.clone()) {
        Ok(client) => client,
        Err(err) => {
            error!("failed to build agent client: {err}");
            std::process::exit(1);
        }
    };

    let app = http::build_router(http::AppState {
        driver: SessionDriver::new(client),
        rate_limiter: http::RateLimiter::new(config.rate_limit),
        dedup: http::DedupStore::new(config.dedup),
        trusted_proxy_ips: config.trusted_proxy_ips.iter().copied().collect(),
        max_message_chars: config.max_message_chars,
    });

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .unwrap_or_else(|_| "127.0.0.1:8080".parse().expect("valid default bind addr"));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind should succeed");

    info!(
        "api server listening on {}",
        listener.local_addr().unwrap_or(addr)
    );
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("server should run");
}
