use std::net::IpAddr;

use thiserror::Error;

use crate::config_env::{
    optional_trimmed_env, parse_bool_env, parse_ip_list_env, parse_u32_env, parse_u64_env,
    parse_usize_env, require_env,
};

const DEFAULT_AGENT_API_VERSION: &str = "2024-05-01-preview";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub trusted_proxy_ips: Vec<IpAddr>,
    pub max_message_chars: usize,
    pub rate_limit: RateLimitConfig,
    pub dedup: DedupConfig,
    pub agent: AgentConfig,
}

/// Connection settings for the remote retrieval agent. The credential is a
/// bearer token minted outside this process; it is read once and never
/// refreshed here.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub base_url: String,
    pub agent_id: String,
    pub api_key: String,
    pub api_version: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_base_backoff_ms: u64,
    pub poll_interval_ms: u64,
    pub max_polls_blocking: u32,
    pub max_polls_streaming: u32,
    pub reuse_session: bool,
    pub max_response_chars: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_seconds: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct DedupConfig {
    pub ttl_ms: u64,
    pub max_entries: usize,
    pub cleanup_threshold: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    MissingVar(String),
    #[error("invalid integer in env var {0}")]
    ParseInt(String),
    #[error("invalid boolean in env var {0}")]
    ParseBool(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to build agent http client: {0}")]
    HttpClient(String),
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bind_addr: optional_trimmed_env("API_BIND_ADDR")
                .unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            trusted_proxy_ips: parse_ip_list_env("TRUSTED_PROXY_IPS")?,
            max_message_chars: parse_usize_env("MAX_MESSAGE_CHARS", 2000)?,
            rate_limit: RateLimitConfig {
                max_requests: parse_u32_env("RATE_LIMIT_MAX_REQUESTS", 20)?,
                window_seconds: parse_u64_env("RATE_LIMIT_WINDOW_SECONDS", 60)?,
            },
            dedup: DedupConfig {
                ttl_ms: parse_u64_env("DEDUP_TTL_MS", 5_000)?,
                max_entries: parse_usize_env("DEDUP_MAX_ENTRIES", 100)?,
                cleanup_threshold: parse_usize_env("DEDUP_CLEANUP_THRESHOLD", 150)?,
            },
            agent: AgentConfig::from_env()?,
        })
    }
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = require_env("AGENT_BASE_URL")?;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::InvalidConfiguration(
                "AGENT_BASE_URL must start with http:// or https://".to_string(),
            ));
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent_id: require_env("AGENT_ID")?,
            api_key: require_env("AGENT_API_KEY")?,
            api_version: optional_trimmed_env("AGENT_API_VERSION")
                .unwrap_or_else(|| DEFAULT_AGENT_API_VERSION.to_string()),
            timeout_ms: parse_u64_env("AGENT_TIMEOUT_MS", 15_000)?,
            max_retries: parse_u32_env("AGENT_MAX_RETRIES", 3)?,
            retry_base_backoff_ms: parse_u64_env("AGENT_RETRY_BASE_BACKOFF_MS", 250)?,
            poll_interval_ms: parse_u64_env("AGENT_POLL_INTERVAL_MS", 1_000)?,
            max_polls_blocking: parse_u32_env("AGENT_MAX_POLLS_BLOCKING", 30)?,
            max_polls_streaming: parse_u32_env("AGENT_MAX_POLLS_STREAMING", 120)?,
            reuse_session: parse_bool_env("AGENT_REUSE_SESSION", false)?,
            max_response_chars: parse_usize_env("MAX_RESPONSE_CHARS", 500_000)?,
        })
    }
}
