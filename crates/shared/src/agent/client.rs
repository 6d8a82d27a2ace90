//! HTTP client for the remote agent service (threads / messages / runs).
//!
//! Transient failures (timeouts, 5xx, 429) are retried with a doubling
//! backoff up to the configured cap. Credential rejections (401/403) are
//! fatal immediately and never retried.

use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::time::sleep;
use tracing::warn;

use super::AgentError;
use crate::config::{AgentConfig, ConfigError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    Expired,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Still worth polling? Everything except `queued`/`in_progress` is
    /// terminal; `cancelled`/`expired`/unknown states count as failed.
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Queued | Self::InProgress)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunState {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl RunError {
    pub fn describe(&self) -> String {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => format!("{code}: {message}"),
            (Some(code), None) => code.clone(),
            (None, Some(message)) => message.clone(),
            (None, None) => "no error detail reported".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ThreadHandle {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ThreadMessage {
    pub role: String,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<TextBlock>,
}

#[derive(Debug, Deserialize)]
pub struct TextBlock {
    pub value: String,
}

#[derive(Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    config: AgentConfig,
}

impl AgentClient {
    pub fn new(config: AgentConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub async fn create_thread(&self) -> Result<String, AgentError> {
        let thread: ThreadHandle = self
            .request(Method::POST, "/threads", &[], Some(json!({})))
            .await?;
        Ok(thread.id)
    }

    pub async fn post_message(&self, thread_id: &str, content: &str) -> Result<(), AgentError> {
        let _: Value = self
            .request(
                Method::POST,
                &format!("/threads/{thread_id}/messages"),
                &[],
                Some(json!({ "role": "user", "content": content })),
            )
            .await?;
        Ok(())
    }

    pub async fn create_run(&self, thread_id: &str) -> Result<RunState, AgentError> {
        self.request(
            Method::POST,
            &format!("/threads/{thread_id}/runs"),
            &[],
            Some(json!({ "assistant_id": self.config.agent_id })),
        )
        .await
    }

    pub async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<RunState, AgentError> {
        self.request(
            Method::GET,
            &format!("/threads/{thread_id}/runs/{run_id}"),
            &[],
            None,
        )
        .await
    }

    pub async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, AgentError> {
        let list: MessageList = self
            .request(
                Method::GET,
                &format!("/threads/{thread_id}/messages"),
                &[("order", "asc")],
                None,
            )
            .await?;
        Ok(list.data)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<T, AgentError> {
        let mut attempt = 0_u32;

        loop {
            match self.send_once(method.clone(), path, query, body.as_ref()).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    if err.retryable && attempt < self.config.max_retries {
                        let backoff_multiplier = 2_u64.saturating_pow(attempt);
                        let backoff_ms = self
                            .config
                            .retry_base_backoff_ms
                            .saturating_mul(backoff_multiplier);
                        warn!(
                            path,
                            attempt = attempt + 1,
                            backoff_ms,
                            "retrying transient agent request failure: {}",
                            err.error
                        );
                        sleep(Duration::from_millis(backoff_ms)).await;
                        attempt = attempt.saturating_add(1);
                        continue;
                    }

                    return Err(err.error);
                }
            }
        }
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<T, SendAttemptError> {
        let url = format!("{}{path}", self.config.base_url);
        let mut request = self
            .http
            .request(method, &url)
            .bearer_auth(&self.config.api_key)
            .query(&[("api-version", self.config.api_version.as_str())])
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                SendAttemptError::retryable(AgentError::Network("request timed out".to_string()))
            } else {
                SendAttemptError::retryable(AgentError::Network(
                    "agent endpoint unreachable".to_string(),
                ))
            }
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SendAttemptError::fatal(AgentError::Auth {
                status: status.as_u16(),
            }));
        }

        let body_text = response.text().await.map_err(|_| {
            SendAttemptError::fatal(AgentError::InvalidPayload(
                "response body read failed".to_string(),
            ))
        })?;

        if !status.is_success() {
            let error = AgentError::Network(format!(
                "status={} code={}",
                status.as_u16(),
                parse_service_error_code(&body_text)
            ));
            return Err(if is_retryable_status(status) {
                SendAttemptError::retryable(error)
            } else {
                SendAttemptError::fatal(error)
            });
        }

        serde_json::from_str::<T>(&body_text).map_err(|_| {
            SendAttemptError::fatal(AgentError::InvalidPayload(
                "response json parse failed".to_string(),
            ))
        })
    }
}

#[derive(Debug)]
struct SendAttemptError {
    error: AgentError,
    retryable: bool,
}

impl SendAttemptError {
    fn retryable(error: AgentError) -> Self {
        Self {
            error,
            retryable: true,
        }
    }

    fn fatal(error: AgentError) -> Self {
        Self {
            error,
            retryable: false,
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn parse_service_error_code(body: &str) -> String {
    #[derive(Deserialize)]
    struct ServiceErrorEnvelope {
        error: Option<ServiceErrorDetails>,
    }

    #[derive(Deserialize)]
    struct ServiceErrorDetails {
        code: Option<Value>,
    }

    let parsed = serde_json::from_str::<ServiceErrorEnvelope>(body).ok();
    let Some(code) = parsed
        .and_then(|envelope| envelope.error)
        .and_then(|details| details.code)
    else {
        return "unknown".to_string();
    };

    match code {
        Value::String(code) => code,
        Value::Number(code) => code.to_string(),
        _ => "unknown".to_string(),
    }
}
