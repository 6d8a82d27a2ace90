pub mod client;
pub mod driver;
pub mod prompt;

pub use client::{AgentClient, RunState, RunStatus};
pub use driver::{PollStep, PreparedRun, RunPoller, SessionDriver};
pub use prompt::{NOT_FOUND_REFUSAL, build_user_message, escape_prompt_injection};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent credential was rejected (status {status})")]
    Auth { status: u16 },
    #[error("agent request failed: {0}")]
    Network(String),
    #[error("agent returned an unexpected payload: {0}")]
    InvalidPayload(String),
    #[error("agent run failed: {detail}")]
    RunFailed { detail: String },
    #[error("agent run timed out after {polls} polls")]
    RunTimeout { polls: u32 },
    #[error("agent run completed without assistant content")]
    NoResponse,
}

impl AgentError {
    /// Short machine-readable tag, used for the SSE `errorType` field and
    /// structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "AuthError",
            Self::Network(_) => "NetworkError",
            Self::InvalidPayload(_) => "InvalidPayload",
            Self::RunFailed { .. } => "RunFailed",
            Self::RunTimeout { .. } => "RunTimeout",
            Self::NoResponse => "NoResponse",
        }
    }
}
