//! Session lifecycle and the run polling state machine.
//!
//! In stateless mode (the default) every question gets a brand-new session:
//! a deliberate accuracy-over-latency tradeoff so no conversational context
//! bleeds between unrelated questions. Stateful mode keeps one process-wide
//! session until a reset clears it.
//!
//! `RunPoller` owns no timer: callers drive `poll()` and sleep between
//! steps, so the blocking handler and the SSE emitter share one state
//! machine while pacing (and emitting progress events) their own way.

use std::sync::{Arc, Mutex};

use tokio::time::{Duration, sleep};
use tracing::{debug, info};

use super::AgentError;
use super::client::{AgentClient, RunStatus};
use super::prompt::build_user_message;

#[derive(Clone)]
pub struct SessionDriver {
    client: AgentClient,
    session: Arc<Mutex<Option<String>>>,
}

#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub thread_id: String,
    pub run_id: String,
    pub status: RunStatus,
}

impl SessionDriver {
    pub fn new(client: AgentClient) -> Self {
        Self {
            client,
            session: Arc::new(Mutex::new(None)),
        }
    }

    pub fn client(&self) -> &AgentClient {
        &self.client
    }

    /// Drop the process-wide session so the next request starts fresh.
    /// No-op in stateless mode, where nothing is ever stored.
    pub fn reset_session(&self) {
        self.session
            .lock()
            .expect("session mutex should not be poisoned")
            .take();
    }

    /// Create the session/message/run for one question. Returns the handles
    /// the caller needs to poll the run to completion.
    pub async fn prepare(&self, question: &str, reset: bool) -> Result<PreparedRun, AgentError> {
        let thread_id = self.resolve_session(reset).await?;
        self.client
            .post_message(&thread_id, &build_user_message(question))
            .await?;
        let run = self.client.create_run(&thread_id).await?;
        info!(
            %thread_id,
            run_id = %run.id,
            status = run.status.as_str(),
            "agent run created"
        );

        Ok(PreparedRun {
            thread_id,
            run_id: run.id,
            status: run.status,
        })
    }

    pub fn poller(&self, prepared: &PreparedRun, max_polls: u32) -> RunPoller {
        RunPoller {
            thread_id: prepared.thread_id.clone(),
            run_id: prepared.run_id.clone(),
            max_polls,
            poll_count: 0,
            last_status: prepared.status,
        }
    }

    /// First assistant-authored text block from the session, messages in
    /// ascending order.
    pub async fn fetch_transcript(&self, thread_id: &str) -> Result<String, AgentError> {
        let messages = self.client.list_messages(thread_id).await?;

        messages
            .iter()
            .filter(|message| message.role == "assistant")
            .flat_map(|message| message.content.iter())
            .find_map(|block| {
                if block.kind != "text" {
                    return None;
                }
                block.text.as_ref().map(|text| text.value.clone())
            })
            .ok_or(AgentError::NoResponse)
    }

    /// Blocking path: prepare, poll at the configured interval until
    /// terminal, then fetch the transcript.
    pub async fn submit_question(&self, question: &str, reset: bool) -> Result<String, AgentError> {
        let prepared = self.prepare(question, reset).await?;
        let mut poller = self.poller(&prepared, self.client.config().max_polls_blocking);
        let interval = Duration::from_millis(self.client.config().poll_interval_ms);

        loop {
            match poller.poll(&self.client).await? {
                PollStep::Pending { .. } => sleep(interval).await,
                PollStep::Completed { poll_count } => {
                    debug!(run_id = %prepared.run_id, poll_count, "agent run completed");
                    break;
                }
            }
        }

        self.fetch_transcript(&prepared.thread_id).await
    }

    async fn resolve_session(&self, reset: bool) -> Result<String, AgentError> {
        if !self.client.config().reuse_session {
            return self.client.create_thread().await;
        }

        if reset {
            self.reset_session();
        }

        let existing = self
            .session
            .lock()
            .expect("session mutex should not be poisoned")
            .clone();
        if let Some(thread_id) = existing {
            debug!(%thread_id, "reusing existing agent session");
            return Ok(thread_id);
        }

        let thread_id = self.client.create_thread().await?;
        // Two requests may race past the check above; the later creation
        // wins and the earlier thread is simply never reused.
        *self
            .session
            .lock()
            .expect("session mutex should not be poisoned") = Some(thread_id.clone());
        info!(%thread_id, "created new agent session");
        Ok(thread_id)
    }
}

/// One-run polling state machine. Each `poll()` fetches the run state once;
/// the caller sleeps between steps. Exceeding `max_polls` is a fatal
/// timeout, never a silent retry.
#[derive(Debug)]
pub struct RunPoller {
    thread_id: String,
    run_id: String,
    max_polls: u32,
    poll_count: u32,
    last_status: RunStatus,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollStep {
    Pending {
        status: RunStatus,
        poll_count: u32,
        status_changed: bool,
    },
    Completed {
        poll_count: u32,
    },
}

impl RunPoller {
    pub fn poll_count(&self) -> u32 {
        self.poll_count
    }

    pub async fn poll(&mut self, client: &AgentClient) -> Result<PollStep, AgentError> {
        if self.poll_count >= self.max_polls {
            return Err(AgentError::RunTimeout {
                polls: self.poll_count,
            });
        }
        self.poll_count += 1;

        let run = client.get_run(&self.thread_id, &self.run_id).await?;
        match run.status {
            status if status.is_pending() => {
                let status_changed = status != self.last_status;
                self.last_status = status;
                Ok(PollStep::Pending {
                    status,
                    poll_count: self.poll_count,
                    status_changed,
                })
            }
            RunStatus::Completed => Ok(PollStep::Completed {
                poll_count: self.poll_count,
            }),
            terminal => {
                let detail = run
                    .last_error
                    .map(|last_error| last_error.describe())
                    .unwrap_or_else(|| format!("run ended with status {}", terminal.as_str()));
                Err(AgentError::RunFailed { detail })
            }
        }
    }
}
