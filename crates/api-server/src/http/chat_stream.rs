//! Streaming chat endpoint.
//!
//! The agent round-trip runs in a spawned task that feeds SSE frames
//! through a channel into the response body. While the run is polled the
//! client sees status updates and heartbeats; once the transcript arrives
//! it is split and re-streamed chunk by chunk with light pacing so the UI
//! renders progressively. A closed channel means the client went away, and
//! the task stops emitting immediately.

use std::convert::Infallible;
use std::time::Duration;

use axum::Json;
use axum::body::Body;
use axum::extract::{Extension, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use shared::agent::AgentError;
use shared::models::{ChatRequest, StreamEvent};
use shared::policy::parse_response;
use shared::sse::encode_stream_event;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use super::AppState;
use super::chat::log_validation;
use super::dedup::message_hash;
use super::errors::bad_request_response;
use super::observability::RequestContext;

const ANSWER_CHUNK_CHARS: usize = 50;
const ANSWER_PACING_MS: u64 = 30;
const DOCUMENT_CHUNK_CHARS: usize = 200;
const DOCUMENT_PACING_MS: u64 = 20;
const HEARTBEAT_EVERY_POLLS: u32 = 5;
const EVENT_CHANNEL_CAPACITY: usize = 32;

pub(super) async fn chat_stream(
    State(state): State<AppState>,
    Extension(request_context): Extension<RequestContext>,
    Json(req): Json<ChatRequest>,
) -> Response {
    let message = req.message.trim().to_string();
    if message.is_empty() {
        return bad_request_response("Message is required");
    }
    if message.chars().count() > state.max_message_chars {
        return bad_request_response(&format!(
            "Message too long. Maximum {} characters allowed.",
            state.max_message_chars
        ));
    }

    let (tx, rx) = mpsc::channel::<String>(EVENT_CHANNEL_CAPACITY);
    tokio::spawn(run_stream(
        state,
        request_context.request_id,
        message,
        req.reset_conversation,
        StreamEmitter { tx },
    ));

    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));
    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache, no-transform"),
            (header::HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        body,
    )
        .into_response()
}

async fn run_stream(
    state: AppState,
    request_id: String,
    message: String,
    reset_conversation: bool,
    emitter: StreamEmitter,
) {
    match stream_response(&state, &request_id, &message, reset_conversation, &emitter).await {
        Ok(()) => {}
        Err(StreamAbort::ClientGone) => {
            debug!(request_id = %request_id, "client disconnected; stream abandoned");
        }
        Err(StreamAbort::Agent(err)) => {
            warn!(
                request_id = %request_id,
                error_type = err.kind(),
                "stream failed: {err}"
            );
            // Best effort: the client may already be gone. Either way the
            // channel drops right after and the stream closes.
            let _ = emitter
                .send(&StreamEvent::Error {
                    error: err.to_string(),
                    error_type: Some(err.kind().to_string()),
                })
                .await;
        }
    }
}

async fn stream_response(
    state: &AppState,
    request_id: &str,
    message: &str,
    reset_conversation: bool,
    emitter: &StreamEmitter,
) -> Result<(), StreamAbort> {
    emitter
        .send(&StreamEvent::Start {
            message: "Starting agent run".to_string(),
        })
        .await?;

    let hash = message_hash(message);
    let transcript = match state.dedup.check(&hash) {
        Some(cached) => {
            info!(request_id = %request_id, "replaying duplicate question from the dedup cache");
            cached
        }
        None => {
            let transcript =
                run_agent_with_progress(state, message, reset_conversation, emitter).await?;
            state.dedup.store(hash, transcript.clone());
            transcript
        }
    };

    log_validation(state, request_id, &transcript);

    let parsed = parse_response(&transcript);
    let answer_length = parsed.answer.chars().count();
    let document_length = parsed.full_document.chars().count();

    if !parsed.answer.is_empty() {
        stream_section(emitter, Section::Answer, &parsed.answer).await?;
    }
    if !parsed.full_document.is_empty() {
        stream_section(emitter, Section::Document, &parsed.full_document).await?;
    }

    emitter
        .send(&StreamEvent::Done {
            success: true,
            answer_length,
            document_length,
        })
        .await
}

/// Drive the run lifecycle, narrating progress: `run-created` after
/// submission, `status-update` on every status transition, a `heartbeat`
/// every fifth quiet poll to keep intermediaries from timing out the
/// connection.
async fn run_agent_with_progress(
    state: &AppState,
    message: &str,
    reset_conversation: bool,
    emitter: &StreamEmitter,
) -> Result<String, StreamAbort> {
    let prepared = state.driver.prepare(message, reset_conversation).await?;
    emitter
        .send(&StreamEvent::RunCreated {
            run_id: prepared.run_id.clone(),
            status: prepared.status.as_str().to_string(),
        })
        .await?;

    let config = state.driver.client().config();
    let mut poller = state.driver.poller(&prepared, config.max_polls_streaming);
    let interval = Duration::from_millis(config.poll_interval_ms);

    loop {
        match poller.poll(state.driver.client()).await? {
            shared::agent::PollStep::Pending {
                status,
                poll_count,
                status_changed,
            } => {
                if status_changed {
                    emitter
                        .send(&StreamEvent::StatusUpdate {
                            status: status.as_str().to_string(),
                            poll_count,
                        })
                        .await?;
                } else if poll_count % HEARTBEAT_EVERY_POLLS == 0 {
                    emitter
                        .send(&StreamEvent::Heartbeat {
                            poll_count,
                            elapsed_seconds: u64::from(poll_count)
                                * config.poll_interval_ms
                                / 1_000,
                        })
                        .await?;
                }
                sleep(interval).await;
            }
            shared::agent::PollStep::Completed { poll_count } => {
                debug!(run_id = %prepared.run_id, poll_count, "agent run completed");
                break;
            }
        }
    }

    Ok(state.driver.fetch_transcript(&prepared.thread_id).await?)
}

#[derive(Debug, Clone, Copy)]
enum Section {
    Answer,
    Document,
}

impl Section {
    fn chunk_chars(self) -> usize {
        match self {
            Self::Answer => ANSWER_CHUNK_CHARS,
            Self::Document => DOCUMENT_CHUNK_CHARS,
        }
    }

    fn pacing(self) -> Duration {
        match self {
            Self::Answer => Duration::from_millis(ANSWER_PACING_MS),
            Self::Document => Duration::from_millis(DOCUMENT_PACING_MS),
        }
    }
}

/// Re-stream one parsed section as `*-start`, paced `*-chunk`s with
/// cumulative progress, and a final `*-complete` carrying the whole text so
/// the client can resynchronize even if chunk reconstruction diverged.
async fn stream_section(
    emitter: &StreamEmitter,
    section: Section,
    text: &str,
) -> Result<(), StreamAbort> {
    let total = text.chars().count();
    let start_event = match section {
        Section::Answer => StreamEvent::AnswerStart { total_chars: total },
        Section::Document => StreamEvent::DocumentStart { total_chars: total },
    };
    emitter.send(&start_event).await?;

    let mut progress = 0;
    for chunk in char_chunks(text, section.chunk_chars()) {
        progress = (progress + section.chunk_chars()).min(total);
        let chunk_event = match section {
            Section::Answer => StreamEvent::AnswerChunk {
                chunk: chunk.to_string(),
                progress,
                total,
            },
            Section::Document => StreamEvent::DocumentChunk {
                chunk: chunk.to_string(),
                progress,
                total,
            },
        };
        emitter.send(&chunk_event).await?;
        sleep(section.pacing()).await;
    }

    let complete_event = match section {
        Section::Answer => StreamEvent::AnswerComplete {
            answer: text.to_string(),
        },
        Section::Document => StreamEvent::DocumentComplete {
            full_document: text.to_string(),
        },
    };
    emitter.send(&complete_event).await
}

/// Split on character boundaries, never bytes; the final chunk is clipped
/// to whatever remains.
fn char_chunks(text: &str, chunk_chars: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (index, _) in text.char_indices() {
        if count == chunk_chars {
            chunks.push(&text[start..index]);
            start = index;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }
    chunks
}

struct StreamEmitter {
    tx: mpsc::Sender<String>,
}

impl StreamEmitter {
    async fn send(&self, event: &StreamEvent) -> Result<(), StreamAbort> {
        self.tx
            .send(encode_stream_event(event))
            .await
            .map_err(|_| StreamAbort::ClientGone)
    }
}

#[derive(Debug)]
enum StreamAbort {
    ClientGone,
    Agent(AgentError),
}

impl From<AgentError> for StreamAbort {
    fn from(err: AgentError) -> Self {
        Self::Agent(err)
    }
}
