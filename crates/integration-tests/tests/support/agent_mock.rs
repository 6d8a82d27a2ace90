#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};

/// How a scripted run behaves when the api server polls it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentBehavior {
    /// `in_progress` until the configured poll, then `completed`.
    Complete,
    /// Terminal `failed` with a last-error payload on the first poll.
    FailRun,
    /// `in_progress` forever; the caller's poll ceiling must fire.
    NeverComplete,
    /// Every request is rejected with 401.
    RejectCredential,
}

pub struct MockAgentState {
    behavior: AgentBehavior,
    transcript: String,
    polls_until_complete: u32,
    pub threads_created: AtomicU32,
    pub polls: AtomicU32,
    pub requests: AtomicU32,
    pub posted_messages: Mutex<Vec<String>>,
}

pub struct MockAgentServer {
    pub base_url: String,
    pub state: Arc<MockAgentState>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockAgentServer {
    pub async fn start(
        behavior: AgentBehavior,
        transcript: &str,
        polls_until_complete: u32,
    ) -> Self {
        let state = Arc::new(MockAgentState {
            behavior,
            transcript: transcript.to_string(),
            polls_until_complete,
            threads_created: AtomicU32::new(0),
            polls: AtomicU32::new(0),
            requests: AtomicU32::new(0),
            posted_messages: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/threads", post(create_thread))
            .route(
                "/threads/{thread_id}/messages",
                post(post_message).get(list_messages),
            )
            .route("/threads/{thread_id}/runs", post(create_run))
            .route(
                "/threads/{thread_id}/runs/{run_id}",
                axum::routing::get(get_run),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("mock agent listener should bind");
        let bind_addr = listener
            .local_addr()
            .expect("mock agent listener local address should exist");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("mock agent server should run");
        });

        Self {
            base_url: format!("http://{bind_addr}"),
            state,
            handle,
        }
    }

    pub fn threads_created(&self) -> u32 {
        self.state.threads_created.load(Ordering::SeqCst)
    }

    pub fn requests_received(&self) -> u32 {
        self.state.requests.load(Ordering::SeqCst)
    }

    pub fn posted_messages(&self) -> Vec<String> {
        self.state
            .posted_messages
            .lock()
            .expect("mock message mutex should not be poisoned")
            .clone()
    }
}

impl Drop for MockAgentServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn count_request(state: &MockAgentState) -> Option<Response> {
    state.requests.fetch_add(1, Ordering::SeqCst);
    if state.behavior == AgentBehavior::RejectCredential {
        return Some(
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": { "code": "invalid_api_key" } })),
            )
                .into_response(),
        );
    }
    None
}

async fn create_thread(State(state): State<Arc<MockAgentState>>) -> Response {
    if let Some(rejection) = count_request(&state) {
        return rejection;
    }
    let index = state.threads_created.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({ "id": format!("thread_{index}") })).into_response()
}

async fn post_message(
    State(state): State<Arc<MockAgentState>>,
    Path(_thread_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Some(rejection) = count_request(&state) {
        return rejection;
    }
    if let Some(content) = body.get("content").and_then(Value::as_str) {
        state
            .posted_messages
            .lock()
            .expect("mock message mutex should not be poisoned")
            .push(content.to_string());
    }
    Json(json!({ "id": "msg_1" })).into_response()
}

async fn create_run(
    State(state): State<Arc<MockAgentState>>,
    Path(_thread_id): Path<String>,
    Json(_body): Json<Value>,
) -> Response {
    if let Some(rejection) = count_request(&state) {
        return rejection;
    }
    Json(json!({ "id": "run_1", "status": "queued" })).into_response()
}

async fn get_run(
    State(state): State<Arc<MockAgentState>>,
    Path((_thread_id, run_id)): Path<(String, String)>,
) -> Response {
    if let Some(rejection) = count_request(&state) {
        return rejection;
    }
    let poll = state.polls.fetch_add(1, Ordering::SeqCst) + 1;

    let body = match state.behavior {
        AgentBehavior::FailRun => json!({
            "id": run_id,
            "status": "failed",
            "last_error": { "code": "server_error", "message": "vector store unavailable" },
        }),
        AgentBehavior::NeverComplete => json!({ "id": run_id, "status": "in_progress" }),
        _ => {
            if poll >= state.polls_until_complete {
                json!({ "id": run_id, "status": "completed" })
            } else {
                json!({ "id": run_id, "status": "in_progress" })
            }
        }
    };
    Json(body).into_response()
}

async fn list_messages(
    State(state): State<Arc<MockAgentState>>,
    Path(_thread_id): Path<String>,
) -> Response {
    if let Some(rejection) = count_request(&state) {
        return rejection;
    }
    // Ascending order: the user message precedes the assistant reply, and
    // the api server must skip past it.
    Json(json!({
        "data": [
            {
                "role": "user",
                "content": [ { "type": "text", "text": { "value": "original question" } } ],
            },
            {
                "role": "assistant",
                "content": [ { "type": "text", "text": { "value": state.transcript } } ],
            },
        ]
    }))
    .into_response()
}
