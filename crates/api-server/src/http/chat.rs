use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::models::{ChatRequest, ChatResponse};
use shared::policy::{post_process_response, validate_response};
use tracing::{debug, info, warn};

use super::AppState;
use super::dedup::message_hash;
use super::errors::{agent_error_response, bad_request_response};
use super::observability::RequestContext;

/// Blocking chat endpoint: the full agent round-trip happens inside this
/// handler and the cleaned transcript is returned as one JSON body.
pub(super) async fn chat(
    State(state): State<AppState>,
    Extension(request_context): Extension<RequestContext>,
    Json(req): Json<ChatRequest>,
) -> Response {
    let message = req.message.trim();
    if message.is_empty() {
        return bad_request_response("Message is required");
    }
    if message.chars().count() > state.max_message_chars {
        return bad_request_response(&format!(
            "Message too long. Maximum {} characters allowed.",
            state.max_message_chars
        ));
    }

    let hash = message_hash(message);
    if let Some(transcript) = state.dedup.check(&hash) {
        info!(
            request_id = %request_context.request_id,
            "serving duplicate question from the dedup cache"
        );
        return chat_response(&transcript);
    }

    let transcript = match state
        .driver
        .submit_question(message, req.reset_conversation)
        .await
    {
        Ok(transcript) => transcript,
        Err(err) => {
            warn!(
                request_id = %request_context.request_id,
                error_type = err.kind(),
                "chat request failed: {err}"
            );
            return agent_error_response(&err);
        }
    };

    log_validation(&state, &request_context.request_id, &transcript);
    state.dedup.store(hash, transcript.clone());

    chat_response(&transcript)
}

fn chat_response(transcript: &str) -> Response {
    let response = post_process_response(transcript);
    (StatusCode::OK, Json(ChatResponse { response })).into_response()
}

/// Advisory only: a suspicious transcript is logged and still delivered.
pub(super) fn log_validation(state: &AppState, request_id: &str, transcript: &str) {
    let report = validate_response(
        transcript,
        state.driver.client().config().max_response_chars,
        true,
    );
    if report.is_valid {
        debug!(
            request_id = %request_id,
            citation_count = report.citation_count,
            "transcript passed retrieval validation"
        );
    } else {
        warn!(
            request_id = %request_id,
            citation_count = report.citation_count,
            has_answer = report.has_answer,
            has_document = report.has_document,
            warnings = ?report.warnings,
            "transcript failed retrieval validation"
        );
    }
}
