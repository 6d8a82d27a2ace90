use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use shared::agent::AgentError;
use shared::models::ErrorResponse;

pub(super) fn bad_request_response(error: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.to_string(),
            details: None,
            hint: None,
        }),
    )
        .into_response()
}

pub(super) fn too_many_requests_response(retry_after_seconds: u64) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(ErrorResponse {
            error: "Too many requests".to_string(),
            details: Some("Rate limit exceeded; retry later".to_string()),
            hint: None,
        }),
    )
        .into_response();

    if let Ok(retry_after_value) = HeaderValue::from_str(&retry_after_seconds.to_string()) {
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, retry_after_value);
    }

    response
}

/// Map the agent failure taxonomy onto HTTP statuses: timeouts get 504,
/// everything else the agent did to us is a 502.
pub(super) fn agent_error_response(err: &AgentError) -> Response {
    let (status, error, details, hint) = match err {
        AgentError::Auth { .. } => (
            StatusCode::BAD_GATEWAY,
            "Authentication failed",
            Some("Agent credentials are invalid or expired".to_string()),
            Some("Check the agent credential and endpoint configuration".to_string()),
        ),
        AgentError::Network(detail) => (
            StatusCode::BAD_GATEWAY,
            "Agent connection failed",
            Some(detail.clone()),
            Some("The agent endpoint may be unreachable due to network restrictions".to_string()),
        ),
        AgentError::InvalidPayload(detail) => (
            StatusCode::BAD_GATEWAY,
            "Invalid response from agent",
            Some(detail.clone()),
            None,
        ),
        AgentError::RunFailed { detail } => (
            StatusCode::BAD_GATEWAY,
            "Agent run failed",
            Some(detail.clone()),
            None,
        ),
        AgentError::RunTimeout { polls } => (
            StatusCode::GATEWAY_TIMEOUT,
            "Agent run timed out",
            Some(format!(
                "The agent took too long to respond ({polls} polls). Please try again."
            )),
            None,
        ),
        AgentError::NoResponse => (
            StatusCode::BAD_GATEWAY,
            "No response from agent",
            None,
            None,
        ),
    };

    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            details,
            hint,
        }),
    )
        .into_response()
}
