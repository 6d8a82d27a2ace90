use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use shared::models::ResetResponse;
use tracing::info;

use super::AppState;

/// Clear the process-wide agent session. In stateless mode there is nothing
/// to clear and the call still succeeds.
pub(super) async fn reset_conversation(State(state): State<AppState>) -> impl IntoResponse {
    state.driver.reset_session();
    info!("conversation session cleared");

    (
        StatusCode::OK,
        Json(ResetResponse {
            success: true,
            message: "Conversation reset".to_string(),
        }),
    )
}
