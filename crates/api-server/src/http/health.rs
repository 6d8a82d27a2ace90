use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use shared::models::HealthResponse;

pub(super) async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            message: "Policy chat backend is running".to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }),
    )
}
