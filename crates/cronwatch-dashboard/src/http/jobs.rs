use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::app::DashboardState;

/// GET /api/jobs: snapshot of every registered job.
///
/// Answers 503 while the backing controller is not initialized.
pub async fn jobs_handler(State(state): State<Arc<DashboardState>>) -> Response {
    match state.source.entries() {
        Some(entries) => Json(entries).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": "controller is not initialized",
                "code": "UNINITIALIZED_CONTROLLER",
            })),
        )
            .into_response(),
    }
}
