use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::DashboardState;

/// GET /health: liveness check.
pub async fn health_handler(State(state): State<Arc<DashboardState>>) -> Json<Value> {
    let entries = state.source.entries();
    Json(json!({
        "status": if entries.is_some() { "ok" } else { "uninitialized" },
        "version": env!("CARGO_PKG_VERSION"),
        "jobs": entries.map_or(0, |e| e.len()),
    }))
}
