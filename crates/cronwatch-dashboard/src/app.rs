use std::sync::Arc;

use axum::{routing::get, Router};
use cronwatch_core::{CronwatchError, EntrySource, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Shared state handed to every dashboard handler.
pub struct DashboardState {
    pub source: Arc<dyn EntrySource>,
}

impl DashboardState {
    pub fn new(source: Arc<dyn EntrySource>) -> Self {
        Self { source }
    }
}

/// Assemble the dashboard router.
pub fn build_router(source: Arc<dyn EntrySource>) -> Router {
    let state = Arc::new(DashboardState::new(source));
    Router::new()
        .route("/", get(crate::http::ui::ui_handler))
        .route("/api/jobs", get(crate::http::jobs::jobs_handler))
        .route("/health", get(crate::http::health::health_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Bind `addr` and serve the dashboard until `shutdown` is cancelled.
pub async fn serve(
    addr: &str,
    source: Arc<dyn EntrySource>,
    shutdown: CancellationToken,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| CronwatchError::Dashboard(format!("bind {addr}: {e}")))?;
    let local = listener.local_addr()?;
    info!(addr = %local, "dashboard listening");

    axum::serve(listener, build_router(source))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!(addr = %local, "dashboard stopped");
    Ok(())
}
