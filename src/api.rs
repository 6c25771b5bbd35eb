//! Operator-facing HTTP surface.
//!
//! One trigger endpoint that starts a sync run in the background and answers
//! immediately, plus a health check. Run outcomes are observable through
//! logs and the checkpoint table, not through the triggering response.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{error, info};

use crate::application::orchestrator::SyncOrchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SyncOrchestrator>,
    pub source: String,
    pub pool: SqlitePool,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/admin/sync", post(trigger_sync_handler))
        .with_state(state)
}

/// Fire-and-forget sync trigger. 202 when a run was spawned, 409 when a run
/// for this source is already in flight.
async fn trigger_sync_handler(State(state): State<AppState>) -> impl IntoResponse {
    if state.orchestrator.locks().is_running(&state.source) {
        return (
            StatusCode::CONFLICT,
            Json(ApiResponse {
                success: false,
                message: format!("sync already in progress for '{}'", state.source),
            }),
        );
    }

    let orchestrator = Arc::clone(&state.orchestrator);
    let source = state.source.clone();
    tokio::spawn(async move {
        match orchestrator.run(&source).await {
            Ok(report) => info!(
                run_id = %report.run_id,
                duration_ms = report.duration_ms(),
                "triggered sync run finished"
            ),
            Err(err) => error!(%err, "triggered sync run failed"),
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            success: true,
            message: "sync started".to_string(),
        }),
    )
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ApiResponse {
                success: true,
                message: "ok".to_string(),
            }),
        ),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse {
                success: false,
                message: format!("database ping failed: {err}"),
            }),
        ),
    }
}
