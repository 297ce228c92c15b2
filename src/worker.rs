use std::{path::PathBuf, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::handler::{JobHandler, JobOutput};

#[derive(Clone)]
pub struct WorkerState {
    pub handler: Arc<JobHandler>,
    pub model_path: PathBuf,
}

const PLATFORM: &str = "Notus Universe - Sovereign AI";
const JURISDICTION: &str = "Iceland";
const COMPLIANCE: [&str; 3] = ["GDPR", "EU AI Act", "Iceland AI Action Plan 2025-2027"];

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    model: String,
    model_path: PathBuf,
    engine: &'static str,
    platform: &'static str,
    jurisdiction: &'static str,
    compliance: [&'static str; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Completed,
    Failed,
}

#[derive(Serialize)]
pub struct JobEnvelope {
    pub id: String,
    pub status: JobStatus,
    pub output: JobOutput,
}

pub fn build_worker_router(handler: Arc<JobHandler>, model_path: PathBuf) -> Router {
    let state = WorkerState {
        handler,
        model_path,
    };

    Router::new()
        .route("/health", get(health))
        .route("/runsync", post(run_sync))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health(State(state): State<WorkerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        model: state.handler.model_name().to_string(),
        model_path: state.model_path.clone(),
        engine: state.handler.engine_name(),
        platform: PLATFORM,
        jurisdiction: JURISDICTION,
        compliance: COMPLIANCE,
    })
}

/// Runs one job to completion. Job-level failures are reported inside the
/// envelope, so the HTTP status stays 200.
async fn run_sync(
    State(state): State<WorkerState>,
    Json(job): Json<serde_json::Value>,
) -> Json<JobEnvelope> {
    let id = Uuid::new_v4().to_string();
    info!(job_id = %id, "job received");

    let output = state.handler.handle_value(job).await;
    let status = if output.is_failure() {
        JobStatus::Failed
    } else {
        JobStatus::Completed
    };

    Json(JobEnvelope { id, status, output })
}
