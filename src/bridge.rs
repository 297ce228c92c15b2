use std::{path::PathBuf, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::{
    agent::{Agent, AgentSlot},
    error::ServiceError,
    workspace,
};

const EMPTY_RESULT: &str = "Task completed";

#[derive(Clone)]
pub struct BridgeState {
    pub agent: AgentSlot,
    pub workspace_dir: Arc<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskRequest {
    pub task: String,
    #[serde(default = "default_task_type")]
    pub task_type: String,
    #[serde(default)]
    pub context: serde_json::Map<String, serde_json::Value>,
}

fn default_task_type() -> String {
    "general".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub success: bool,
    pub result: Option<String>,
    pub error: Option<String>,
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

impl TaskResponse {
    fn completed(result: String, files: Vec<PathBuf>) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
            files,
        }
    }

    fn failed(err: ServiceError) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(err.to_string()),
            files: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub success: bool,
    pub response: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    agent_ready: bool,
}

pub fn build_bridge_router(agent: AgentSlot, workspace_dir: PathBuf) -> Router {
    let state = BridgeState {
        agent,
        workspace_dir: Arc::new(workspace_dir),
    };

    Router::new()
        .route("/health", get(health))
        .route("/execute", post(execute))
        .route("/chat", post(chat))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health(State(state): State<BridgeState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        agent_ready: state.agent.is_ready(),
    })
}

/// Agent failures come back as `success: false` with HTTP 200; only a
/// missing agent is an HTTP fault.
async fn execute(
    State(state): State<BridgeState>,
    Json(request): Json<TaskRequest>,
) -> Result<Json<TaskResponse>, ServiceError> {
    let agent = state.agent.get()?;
    info!(
        task_type = %request.task_type,
        context_keys = request.context.len(),
        "executing task"
    );

    let response = match run_and_collect(&*agent, &request.task, &state.workspace_dir).await
    {
        Ok((result, files)) => TaskResponse::completed(result, files),
        Err(err) => {
            warn!(error = %err, "task failed");
            TaskResponse::failed(err)
        }
    };
    Ok(Json(response))
}

async fn run_and_collect(
    agent: &dyn Agent,
    task: &str,
    workspace_dir: &std::path::Path,
) -> Result<(String, Vec<PathBuf>), ServiceError> {
    let result = agent
        .run(task)
        .await?
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| EMPTY_RESULT.to_string());
    let files = workspace::list_files(workspace_dir).await?;
    Ok((result, files))
}

/// Same agent call as `/execute`, without the file listing. Agent failures
/// surface as HTTP 500.
async fn chat(
    State(state): State<BridgeState>,
    Json(request): Json<TaskRequest>,
) -> Result<Json<ChatReply>, ServiceError> {
    let agent = state.agent.get()?;
    info!(task_type = %request.task_type, "chat task");

    let response = agent.run(&request.task).await.map_err(|err| {
        warn!(error = %err, "chat task failed");
        match err {
            ServiceError::Agent(_) => err,
            other => ServiceError::Agent(other.to_string()),
        }
    })?;

    Ok(Json(ChatReply {
        success: true,
        response: response.unwrap_or_default(),
    }))
}
