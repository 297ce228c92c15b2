use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

pub const NO_MESSAGES: &str = "No messages provided in request";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("No messages provided in request")]
    NoMessages,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0} not initialized")]
    NotInitialized(&'static str),
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
    #[error("model execution failed: {0}")]
    Inference(String),
    #[error("engine returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("engine request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{0}")]
    Agent(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// Stable name reported as `error_type` in job failure bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::NoMessages => "NoMessages",
            ServiceError::InvalidInput(_) => "InvalidInput",
            ServiceError::NotInitialized(_) => "NotInitialized",
            ServiceError::Tokenizer(_) => "TokenizerError",
            ServiceError::Inference(_) => "InferenceError",
            ServiceError::Upstream { .. } => "UpstreamError",
            ServiceError::Request(_) => "RequestError",
            ServiceError::Agent(_) => "AgentError",
            ServiceError::Io(_) => "IoError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::NotInitialized(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::NoMessages | ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::Tokenizer(_)
            | ServiceError::Inference(_)
            | ServiceError::Upstream { .. }
            | ServiceError::Request(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Agent(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "error": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_messages_renders_exact_text() {
        assert_eq!(ServiceError::NoMessages.to_string(), NO_MESSAGES);
    }

    #[test]
    fn uninitialized_dependency_is_unavailable() {
        let err = ServiceError::NotInitialized("agent");
        assert_eq!(err.to_string(), "agent not initialized");
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn agent_failures_are_server_faults() {
        let err = ServiceError::Agent("boom".into());
        assert_eq!(err.kind(), "AgentError");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
