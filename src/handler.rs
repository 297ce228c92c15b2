use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    error::ServiceError,
    model::{ChatResponse, InferenceEngine, Job, JobInput, render_prompt},
};

/// Result of one serverless job: a chat completion or an error object.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum JobOutput {
    Completion(ChatResponse),
    Failure(JobFailure),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobFailure {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl JobOutput {
    pub fn is_failure(&self) -> bool {
        matches!(self, JobOutput::Failure(_))
    }
}

impl From<ServiceError> for JobFailure {
    fn from(err: ServiceError) -> Self {
        // a missing conversation is a validation message, not a fault
        let error_type = match err {
            ServiceError::NoMessages => None,
            ref other => Some(other.kind().to_string()),
        };
        JobFailure {
            error: err.to_string(),
            error_type,
        }
    }
}

/// Turns chat jobs into prompts, runs them through the engine and wraps the
/// result in the chat-completion envelope.
pub struct JobHandler {
    engine: Arc<dyn InferenceEngine>,
    model_name: String,
}

impl JobHandler {
    pub fn new(engine: Arc<dyn InferenceEngine>, model_name: impl Into<String>) -> Self {
        Self {
            engine,
            model_name: model_name.into(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Entry point for raw job payloads.
    pub async fn handle_value(&self, job: serde_json::Value) -> JobOutput {
        match serde_json::from_value::<Job>(job) {
            Ok(job) => self.handle(job).await,
            Err(err) => {
                warn!(error = %err, "rejecting malformed job");
                JobOutput::Failure(ServiceError::InvalidInput(err.to_string()).into())
            }
        }
    }

    pub async fn handle(&self, job: Job) -> JobOutput {
        match self.complete(job.input).await {
            Ok(response) => JobOutput::Completion(response),
            Err(err) => {
                warn!(error = %err, kind = err.kind(), "job failed");
                JobOutput::Failure(err.into())
            }
        }
    }

    pub async fn complete(&self, input: JobInput) -> Result<ChatResponse, ServiceError> {
        if input.messages.is_empty() {
            return Err(ServiceError::NoMessages);
        }

        let prompt = render_prompt(&input.messages);
        let params = input.sampling_params();
        info!(
            messages = input.messages.len(),
            prompt_chars = prompt.len(),
            max_tokens = params.max_tokens,
            "generating completion"
        );

        let output = self
            .engine
            .generate(&[prompt], &params)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::Inference("engine returned no outputs".into()))?;

        if output.finish_reason.as_deref().is_some_and(|reason| reason != "stop") {
            debug!(
                finish_reason = ?output.finish_reason,
                "engine finish reason reported as stop"
            );
        }

        Ok(ChatResponse::from_output(output, &self.model_name))
    }
}
