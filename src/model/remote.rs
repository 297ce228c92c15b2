use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::WorkerConfig,
    error::ServiceError,
    model::{EngineOutput, InferenceEngine, SamplingParams},
};

const MAX_ERROR_BODY_CHARS: usize = 2048;

/// Engine backed by an OpenAI-compatible `/completions` endpoint, the way
/// `vllm serve` exposes a loaded model.
pub struct RemoteEngine {
    client: Client,
    completions_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(flatten)]
    params: &'a SamplingParams,
}

#[derive(Deserialize)]
struct CompletionResponse {
    id: String,
    choices: Vec<CompletionChoice>,
    usage: CompletionUsage,
}

#[derive(Deserialize)]
struct CompletionChoice {
    text: String,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CompletionUsage {
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

impl RemoteEngine {
    pub fn new(config: &WorkerConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .connect_timeout(config.engine_connect_timeout)
            .build()?;

        Ok(Self {
            client,
            completions_url: format!("{}/completions", config.engine_url),
            model: config.model_name.clone(),
            api_key: config.engine_api_key.clone(),
        })
    }

    async fn complete(
        &self,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<EngineOutput, ServiceError> {
        let body = CompletionRequest {
            model: &self.model,
            prompt,
            params,
        };

        let mut request = self.client.post(&self.completions_url).json(&body);
        if let Some(key) = self.api_key.as_deref() {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ServiceError::Upstream {
                status: status.as_u16(),
                message: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let completion: CompletionResponse = response.json().await?;
        let choice = completion.choices.into_iter().next().ok_or_else(|| {
            ServiceError::Inference("engine returned no completion choices".into())
        })?;
        debug!(id = %completion.id, finish_reason = ?choice.finish_reason, "completion received");

        Ok(EngineOutput {
            request_id: completion.id,
            text: choice.text,
            prompt_tokens: completion.usage.prompt_tokens,
            completion_tokens: completion.usage.completion_tokens,
            finish_reason: choice.finish_reason,
        })
    }
}

#[async_trait]
impl InferenceEngine for RemoteEngine {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn generate(
        &self,
        prompts: &[String],
        params: &SamplingParams,
    ) -> Result<Vec<EngineOutput>, ServiceError> {
        let mut outputs = Vec::with_capacity(prompts.len());
        for prompt in prompts {
            outputs.push(self.complete(prompt, params).await?);
        }
        Ok(outputs)
    }
}
