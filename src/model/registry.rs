use std::sync::Arc;

use async_trait::async_trait;
use tokio::task;

use crate::{
    config::WorkerConfig,
    error::ServiceError,
    model::{EngineOutput, InferenceEngine, SamplingParams, loader::TorchModel},
};

/// In-process engine: runs a [`TorchModel`] on the blocking thread pool.
pub struct TorchEngine {
    model: Arc<TorchModel>,
}

impl TorchEngine {
    pub fn initialize(config: &WorkerConfig) -> Result<Self, ServiceError> {
        let model = TorchModel::load(config)?;
        Ok(Self {
            model: Arc::new(model),
        })
    }
}

#[async_trait]
impl InferenceEngine for TorchEngine {
    fn name(&self) -> &'static str {
        "torch"
    }

    async fn generate(
        &self,
        prompts: &[String],
        params: &SamplingParams,
    ) -> Result<Vec<EngineOutput>, ServiceError> {
        let model = self.model.clone();
        let prompts = prompts.to_vec();
        let params = params.clone();

        task::spawn_blocking(move || {
            prompts
                .iter()
                .map(|prompt| model.generate(prompt, &params))
                .collect()
        })
        .await
        .map_err(|err| ServiceError::Inference(format!("inference task failed: {err}")))?
    }
}
