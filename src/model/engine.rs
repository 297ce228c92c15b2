use async_trait::async_trait;

use crate::{
    error::ServiceError,
    model::{EngineOutput, SamplingParams},
};

/// A text-generation backend the worker forwards rendered prompts to.
///
/// Implementations return exactly one output per prompt, in prompt order.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Short backend name reported on the health endpoint.
    fn name(&self) -> &'static str;

    async fn generate(
        &self,
        prompts: &[String],
        params: &SamplingParams,
    ) -> Result<Vec<EngineOutput>, ServiceError>;
}
