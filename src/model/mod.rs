mod engine;
mod prompt;
mod remote;
pub mod sampler;
mod types;

#[cfg(feature = "tch-backend")]
mod loader;
#[cfg(feature = "tch-backend")]
mod registry;

use std::sync::Arc;

use crate::{
    config::{EngineKind, WorkerConfig},
    error::ServiceError,
};

pub use engine::InferenceEngine;
#[cfg(feature = "tch-backend")]
pub use loader::TorchModel;
pub use prompt::{ASSISTANT_OPEN, END_OF_TURN, render_prompt};
#[cfg(feature = "tch-backend")]
pub use registry::TorchEngine;
pub use remote::RemoteEngine;
pub use types::{
    ChatMessage, ChatResponse, Choice, EngineOutput, Job, JobInput, Role, SamplingParams, Usage,
};

/// Builds the engine selected by the worker configuration.
pub fn build_engine(config: &WorkerConfig) -> Result<Arc<dyn InferenceEngine>, ServiceError> {
    match config.engine {
        EngineKind::Remote => Ok(Arc::new(RemoteEngine::new(config)?)),
        #[cfg(feature = "tch-backend")]
        EngineKind::Torch => Ok(Arc::new(TorchEngine::initialize(config)?)),
        #[cfg(not(feature = "tch-backend"))]
        EngineKind::Torch => Err(ServiceError::NotInitialized(
            "torch engine (built without the tch-backend feature)",
        )),
    }
}
