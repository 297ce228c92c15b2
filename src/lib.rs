pub mod agent;
pub mod bridge;
pub mod config;
pub mod error;
pub mod handler;
pub mod model;
pub mod telemetry;
pub mod worker;
pub mod workspace;

pub use agent::{Agent, AgentSlot, CliAgent};
pub use bridge::{ChatReply, TaskRequest, TaskResponse, build_bridge_router};
pub use config::{BridgeConfig, EngineKind, WorkerConfig};
pub use error::ServiceError;
pub use handler::{JobFailure, JobHandler, JobOutput};
pub use model::{ChatMessage, ChatResponse, InferenceEngine, Role, SamplingParams, build_engine};
pub use worker::build_worker_router;
