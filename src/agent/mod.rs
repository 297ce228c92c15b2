mod cli;

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;

use crate::error::ServiceError;

pub use cli::CliAgent;

/// An external agent that carries out free-form tasks.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Runs one task to completion. `None` means the agent produced no output.
    async fn run(&self, task: &str) -> Result<Option<String>, ServiceError>;
}

/// Write-once holder for the process-wide agent handle.
///
/// Routes hold a clone from the moment the server starts; the handle is
/// installed once initialization finishes and is never replaced.
#[derive(Clone, Default)]
pub struct AgentSlot {
    inner: Arc<OnceCell<Arc<dyn Agent>>>,
}

impl AgentSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ready(agent: Arc<dyn Agent>) -> Self {
        let slot = Self::new();
        slot.install(agent);
        slot
    }

    /// Returns false if an agent was already installed.
    pub fn install(&self, agent: Arc<dyn Agent>) -> bool {
        self.inner.set(agent).is_ok()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.get().is_some()
    }

    pub fn get(&self) -> Result<Arc<dyn Agent>, ServiceError> {
        self.inner
            .get()
            .cloned()
            .ok_or(ServiceError::NotInitialized("agent"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Agent for Echo {
        async fn run(&self, task: &str) -> Result<Option<String>, ServiceError> {
            Ok(Some(task.to_string()))
        }
    }

    #[test]
    fn empty_slot_reports_not_initialized() {
        let slot = AgentSlot::new();
        assert!(!slot.is_ready());
        assert!(matches!(slot.get(), Err(ServiceError::NotInitialized("agent"))));
    }

    #[test]
    fn slot_is_write_once_and_shared() {
        let slot = AgentSlot::new();
        let clone = slot.clone();
        assert!(slot.install(Arc::new(Echo)));
        assert!(!slot.install(Arc::new(Echo)));
        assert!(clone.is_ready());
    }
}
