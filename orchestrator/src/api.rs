use crate::catalog::Definition;
use crate::error::OrchestratorError;
use crate::history::HistoryFilter;
use crate::types::{DefinitionId, Run, RunId};
use std::time::Duration;

/// Command to start one scenario or experiment run.
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub definition_id: DefinitionId,
    pub parameters: serde_json::Map<String, serde_json::Value>,
    pub dry_run: bool,
    pub override_safety: bool,
}

impl StartRequest {
    pub fn new(definition_id: impl Into<DefinitionId>) -> Self {
        Self {
            definition_id: definition_id.into(),
            parameters: serde_json::Map::new(),
            dry_run: false,
            override_safety: false,
        }
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn override_safety(mut self) -> Self {
        self.override_safety = true;
        self
    }

    pub fn parameter(mut self, name: &str, value: serde_json::Value) -> Self {
        self.parameters.insert(name.to_string(), value);
        self
    }
}

/// Run lifecycle operations.
///
/// `start_run` returns as soon as the run is accepted; completion is
/// observed separately (`get_status`, `wait_for_completion`). A step
/// failure is run state, never an error from this surface.
#[async_trait::async_trait]
pub trait RunControl {
    fn start_run(&self, request: StartRequest) -> Result<Run, OrchestratorError>;

    /// Request cancellation. The in-flight step finishes; no further steps
    /// dispatch. Stopping an already-terminal run returns it unchanged.
    fn stop_run(&self, run_id: RunId) -> Result<Run, OrchestratorError>;

    fn get_status(&self, run_id: RunId) -> Result<Run, OrchestratorError>;

    /// Active runs in creation order.
    fn list_active(&self) -> Vec<Run>;

    async fn wait_for_completion(
        &self,
        run_id: RunId,
        timeout: Duration,
    ) -> Result<Run, OrchestratorError>;
}

pub trait CatalogAccess {
    fn definition(&self, id: &DefinitionId) -> Option<Definition>;
    fn list_definitions(&self) -> Vec<Definition>;
}

pub trait HistoryAccess {
    fn query_history(&self, filter: &HistoryFilter) -> Vec<Run>;
}
