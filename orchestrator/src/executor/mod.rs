//! Step executors.
//!
//! A step executor turns an abstract step identifier into an executed action.
//! The registry is pluggable: production deployments register real executors
//! per step id, tests and dry runs swap in the no-op and simulated variants.
//! Executors must not assume any ordering beyond "invoked in catalog-declared
//! order for this run".

use crate::types::{DefinitionId, ParamValue, RunId, StepId, StepStatus};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Result of a single step execution. Failure is data, not an error: the
/// drive loop turns it into run state.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub status: StepStatus,
    pub duration_ms: u64,
    pub detail: Option<String>,
}

impl StepOutcome {
    pub fn success(duration_ms: u64) -> Self {
        Self {
            status: StepStatus::Success,
            duration_ms,
            detail: None,
        }
    }

    pub fn failure(duration_ms: u64, detail: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Failure,
            duration_ms,
            detail: Some(detail.into()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == StepStatus::Success
    }
}

/// Per-run context handed to each step execution.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub run_id: RunId,
    pub definition_id: DefinitionId,
    pub parameters: BTreeMap<String, ParamValue>,
    pub dry_run: bool,
}

#[async_trait::async_trait]
pub trait StepExecutor: Send + Sync {
    async fn execute(&self, step_id: &StepId, ctx: &StepContext) -> StepOutcome;
}

/// Maps step ids to executors, with a fallback for unregistered steps.
#[derive(Clone)]
pub struct ExecutorRegistry {
    executors: HashMap<StepId, Arc<dyn StepExecutor>>,
    fallback: Arc<dyn StepExecutor>,
}

impl ExecutorRegistry {
    pub fn new(fallback: Arc<dyn StepExecutor>) -> Self {
        Self {
            executors: HashMap::new(),
            fallback,
        }
    }

    pub fn register(&mut self, step_id: impl Into<StepId>, executor: Arc<dyn StepExecutor>) {
        self.executors.insert(step_id.into(), executor);
    }

    pub fn resolve(&self, step_id: &StepId) -> Arc<dyn StepExecutor> {
        self.executors
            .get(step_id)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::new(Arc::new(NoopExecutor))
    }
}

/// Acknowledges every step immediately with zero duration. Used for every
/// dry run, regardless of what the registry holds.
pub struct NoopExecutor;

#[async_trait::async_trait]
impl StepExecutor for NoopExecutor {
    async fn execute(&self, _step_id: &StepId, _ctx: &StepContext) -> StepOutcome {
        StepOutcome::success(0)
    }
}

/// Deterministic executor for demos and tests: a fixed delay per step and an
/// explicit set of steps that fail.
pub struct SimExecutor {
    step_delay: Duration,
    failures: HashSet<StepId>,
}

impl SimExecutor {
    pub fn new(step_delay: Duration) -> Self {
        Self {
            step_delay,
            failures: HashSet::new(),
        }
    }

    pub fn fail_on(mut self, step_id: impl Into<StepId>) -> Self {
        self.failures.insert(step_id.into());
        self
    }
}

#[async_trait::async_trait]
impl StepExecutor for SimExecutor {
    async fn execute(&self, step_id: &StepId, _ctx: &StepContext) -> StepOutcome {
        sleep(self.step_delay).await;
        let duration_ms = self.step_delay.as_millis() as u64;
        if self.failures.contains(step_id) {
            StepOutcome::failure(duration_ms, format!("injected failure at {step_id}"))
        } else {
            StepOutcome::success(duration_ms)
        }
    }
}
