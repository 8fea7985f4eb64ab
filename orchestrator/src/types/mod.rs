use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Milliseconds since the Unix epoch, as produced by a [`crate::clock::Clock`].
pub type Timestamp = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Catalog key for a scenario or experiment, e.g. `database_failover`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DefinitionId(pub String);

impl From<&str> for DefinitionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for DefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Abstract identifier for one recovery/chaos step, e.g. `promote-read-replica`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepId(pub String);

impl From<&str> for StepId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    TimedOut,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Failed | RunState::Cancelled | RunState::TimedOut
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Database,
    Region,
    Compute,
    Cache,
    Network,
    Data,
    Dns,
    Traffic,
    Application,
    Resource,
    Dependency,
}

/// A resolved parameter value after defaults and constraints have been applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Success,
    Failure,
}

/// Record of one executed step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step_id: StepId,
    pub status: StepStatus,
    pub duration_ms: u64,
    pub detail: Option<String>,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
}

/// Outcome of the step that ended a `Failed` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepFailure {
    pub step_id: StepId,
    pub detail: Option<String>,
    pub at: Timestamp,
}

/// Durations measured for a completed run. All remain unset unless the run
/// reached `Completed`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunMetrics {
    pub detection_time_ms: Option<u64>,
    pub failover_time_ms: Option<u64>,
    pub recovery_time_ms: Option<u64>,
}

/// One execution instance of a scenario or experiment.
///
/// Invariant: `steps_completed.len() + steps_remaining.len()` equals the
/// definition's step count at every observable point. `completed_at` is set
/// if and only if `state` is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: RunId,
    pub definition_id: DefinitionId,
    pub effective_parameters: BTreeMap<String, ParamValue>,
    pub state: RunState,
    pub dry_run: bool,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub steps_completed: Vec<StepRecord>,
    pub steps_remaining: Vec<StepId>,
    pub failure: Option<StepFailure>,
    pub metrics: RunMetrics,
}

impl Run {
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Steps that will never execute because the run ended early.
    ///
    /// On `Failed` the head of `steps_remaining` is the step that failed
    /// (recorded in `failure`), so only the tail counts as skipped.
    pub fn skipped_steps(&self) -> &[StepId] {
        if !self.state.is_terminal() {
            return &[];
        }
        if self.failure.is_some() && !self.steps_remaining.is_empty() {
            &self.steps_remaining[1..]
        } else {
            &self.steps_remaining
        }
    }
}
