use crate::types::{DefinitionId, RunId, RunState};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Errors detected synchronously at the command surface.
///
/// Step-execution failures are not represented here: they are captured in the
/// run's own state (`Failed`) because the start request that produced the run
/// already succeeded.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OrchestratorError {
    #[error("unknown definition: {0}")]
    UnknownDefinition(DefinitionId),

    #[error("unknown run: {0}")]
    UnknownRun(RunId),

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("experiment `{0}` is not safe to run without an explicit safety override")]
    SafetyBlocked(DefinitionId),

    #[error("chaos experiments are disabled in this orchestrator's configuration")]
    ChaosDisabled,

    #[error("definition `{0}` already has an active run")]
    Conflict(DefinitionId),

    #[error("run {0} did not reach a terminal state within {1:?}")]
    WaitTimeout(RunId, Duration),
}

impl OrchestratorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrchestratorError::UnknownDefinition(_) | OrchestratorError::UnknownRun(_) => {
                ErrorKind::NotFound
            }
            OrchestratorError::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            OrchestratorError::SafetyBlocked(_) => ErrorKind::SafetyBlocked,
            OrchestratorError::ChaosDisabled => ErrorKind::ChaosDisabled,
            OrchestratorError::Conflict(_) => ErrorKind::Conflict,
            OrchestratorError::WaitTimeout(_, _) => ErrorKind::Timeout,
        }
    }
}

/// Wire-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    InvalidParameter,
    SafetyBlocked,
    ChaosDisabled,
    Conflict,
    Timeout,
}

/// The `{kind, message}` pair returned across the command surface. No
/// internal error type leaks past this.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("{kind:?}: {message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<OrchestratorError> for ApiError {
    fn from(value: OrchestratorError) -> Self {
        ApiError {
            kind: value.kind(),
            message: value.to_string(),
        }
    }
}

/// A run-state transition outside the machine in `crate::state_machine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal run state transition: {from:?} -> {to:?}")]
pub struct IllegalTransition {
    pub from: RunState,
    pub to: RunState,
}

/// Transition log integrity failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    #[error("transition log integrity violation")]
    IntegrityViolation,
}
