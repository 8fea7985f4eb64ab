use crate::error::IllegalTransition;
use crate::types::RunState;

/// Validates a run state transition.
///
/// Illegal transitions can be promoted to a debug panic with the
/// `strict-debug` feature; by default they surface as an error so the
/// orchestrator's drive loop can report them.
pub fn validate_transition(from: RunState, to: RunState) -> Result<(), IllegalTransition> {
    if allowed(from, to) {
        Ok(())
    } else {
        #[cfg(feature = "strict-debug")]
        panic!("Illegal run state transition attempted: {:?} -> {:?}", from, to);

        Err(IllegalTransition { from, to })
    }
}

pub fn allowed_transitions(from: RunState) -> Vec<RunState> {
    use RunState::*;
    match from {
        // A stop request can land before the first step dispatch.
        Pending => vec![Running, Cancelled],
        Running => vec![Completed, Failed, Cancelled, TimedOut],
        Completed | Failed | Cancelled | TimedOut => vec![],
    }
}

fn allowed(from: RunState, to: RunState) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}
