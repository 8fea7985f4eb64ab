use gameday::state_machine::{allowed_transitions, validate_transition};
use gameday::types::RunState;
use proptest::prelude::*;

#[test]
fn test_pending_transitions() {
    assert!(validate_transition(RunState::Pending, RunState::Running).is_ok());
    assert!(validate_transition(RunState::Pending, RunState::Cancelled).is_ok());

    // Invalid
    assert!(validate_transition(RunState::Pending, RunState::Completed).is_err());
    assert!(validate_transition(RunState::Pending, RunState::Failed).is_err());
    assert!(validate_transition(RunState::Pending, RunState::TimedOut).is_err());
}

#[test]
fn test_running_transitions() {
    assert!(validate_transition(RunState::Running, RunState::Completed).is_ok());
    assert!(validate_transition(RunState::Running, RunState::Failed).is_ok());
    assert!(validate_transition(RunState::Running, RunState::Cancelled).is_ok());
    assert!(validate_transition(RunState::Running, RunState::TimedOut).is_ok());

    assert!(validate_transition(RunState::Running, RunState::Pending).is_err());
}

#[test]
fn test_terminal_states_have_no_exits() {
    for terminal in [
        RunState::Completed,
        RunState::Failed,
        RunState::Cancelled,
        RunState::TimedOut,
    ] {
        assert!(terminal.is_terminal());
        assert!(allowed_transitions(terminal).is_empty());
    }
}

fn any_state() -> impl Strategy<Value = RunState> {
    prop_oneof![
        Just(RunState::Pending),
        Just(RunState::Running),
        Just(RunState::Completed),
        Just(RunState::Failed),
        Just(RunState::Cancelled),
        Just(RunState::TimedOut),
    ]
}

proptest! {
    #[test]
    fn prop_validate_agrees_with_allowed(from in any_state(), to in any_state()) {
        let res = validate_transition(from, to);
        let allowed = allowed_transitions(from);

        if res.is_ok() {
            prop_assert!(allowed.contains(&to));
        } else {
            prop_assert!(!allowed.contains(&to));
        }
    }

    #[test]
    fn prop_terminal_states_are_absorbing(from in any_state(), to in any_state()) {
        if from.is_terminal() {
            prop_assert!(validate_transition(from, to).is_err());
        }
    }
}
