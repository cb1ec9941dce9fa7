use serde::{Deserialize, Serialize};

/// Lifecycle of an execution handle. Only RUNNING -> {COMPLETED | INTERRUPTED}.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum ExecutionState {
    Running = 0,
    Completed = 1,
    Interrupted = 2,
}

impl ExecutionState {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(ExecutionState::Running),
            1 => Some(ExecutionState::Completed),
            2 => Some(ExecutionState::Interrupted),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionState::Running)
    }
}

/// Breadth of a cancellation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterruptScope {
    Action,
    Agent,
    Global,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips_through_u8() {
        for state in [
            ExecutionState::Running,
            ExecutionState::Completed,
            ExecutionState::Interrupted,
        ] {
            assert_eq!(ExecutionState::from_u8(state.as_u8()), Some(state));
        }
        assert_eq!(ExecutionState::from_u8(9), None);
        assert!(!ExecutionState::Running.is_terminal());
        assert!(ExecutionState::Interrupted.is_terminal());
    }
}
