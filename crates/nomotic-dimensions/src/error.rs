use std::time::Duration;

use thiserror::Error;

/// A dimension scorer could not complete.
///
/// Never aborts an evaluation: the evaluator turns every fault into a
/// concern-maximizing result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScorerFault {
    #[error("scorer failed: {0}")]
    Internal(String),

    #[error("scorer exceeded its {0:?} deadline")]
    TimedOut(Duration),

    #[error("scorer panicked: {0}")]
    Panicked(String),

    #[error("no scorer registered for dimension")]
    Missing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ScorerFault::TimedOut(Duration::from_millis(250));
        assert!(err.to_string().contains("250ms"));
        assert!(ScorerFault::Internal("lookup refused".into())
            .to_string()
            .contains("lookup refused"));
    }
}
