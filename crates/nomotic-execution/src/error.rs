use nomotic_types::ActionId;

/// Errors from the Execution Controller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutionError {
    #[error("action {0} already has an active execution handle")]
    DoubleExecution(ActionId),
    #[error("no execution handle for action {0}")]
    UnknownAction(ActionId),
    #[error("action {0} was interrupted")]
    AlreadyInterrupted(ActionId),
    #[error("action {0} already completed")]
    AlreadyCompleted(ActionId),
    #[error("execution halted: {0}")]
    Halted(String),
}

pub type ExecutionResult<T> = Result<T, ExecutionError>;
