use nomotic_audit::AuditError;
use nomotic_cascade::CascadeError;
use nomotic_execution::ExecutionError;
use nomotic_types::{ActionId, ConfigError};
use thiserror::Error;

/// Errors surfaced by the governance runtime.
///
/// Evaluation itself never fails; these cover construction, the execution
/// surface and audit access.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("cascade refused configuration: {0}")]
    Cascade(#[from] CascadeError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("audit error: {0}")]
    Audit(#[from] AuditError),

    #[error("action {0} has no ALLOW verdict on record")]
    NotApproved(ActionId),

    #[error("governance runtime must be built inside a tokio runtime")]
    NoAsyncRuntime,
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
