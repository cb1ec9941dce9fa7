//! Execution Controller for the Nomotic governance engine.
//!
//! An approved action runs under an [`ExecutionHandle`]: a shared,
//! monotonic cancellation flag plus a lifecycle that only ever moves
//! `RUNNING -> COMPLETED` or `RUNNING -> INTERRUPTED`. Executors poll the
//! flag; they are never stopped forcibly.

pub mod controller;
pub mod error;
pub mod handle;

pub use controller::{
    ExecutionController, InterruptReport, SealedHandle, DEFAULT_RETAINED_TERMINAL,
};
pub use error::{ExecutionError, ExecutionResult};
pub use handle::{ExecutionHandle, InterruptToken, Rollback, RollbackOutcome};
