//! Governance runtime for the Nomotic authorization engine.
//!
//! Wires the components into one surface for external collaborators:
//!
//! - **Evaluate**: [`GovernanceRuntime::evaluate`] scores an action on all
//!   thirteen dimensions, runs the three-tier cascade against a trust
//!   snapshot and returns a [`Verdict`](nomotic_types::Verdict).
//! - **Execute**: ALLOWed actions run under an
//!   [`ExecutionHandle`](nomotic_execution::ExecutionHandle) that any caller
//!   can interrupt at ACTION, AGENT or GLOBAL scope.
//! - **Account**: every evaluation, completion, interruption, scope change
//!   and halt release lands in a hash-chained audit log.
//!
//! ```no_run
//! use nomotic_runtime::GovernanceRuntime;
//! use nomotic_types::{Action, AgentConfig, GovernanceConfig, ScopeDefinition};
//!
//! # async fn demo() -> Result<(), nomotic_runtime::RuntimeError> {
//! let config = GovernanceConfig::default().with_agent(
//!     "reader",
//!     AgentConfig::new(ScopeDefinition::with_actions(["read"]).target("docs")),
//! );
//! let runtime = GovernanceRuntime::new(config)?;
//!
//! let action = Action::new("reader", "read", "docs");
//! let verdict = runtime.evaluate(&action, runtime.context(&action.agent_id)).await;
//! if verdict.is_allow() {
//!     let handle = runtime.begin_execution(action.id, None)?;
//!     // ... do the work, polling handle.is_interrupted() at safe points ...
//!     runtime.complete_execution(&handle.action_id())?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod runtime;

pub use error::{RuntimeError, RuntimeResult};
pub use runtime::{GovernanceRuntime, RuntimeBuilder};
