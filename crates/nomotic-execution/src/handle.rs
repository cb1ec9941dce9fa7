use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use nomotic_types::{ActionId, AgentId, ExecutionState};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Compensating action registered at `begin_execution`. Runs at most once.
pub type Rollback = Box<dyn FnOnce() -> Result<(), String> + Send>;

/// How the rollback went when a handle was sealed as interrupted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RollbackOutcome {
    NotRegistered,
    Succeeded,
    Failed { reason: String },
}

impl RollbackOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RollbackOutcome::Failed { .. })
    }
}

/// Raw lifecycle value while an interrupt's rollback is in flight. Never
/// escapes the handle: readers see RUNNING, losing transitions see
/// INTERRUPTED.
const SEALING: u8 = u8::MAX;

/// Poll-only view of a handle's cancellation flag.
///
/// Executors hold one of these and check it between steps. It never
/// resets once set.
#[derive(Clone, Debug)]
pub struct InterruptToken(Arc<AtomicBool>);

impl InterruptToken {
    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

struct HandleInner {
    action_id: ActionId,
    agent_id: AgentId,
    started_at: DateTime<Utc>,
    flag: Arc<AtomicBool>,
    state: AtomicU8,
    rollback: Mutex<Option<Rollback>>,
}

/// A live, cancellable execution of one approved action.
///
/// Clones share state. Only the controller transitions the state, and only
/// out of RUNNING.
#[derive(Clone)]
pub struct ExecutionHandle {
    inner: Arc<HandleInner>,
}

impl ExecutionHandle {
    pub(crate) fn new(
        action_id: ActionId,
        agent_id: AgentId,
        started_at: DateTime<Utc>,
        rollback: Option<Rollback>,
    ) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                action_id,
                agent_id,
                started_at,
                flag: Arc::new(AtomicBool::new(false)),
                state: AtomicU8::new(ExecutionState::Running.as_u8()),
                rollback: Mutex::new(rollback),
            }),
        }
    }

    pub fn action_id(&self) -> ActionId {
        self.inner.action_id
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.inner.agent_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    /// Current lifecycle state. A handle whose rollback is still running
    /// reads RUNNING with its interrupt flag already raised.
    pub fn state(&self) -> ExecutionState {
        match self.inner.state.load(Ordering::Acquire) {
            SEALING => ExecutionState::Running,
            raw => ExecutionState::from_u8(raw).unwrap_or(ExecutionState::Interrupted),
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.inner.flag.load(Ordering::Acquire)
    }

    pub fn token(&self) -> InterruptToken {
        InterruptToken(self.inner.flag.clone())
    }

    fn claim(&self, to: u8) -> Result<(), ExecutionState> {
        self.inner
            .state
            .compare_exchange(
                ExecutionState::Running.as_u8(),
                to,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(|raw| ExecutionState::from_u8(raw).unwrap_or(ExecutionState::Interrupted))
    }

    /// RUNNING -> COMPLETED.
    pub(crate) fn complete(&self) -> Result<(), ExecutionState> {
        self.claim(ExecutionState::Completed.as_u8())?;
        self.inner.rollback.lock().take();
        Ok(())
    }

    /// Claim the handle out of RUNNING, raise the flag, run the rollback and
    /// only then store INTERRUPTED. `None` means another call already
    /// claimed the handle or it completed first.
    pub(crate) fn seal_interrupted(&self) -> Option<RollbackOutcome> {
        self.claim(SEALING).ok()?;
        self.inner.flag.store(true, Ordering::Release);

        let rollback = self.inner.rollback.lock().take();
        let outcome = match rollback {
            None => RollbackOutcome::NotRegistered,
            Some(rollback) => match catch_unwind(AssertUnwindSafe(rollback)) {
                Ok(Ok(())) => RollbackOutcome::Succeeded,
                Ok(Err(reason)) => RollbackOutcome::Failed { reason },
                Err(_) => RollbackOutcome::Failed {
                    reason: "rollback panicked".to_string(),
                },
            },
        };
        self.inner
            .state
            .store(ExecutionState::Interrupted.as_u8(), Ordering::Release);
        Some(outcome)
    }
}

impl std::fmt::Debug for ExecutionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionHandle")
            .field("action_id", &self.inner.action_id)
            .field("agent_id", &self.inner.agent_id)
            .field("state", &self.state())
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}
