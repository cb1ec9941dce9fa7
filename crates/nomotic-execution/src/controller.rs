use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use nomotic_types::{ActionId, AgentId, ExecutionState, InterruptScope};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::error::{ExecutionError, ExecutionResult};
use crate::handle::{ExecutionHandle, Rollback, RollbackOutcome};

/// One handle sealed by an interrupt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedHandle {
    pub action_id: ActionId,
    pub agent_id: AgentId,
    pub rollback: RollbackOutcome,
}

/// Result of an `interrupt_action` call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptReport {
    pub scope: InterruptScope,
    pub reason: String,
    /// Handles this call moved to INTERRUPTED. Empty on a repeat interrupt.
    pub sealed: Vec<SealedHandle>,
}

impl InterruptReport {
    pub fn rollback_failures(&self) -> impl Iterator<Item = &SealedHandle> {
        self.sealed.iter().filter(|s| s.rollback.is_failure())
    }
}

/// Terminal handles remembered after they leave the live map.
pub const DEFAULT_RETAINED_TERMINAL: usize = 4096;

#[derive(Clone, Debug)]
struct Tombstone {
    agent_id: AgentId,
    state: ExecutionState,
}

/// Bounded memory of terminal handles, oldest evicted first.
struct Tombstones {
    capacity: usize,
    entries: HashMap<ActionId, Tombstone>,
    order: VecDeque<ActionId>,
}

impl Tombstones {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn bury(&mut self, handle: &ExecutionHandle) {
        let tombstone = Tombstone {
            agent_id: handle.agent_id().clone(),
            state: handle.state(),
        };
        if self.entries.insert(handle.action_id(), tombstone).is_none() {
            self.order.push_back(handle.action_id());
        }
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    fn get(&self, action_id: &ActionId) -> Option<Tombstone> {
        self.entries.get(action_id).cloned()
    }
}

#[derive(Default)]
struct Halts {
    global: Option<String>,
    agents: HashMap<AgentId, String>,
}

impl Halts {
    fn reason(&self, agent: &AgentId) -> Option<String> {
        if let Some(reason) = &self.global {
            return Some(format!("global halt: {reason}"));
        }
        self.agents
            .get(agent)
            .map(|reason| format!("agent halt: {reason}"))
    }
}

/// Issues and tracks execution handles for approved actions.
///
/// Interrupts are cooperative: they raise each affected handle's flag and
/// seal it, running its rollback exactly once. The executor sees the flag
/// on its next poll. AGENT and GLOBAL interrupts also leave a halt behind so
/// nothing new starts until an operator resumes.
///
/// Starting a handle holds the halt lock for reading until the handle is
/// in the live map, and raising a halt takes it for writing before the
/// sweep. A handle is therefore either refused or seen by the sweep.
///
/// Terminal handles move out of the live map into a bounded set of
/// tombstones; once evicted from it an action id is unknown again.
pub struct ExecutionController {
    handles: DashMap<ActionId, ExecutionHandle>,
    tombstones: Mutex<Tombstones>,
    halts: RwLock<Halts>,
}

impl ExecutionController {
    /// Controller remembering [`DEFAULT_RETAINED_TERMINAL`] terminal handles.
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETAINED_TERMINAL)
    }

    /// Controller remembering at most `retained_terminal` terminal handles.
    pub fn with_retention(retained_terminal: usize) -> Self {
        Self {
            handles: DashMap::new(),
            tombstones: Mutex::new(Tombstones::new(retained_terminal)),
            halts: RwLock::new(Halts::default()),
        }
    }

    /// Reason new work for `agent` is refused, if it is.
    pub fn halt_reason(&self, agent: &AgentId) -> Option<String> {
        self.halts.read().reason(agent)
    }

    pub fn is_globally_halted(&self) -> bool {
        self.halts.read().global.is_some()
    }

    #[instrument(skip(self, rollback), fields(action_id = %action_id, agent_id = %agent_id))]
    pub fn begin_execution(
        &self,
        action_id: ActionId,
        agent_id: AgentId,
        rollback: Option<Rollback>,
    ) -> ExecutionResult<ExecutionHandle> {
        let halts = self.halts.read();
        if let Some(reason) = halts.reason(&agent_id) {
            warn!(%reason, "Execution refused while halted");
            return Err(ExecutionError::Halted(reason));
        }

        let refused = match self.handles.entry(action_id) {
            Entry::Occupied(_) => ExecutionError::DoubleExecution(action_id),
            Entry::Vacant(slot) => match self.tombstones.lock().get(&action_id) {
                Some(tombstone) => terminal_error(action_id, tombstone.state),
                None => {
                    let handle = ExecutionHandle::new(action_id, agent_id, Utc::now(), rollback);
                    slot.insert(handle.clone());
                    info!("Execution started");
                    return Ok(handle);
                }
            },
        };
        drop(halts);
        warn!(error = %refused, "Execution refused");
        Err(refused)
    }

    /// Live handle for `action_id`. Terminal handles are no longer returned.
    pub fn handle(&self, action_id: &ActionId) -> ExecutionResult<ExecutionHandle> {
        if let Some(handle) = self.handles.get(action_id) {
            return Ok(handle.value().clone());
        }
        Err(match self.tombstones.lock().get(action_id) {
            Some(tombstone) => terminal_error(*action_id, tombstone.state),
            None => ExecutionError::UnknownAction(*action_id),
        })
    }

    /// Whether the executor of `action_id` should stop: its own flag is
    /// raised, or its agent or the whole system is halted. Once true, stays
    /// true.
    pub fn check_interrupt(&self, action_id: &ActionId) -> ExecutionResult<bool> {
        let live = self.handles.get(action_id).map(|h| h.value().clone());
        if let Some(handle) = live {
            if handle.is_interrupted() {
                return Ok(true);
            }
            return Ok(handle.state() == ExecutionState::Running
                && self.halt_reason(handle.agent_id()).is_some());
        }
        match self.tombstones.lock().get(action_id) {
            Some(tombstone) => Ok(tombstone.state == ExecutionState::Interrupted),
            None => Err(ExecutionError::UnknownAction(*action_id)),
        }
    }

    #[instrument(skip(self), fields(action_id = %action_id))]
    pub fn complete_execution(&self, action_id: &ActionId) -> ExecutionResult<ExecutionHandle> {
        let handle = self.handle(action_id)?;
        handle
            .complete()
            .map_err(|state| terminal_error(*action_id, state))?;
        self.retire(&handle);
        info!(agent_id = %handle.agent_id(), "Execution completed");
        Ok(handle)
    }

    /// Interrupt at the given breadth. For AGENT scope the agent is the one
    /// executing `action_id`; GLOBAL ignores `action_id` beyond logging.
    #[instrument(skip(self, reason), fields(action_id = %action_id, scope = ?scope))]
    pub fn interrupt_action(
        &self,
        action_id: &ActionId,
        reason: &str,
        scope: InterruptScope,
    ) -> ExecutionResult<InterruptReport> {
        match scope {
            InterruptScope::Action => {
                let targets = self.handles.get(action_id).map(|h| h.value().clone());
                if targets.is_none() && self.tombstones.lock().get(action_id).is_none() {
                    return Err(ExecutionError::UnknownAction(*action_id));
                }
                Ok(self.seal_all(scope, reason, targets))
            }
            InterruptScope::Agent => {
                let agent = self.owner(action_id)?;
                Ok(self.interrupt_agent(&agent, reason))
            }
            InterruptScope::Global => Ok(self.interrupt_global(reason)),
        }
    }

    pub fn interrupt_agent(&self, agent: &AgentId, reason: &str) -> InterruptReport {
        self.halts
            .write()
            .agents
            .insert(agent.clone(), reason.to_string());
        warn!(agent_id = %agent, %reason, "Agent halted");
        let targets = self.running_where(|h| h.agent_id() == agent);
        self.seal_all(InterruptScope::Agent, reason, targets)
    }

    pub fn interrupt_global(&self, reason: &str) -> InterruptReport {
        self.halts.write().global = Some(reason.to_string());
        error!(%reason, "Global halt");
        let targets = self.running_where(|_| true);
        self.seal_all(InterruptScope::Global, reason, targets)
    }

    /// Lift an agent halt. Handles already interrupted stay interrupted.
    pub fn resume_agent(&self, agent: &AgentId) -> bool {
        let lifted = self.halts.write().agents.remove(agent).is_some();
        if lifted {
            info!(agent_id = %agent, "Agent halt lifted");
        }
        lifted
    }

    pub fn resume_global(&self) -> bool {
        let lifted = self.halts.write().global.take().is_some();
        if lifted {
            info!("Global halt lifted");
        }
        lifted
    }

    /// Number of handles still RUNNING.
    pub fn active_count(&self) -> usize {
        self.handles
            .iter()
            .filter(|h| h.state() == ExecutionState::Running)
            .count()
    }

    /// Handles held in the live map, including any mid-retirement.
    pub fn tracked_count(&self) -> usize {
        self.handles.len()
    }

    fn owner(&self, action_id: &ActionId) -> ExecutionResult<AgentId> {
        if let Some(handle) = self.handles.get(action_id) {
            return Ok(handle.agent_id().clone());
        }
        self.tombstones
            .lock()
            .get(action_id)
            .map(|t| t.agent_id)
            .ok_or(ExecutionError::UnknownAction(*action_id))
    }

    /// Move a terminal handle from the live map to the tombstones. The
    /// tombstone lands first so a concurrent `begin_execution` never finds
    /// the id free.
    fn retire(&self, handle: &ExecutionHandle) {
        self.tombstones.lock().bury(handle);
        self.handles.remove(&handle.action_id());
    }

    fn running_where(&self, pred: impl Fn(&ExecutionHandle) -> bool) -> Vec<ExecutionHandle> {
        // Collect first so no shard lock is held while rollbacks run.
        self.handles
            .iter()
            .filter(|h| h.state() == ExecutionState::Running && pred(h.value()))
            .map(|h| h.value().clone())
            .collect()
    }

    fn seal_all(
        &self,
        scope: InterruptScope,
        reason: &str,
        targets: impl IntoIterator<Item = ExecutionHandle>,
    ) -> InterruptReport {
        let mut sealed = Vec::new();
        for handle in targets {
            let Some(rollback) = handle.seal_interrupted() else {
                continue;
            };
            self.retire(&handle);
            match &rollback {
                RollbackOutcome::Failed { reason: failure } => error!(
                    action_id = %handle.action_id(),
                    error = %failure,
                    "Rollback failed; handle sealed as interrupted"
                ),
                _ => info!(action_id = %handle.action_id(), ?rollback, "Execution interrupted"),
            }
            sealed.push(SealedHandle {
                action_id: handle.action_id(),
                agent_id: handle.agent_id().clone(),
                rollback,
            });
        }
        InterruptReport {
            scope,
            reason: reason.to_string(),
            sealed,
        }
    }
}

fn terminal_error(action_id: ActionId, state: ExecutionState) -> ExecutionError {
    match state {
        ExecutionState::Running => ExecutionError::DoubleExecution(action_id),
        ExecutionState::Completed => ExecutionError::AlreadyCompleted(action_id),
        ExecutionState::Interrupted => ExecutionError::AlreadyInterrupted(action_id),
    }
}

impl Default for ExecutionController {
    fn default() -> Self {
        Self::new()
    }
}
