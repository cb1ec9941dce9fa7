use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use nomotic_execution::RollbackOutcome;
use nomotic_types::{
    Action, ActionId, AgentId, AuditRecordId, Clock, InterruptScope, ScopeDefinition,
    TrustProfile, Verdict, VerdictKind,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::error::{AuditError, AuditResult};
use crate::record::{AuditDraft, AuditPayload};
use crate::sink::AuditSink;

enum Command {
    Append(AuditDraft),
    Flush(oneshot::Sender<()>),
}

/// Fire-and-forget front end to an [`AuditSink`].
///
/// Emitting never waits on the sink: drafts go onto an unbounded channel
/// drained by a background writer task. Follow-up records for an action
/// (completion, interruption) are linked to its evaluation record.
pub struct AuditEmitter {
    tx: mpsc::UnboundedSender<Command>,
    clock: Arc<dyn Clock>,
    evaluations: DashMap<ActionId, AuditRecordId>,
    dropped: AtomicU64,
}

impl AuditEmitter {
    /// Start the writer task on the current tokio runtime.
    pub fn spawn(sink: Arc<dyn AuditSink>, clock: Arc<dyn Clock>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_loop(sink, rx));
        let emitter = Self {
            tx,
            clock,
            evaluations: DashMap::new(),
            dropped: AtomicU64::new(0),
        };
        (emitter, writer)
    }

    /// Records that could not be handed to the writer.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn emit(&self, parent: Option<AuditRecordId>, payload: AuditPayload) -> AuditRecordId {
        let draft = AuditDraft {
            id: AuditRecordId::new(),
            parent,
            recorded_at: self.clock.now(),
            payload,
        };
        let id = draft.id;
        let kind = draft.payload.kind();
        if self.tx.send(Command::Append(draft)).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            error!(record_id = %id, kind = kind.as_str(), "Audit writer gone; record dropped");
        }
        id
    }

    /// Record a verdict. Only ALLOW verdicts can have follow-ups, so only
    /// they are remembered as parents.
    pub fn evaluation(
        &self,
        action: &Action,
        verdict: &Verdict,
        trust: &TrustProfile,
    ) -> AuditRecordId {
        let id = self.emit(
            None,
            AuditPayload::Evaluation {
                action: action.clone(),
                verdict: verdict.clone(),
                trust: trust.clone(),
            },
        );
        if verdict.kind == VerdictKind::Allow {
            self.evaluations.insert(action.id, id);
        }
        id
    }

    /// Drop the parent link of an approval that will never execute.
    pub fn forget(&self, action_id: &ActionId) {
        self.evaluations.remove(action_id);
    }

    /// Approved evaluations still waiting for a follow-up record.
    pub fn pending_parents(&self) -> usize {
        self.evaluations.len()
    }

    pub fn completion(
        &self,
        action_id: ActionId,
        agent_id: &AgentId,
        trust_after: f64,
    ) -> AuditRecordId {
        let parent = self.evaluations.remove(&action_id).map(|(_, id)| id);
        self.emit(
            parent,
            AuditPayload::Completion {
                action_id,
                agent_id: agent_id.clone(),
                trust_after,
            },
        )
    }

    pub fn interruption(
        &self,
        action_id: ActionId,
        agent_id: &AgentId,
        scope: InterruptScope,
        reason: &str,
        rollback: RollbackOutcome,
        trust_after: f64,
    ) -> AuditRecordId {
        let parent = self.evaluations.remove(&action_id).map(|(_, id)| id);
        self.emit(
            parent,
            AuditPayload::Interruption {
                action_id,
                agent_id: agent_id.clone(),
                scope,
                reason: reason.to_string(),
                rollback,
                trust_after,
            },
        )
    }

    pub fn scope_changed(
        &self,
        agent_id: &AgentId,
        previous: Option<ScopeDefinition>,
        scope: &ScopeDefinition,
        actor: &str,
        reason: &str,
    ) -> AuditRecordId {
        self.emit(
            None,
            AuditPayload::ScopeChanged {
                agent_id: agent_id.clone(),
                previous,
                scope: scope.clone(),
                actor: actor.to_string(),
                reason: reason.to_string(),
            },
        )
    }

    pub fn halt_cleared(&self, agent_id: Option<&AgentId>, actor: &str) -> AuditRecordId {
        self.emit(
            None,
            AuditPayload::HaltCleared {
                agent_id: agent_id.cloned(),
                actor: actor.to_string(),
            },
        )
    }

    /// Wait until everything emitted so far has reached the sink.
    pub async fn flush(&self) -> AuditResult<()> {
        let (ack, done) = oneshot::channel();
        self.tx
            .send(Command::Flush(ack))
            .map_err(|_| AuditError::SinkUnavailable("audit writer stopped".into()))?;
        done.await
            .map_err(|_| AuditError::SinkUnavailable("audit writer stopped".into()))
    }
}

async fn write_loop(sink: Arc<dyn AuditSink>, mut rx: mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Append(draft) => {
                let id = draft.id;
                match sink.append(draft).await {
                    Ok(record) => debug!(
                        record_id = %record.id,
                        sequence = record.sequence,
                        kind = record.kind().as_str(),
                        "Audit record appended"
                    ),
                    Err(e) => error!(record_id = %id, error = %e, "Audit append failed"),
                }
            }
            Command::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!("Audit writer stopped");
}
