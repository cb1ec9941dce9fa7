use chrono::{DateTime, Utc};
use nomotic_execution::RollbackOutcome;
use nomotic_types::{
    Action, ActionId, AgentId, AuditRecordId, InterruptScope, ScopeDefinition, TrustProfile,
    Verdict,
};
use serde::{Deserialize, Serialize};

use crate::error::AuditResult;

/// Digest the first record chains from.
pub const GENESIS_DIGEST: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditRecordKind {
    Evaluation,
    Completion,
    Interruption,
    ScopeChanged,
    HaltCleared,
}

impl AuditRecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditRecordKind::Evaluation => "evaluation",
            AuditRecordKind::Completion => "completion",
            AuditRecordKind::Interruption => "interruption",
            AuditRecordKind::ScopeChanged => "scope_changed",
            AuditRecordKind::HaltCleared => "halt_cleared",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditPayload {
    /// One per evaluation, with the trust snapshot the cascade decided on.
    Evaluation {
        action: Action,
        verdict: Verdict,
        trust: TrustProfile,
    },
    Completion {
        action_id: ActionId,
        agent_id: AgentId,
        trust_after: f64,
    },
    Interruption {
        action_id: ActionId,
        agent_id: AgentId,
        scope: InterruptScope,
        reason: String,
        rollback: RollbackOutcome,
        trust_after: f64,
    },
    ScopeChanged {
        agent_id: AgentId,
        previous: Option<ScopeDefinition>,
        scope: ScopeDefinition,
        actor: String,
        reason: String,
    },
    /// An operator lifted a halt. `agent_id` is `None` for the global halt.
    HaltCleared {
        agent_id: Option<AgentId>,
        actor: String,
    },
}

impl AuditPayload {
    pub fn kind(&self) -> AuditRecordKind {
        match self {
            AuditPayload::Evaluation { .. } => AuditRecordKind::Evaluation,
            AuditPayload::Completion { .. } => AuditRecordKind::Completion,
            AuditPayload::Interruption { .. } => AuditRecordKind::Interruption,
            AuditPayload::ScopeChanged { .. } => AuditRecordKind::ScopeChanged,
            AuditPayload::HaltCleared { .. } => AuditRecordKind::HaltCleared,
        }
    }

    pub fn action_id(&self) -> Option<ActionId> {
        match self {
            AuditPayload::Evaluation { action, .. } => Some(action.id),
            AuditPayload::Completion { action_id, .. }
            | AuditPayload::Interruption { action_id, .. } => Some(*action_id),
            AuditPayload::ScopeChanged { .. } | AuditPayload::HaltCleared { .. } => None,
        }
    }

    /// The accountable agent. For evaluations this is the submitter the
    /// verdict was charged to, not the agent named inside the action.
    pub fn agent_id(&self) -> Option<&AgentId> {
        match self {
            AuditPayload::Evaluation { verdict, .. } => Some(&verdict.agent_id),
            AuditPayload::Completion { agent_id, .. }
            | AuditPayload::Interruption { agent_id, .. }
            | AuditPayload::ScopeChanged { agent_id, .. } => Some(agent_id),
            AuditPayload::HaltCleared { agent_id, .. } => agent_id.as_ref(),
        }
    }

    /// Whether `agent` is accountable for this record or is the agent an
    /// evaluated action claimed to act as.
    pub fn involves(&self, agent: &AgentId) -> bool {
        match self {
            AuditPayload::Evaluation { action, verdict, .. } => {
                &verdict.agent_id == agent || &action.agent_id == agent
            }
            other => other.agent_id() == Some(agent),
        }
    }
}

/// A record before the sink has placed it in the chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditDraft {
    pub id: AuditRecordId,
    /// The evaluation record this one follows up on.
    pub parent: Option<AuditRecordId>,
    pub recorded_at: DateTime<Utc>,
    pub payload: AuditPayload,
}

/// A sealed, chained audit record. Never mutated after append.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: AuditRecordId,
    pub sequence: u64,
    pub parent: Option<AuditRecordId>,
    pub recorded_at: DateTime<Utc>,
    pub payload: AuditPayload,
    pub prev_digest: String,
    pub digest: String,
}

impl AuditRecord {
    /// Seal `draft` at `sequence`, chaining from `prev_digest`.
    pub fn seal(draft: AuditDraft, sequence: u64, prev_digest: &str) -> AuditResult<Self> {
        let digest = compute_digest(
            prev_digest,
            sequence,
            &draft.id,
            draft.parent.as_ref(),
            &draft.recorded_at,
            &draft.payload,
        )?;
        Ok(Self {
            id: draft.id,
            sequence,
            parent: draft.parent,
            recorded_at: draft.recorded_at,
            payload: draft.payload,
            prev_digest: prev_digest.to_string(),
            digest,
        })
    }

    pub fn kind(&self) -> AuditRecordKind {
        self.payload.kind()
    }

    pub fn action_id(&self) -> Option<ActionId> {
        self.payload.action_id()
    }

    pub fn agent_id(&self) -> Option<&AgentId> {
        self.payload.agent_id()
    }

    pub fn involves(&self, agent: &AgentId) -> bool {
        self.payload.involves(agent)
    }

    pub fn verdict(&self) -> Option<&Verdict> {
        match &self.payload {
            AuditPayload::Evaluation { verdict, .. } => Some(verdict),
            _ => None,
        }
    }

    /// Recompute this record's digest from its contents.
    pub fn recompute_digest(&self) -> AuditResult<String> {
        compute_digest(
            &self.prev_digest,
            self.sequence,
            &self.id,
            self.parent.as_ref(),
            &self.recorded_at,
            &self.payload,
        )
    }
}

#[derive(Serialize)]
struct DigestBody<'a> {
    id: &'a AuditRecordId,
    parent: Option<&'a AuditRecordId>,
    recorded_at: &'a DateTime<Utc>,
    payload: &'a AuditPayload,
}

fn compute_digest(
    prev_digest: &str,
    sequence: u64,
    id: &AuditRecordId,
    parent: Option<&AuditRecordId>,
    recorded_at: &DateTime<Utc>,
    payload: &AuditPayload,
) -> AuditResult<String> {
    let body = serde_json::to_vec(&DigestBody {
        id,
        parent,
        recorded_at,
        payload,
    })?;
    let mut hasher = blake3::Hasher::new();
    hasher.update(prev_digest.as_bytes());
    hasher.update(&sequence.to_le_bytes());
    hasher.update(&body);
    Ok(hasher.finalize().to_hex().to_string())
}
