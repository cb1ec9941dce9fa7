use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use nomotic_types::{ActionId, AgentId};
use serde::{Deserialize, Serialize};

use crate::record::{AuditRecord, AuditRecordKind};

/// Filter over the audit log. Every set field must match.
///
/// `agent_id` matches the accountable agent of a record and, for
/// evaluations, also the agent the action claimed to act as.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuditQuery {
    pub action_id: Option<ActionId>,
    pub agent_id: Option<AgentId>,
    pub kind: Option<AuditRecordKind>,
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn for_action(action_id: ActionId) -> Self {
        Self {
            action_id: Some(action_id),
            ..Self::default()
        }
    }

    pub fn for_agent(agent_id: impl Into<AgentId>) -> Self {
        Self {
            agent_id: Some(agent_id.into()),
            ..Self::default()
        }
    }

    pub fn kind(mut self, kind: AuditRecordKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &AuditRecord) -> bool {
        if let Some(action_id) = self.action_id {
            if record.action_id() != Some(action_id) {
                return false;
            }
        }
        if let Some(ref agent_id) = self.agent_id {
            if !record.involves(agent_id) {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if record.kind() != kind {
                return false;
            }
        }
        if let Some(after) = self.after {
            if record.recorded_at < after {
                return false;
            }
        }
        if let Some(before) = self.before {
            if record.recorded_at > before {
                return false;
            }
        }
        true
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditStatistics {
    pub total_records: usize,
    pub by_kind: BTreeMap<String, usize>,
    pub by_verdict: BTreeMap<String, usize>,
    pub interruptions: usize,
    pub rollback_failures: usize,
}

impl AuditStatistics {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a AuditRecord>) -> Self {
        let mut stats = Self::default();
        for record in records {
            stats.total_records += 1;
            *stats
                .by_kind
                .entry(record.kind().as_str().to_string())
                .or_insert(0) += 1;
            if let Some(verdict) = record.verdict() {
                *stats
                    .by_verdict
                    .entry(verdict.kind.as_str().to_string())
                    .or_insert(0) += 1;
            }
            if let crate::record::AuditPayload::Interruption { rollback, .. } = &record.payload {
                stats.interruptions += 1;
                if rollback.is_failure() {
                    stats.rollback_failures += 1;
                }
            }
        }
        stats
    }
}
