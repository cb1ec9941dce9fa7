use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::AgentId;
use crate::verdict::{Tier, VerdictKind};

/// One past verdict in an agent's rolling history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerdictRecord {
    pub action_type: String,
    pub verdict: VerdictKind,
    pub tier: Tier,
    pub at: DateTime<Utc>,
}

/// Per-agent trust state.
///
/// Only the trust store mutates profiles; everything else works on
/// snapshots (clones).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrustProfile {
    pub agent_id: AgentId,
    /// Always within the configured [floor, ceiling].
    pub value: f64,
    /// Time of the last event-driven update (success, violation, interrupt).
    pub last_updated: DateTime<Utc>,
    /// Idle decay has been applied up to this instant.
    pub decayed_through: DateTime<Utc>,
    /// Most recent verdicts, oldest first, bounded by the configured window.
    pub history: VecDeque<VerdictRecord>,
}

impl TrustProfile {
    pub fn new(agent_id: AgentId, value: f64, now: DateTime<Utc>) -> Self {
        Self {
            agent_id,
            value,
            last_updated: now,
            decayed_through: now,
            history: VecDeque::new(),
        }
    }

    /// Append a verdict, dropping the oldest entries beyond `window`.
    pub fn push_history(&mut self, record: VerdictRecord, window: usize) {
        self.history.push_back(record);
        while self.history.len() > window {
            self.history.pop_front();
        }
    }

    pub fn recent_denials(&self) -> usize {
        self.history
            .iter()
            .filter(|r| r.verdict == VerdictKind::Deny)
            .count()
    }

    pub fn has_seen(&self, action_type: &str) -> bool {
        self.history.iter().any(|r| r.action_type == action_type)
    }

    /// Fraction of past verdicts for `action_type` that were ALLOW, or `None`
    /// without precedent.
    pub fn allow_fraction(&self, action_type: &str) -> Option<f64> {
        let (allowed, total) = self
            .history
            .iter()
            .filter(|r| r.action_type == action_type)
            .fold((0usize, 0usize), |(a, t), r| {
                (a + usize::from(r.verdict == VerdictKind::Allow), t + 1)
            });
        if total == 0 {
            None
        } else {
            Some(allowed as f64 / total as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(action_type: &str, verdict: VerdictKind) -> VerdictRecord {
        VerdictRecord {
            action_type: action_type.into(),
            verdict,
            tier: Tier::Threshold,
            at: Utc::now(),
        }
    }

    #[test]
    fn history_is_bounded() {
        let mut profile = TrustProfile::new(AgentId::from("a"), 0.5, Utc::now());
        for _ in 0..10 {
            profile.push_history(record("read", VerdictKind::Allow), 4);
        }
        assert_eq!(profile.history.len(), 4);
    }

    #[test]
    fn allow_fraction_by_action_type() {
        let mut profile = TrustProfile::new(AgentId::from("a"), 0.5, Utc::now());
        profile.push_history(record("read", VerdictKind::Allow), 10);
        profile.push_history(record("read", VerdictKind::Deny), 10);
        profile.push_history(record("write", VerdictKind::Deny), 10);

        assert_eq!(profile.allow_fraction("read"), Some(0.5));
        assert_eq!(profile.allow_fraction("write"), Some(0.0));
        assert_eq!(profile.allow_fraction("delete"), None);
        assert_eq!(profile.recent_denials(), 2);
        assert!(profile.has_seen("write"));
        assert!(!profile.has_seen("delete"));
    }
}
