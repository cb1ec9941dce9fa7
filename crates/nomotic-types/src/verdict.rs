use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dimension::{DimensionId, DimensionResult};
use crate::ids::{ActionId, AgentId};

/// Terminal decision of one evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictKind {
    Allow,
    Deny,
    Modify,
    Escalate,
    Suspend,
}

impl VerdictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictKind::Allow => "ALLOW",
            VerdictKind::Deny => "DENY",
            VerdictKind::Modify => "MODIFY",
            VerdictKind::Escalate => "ESCALATE",
            VerdictKind::Suspend => "SUSPEND",
        }
    }
}

impl std::fmt::Display for VerdictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The stage of the decision cascade that produced a verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// A GLOBAL or AGENT halt was active; nothing was scored.
    Halt,
    /// Tier 1.
    VetoGate,
    /// Tier 2.
    Threshold,
    /// Tier 3.
    Deliberation,
}

impl Tier {
    pub fn number(&self) -> u8 {
        match self {
            Tier::Halt => 0,
            Tier::VetoGate => 1,
            Tier::Threshold => 2,
            Tier::Deliberation => 3,
        }
    }
}

/// A verdict with everything needed to explain it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub action_id: ActionId,
    pub agent_id: AgentId,
    pub kind: VerdictKind,
    /// Unified Confidence Score. 0.0 when no aggregate was computed.
    pub ucs: f64,
    pub tier: Tier,
    pub dimensions: Vec<DimensionResult>,
    /// Dimensions whose veto decided Tier 1.
    pub vetoed_by: Vec<DimensionId>,
    /// The single isolable dimension a MODIFY verdict asks to constrain.
    pub constrain: Option<DimensionId>,
    pub rationale: String,
    pub latency: Duration,
    pub decided_at: DateTime<Utc>,
}

impl Verdict {
    pub fn is_allow(&self) -> bool {
        self.kind == VerdictKind::Allow
    }

    /// DENY produced by a veto or by the deny threshold. Trust is charged for these.
    pub fn is_violation(&self) -> bool {
        self.kind == VerdictKind::Deny && matches!(self.tier, Tier::VetoGate | Tier::Threshold)
    }

    pub fn dimension(&self, id: DimensionId) -> Option<&DimensionResult> {
        self.dimensions.iter().find(|r| r.dimension == id)
    }
}
