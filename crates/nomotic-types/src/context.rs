use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ids::AgentId;
use crate::trust::TrustProfile;

/// What an agent is permitted to do. Owned by configuration, read-only at
/// evaluation time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeDefinition {
    /// Permitted action types.
    pub actions: BTreeSet<String>,
    /// Targets the agent owns.
    pub targets: BTreeSet<String>,
    /// Additional targets in-scope actions may operate on.
    pub boundaries: BTreeSet<String>,
    /// Upper bounds for numeric parameters, keyed by parameter name.
    pub resource_limits: BTreeMap<String, f64>,
    /// Action types that always need a human decision.
    pub review_required: BTreeSet<String>,
    /// UTC hour window `[start, end)` in which actions are expected.
    /// Wraps past midnight when `start > end`.
    pub active_hours: Option<(u32, u32)>,
}

impl ScopeDefinition {
    /// The scope of an agent nobody configured: nothing is permitted.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_actions<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            actions: actions.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn target<S: Into<String>>(mut self, target: S) -> Self {
        self.targets.insert(target.into());
        self
    }

    pub fn boundary<S: Into<String>>(mut self, target: S) -> Self {
        self.boundaries.insert(target.into());
        self
    }

    pub fn limit<S: Into<String>>(mut self, param: S, max: f64) -> Self {
        self.resource_limits.insert(param.into(), max);
        self
    }

    pub fn review<S: Into<String>>(mut self, action_type: S) -> Self {
        self.review_required.insert(action_type.into());
        self
    }

    pub fn hours(mut self, start: u32, end: u32) -> Self {
        self.active_hours = Some((start, end));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn permits_action(&self, action_type: &str) -> bool {
        self.actions.contains(action_type)
    }

    pub fn permits_target(&self, target: &str) -> bool {
        self.targets.contains(target) || self.boundaries.contains(target)
    }

    /// Everything wrong with this scope, relative to the scope's own fields.
    /// Limits must be positive and finite; active hours are two distinct
    /// hours in 0..=23.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for (param, limit) in &self.resource_limits {
            if !limit.is_finite() || *limit <= 0.0 {
                problems.push(format!(
                    "resource_limits.{param} must be positive, got {limit}"
                ));
            }
        }
        if let Some((start, end)) = self.active_hours {
            if start > 23 || end > 23 || start == end {
                problems.push(format!(
                    "active_hours ({start}, {end}) must be two distinct UTC hours in 0..=23"
                ));
            }
        }
        problems
    }
}

/// How pressing the caller says an action is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

/// Situation of the agent at evaluation time.
///
/// `trust` is the snapshot the decision is made against; the runtime refreshes
/// it from the trust store once per evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentContext {
    pub agent_id: AgentId,
    pub trust: TrustProfile,
    /// Where the request came from (session, upstream system, user).
    pub origin: Option<String>,
    pub urgency: Option<Urgency>,
    pub metadata: BTreeMap<String, String>,
}

impl AgentContext {
    pub fn new(trust: TrustProfile) -> Self {
        Self {
            agent_id: trust.agent_id.clone(),
            trust,
            origin: None,
            urgency: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = Some(urgency);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
