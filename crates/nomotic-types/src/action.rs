use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{ActionId, AgentId};

/// An action an agent attempts. Immutable once built.
///
/// The generated `id` correlates evaluation, execution and audit records.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub agent_id: AgentId,
    /// Method / action-type tag, e.g. `read`, `write`, `transfer`.
    pub action_type: String,
    pub target: String,
    /// Opaque parameters. Scorers only read well-known keys.
    pub params: BTreeMap<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl Action {
    pub fn new(
        agent_id: impl Into<AgentId>,
        action_type: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::builder(agent_id, action_type, target).build()
    }

    pub fn builder(
        agent_id: impl Into<AgentId>,
        action_type: impl Into<String>,
        target: impl Into<String>,
    ) -> ActionBuilder {
        ActionBuilder {
            agent_id: agent_id.into(),
            action_type: action_type.into(),
            target: target.into(),
            params: BTreeMap::new(),
            created_at: None,
        }
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn param_f64(&self, key: &str) -> Option<f64> {
        self.params.get(key).and_then(Value::as_f64)
    }

    pub fn param_bool(&self, key: &str) -> Option<bool> {
        self.params.get(key).and_then(Value::as_bool)
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }
}

/// Builder for [`Action`].
pub struct ActionBuilder {
    agent_id: AgentId,
    action_type: String,
    target: String,
    params: BTreeMap<String, Value>,
    created_at: Option<DateTime<Utc>>,
}

impl ActionBuilder {
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    pub fn build(self) -> Action {
        Action {
            id: ActionId::new(),
            agent_id: self.agent_id,
            action_type: self.action_type,
            target: self.target,
            params: self.params,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        }
    }
}
