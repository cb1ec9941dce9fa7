//! Typed governance configuration.
//!
//! An external loader parses and lints configuration files; the engine only
//! receives these structs. [`GovernanceConfig::validate`] is the last line of
//! defence and collects every problem it finds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::context::ScopeDefinition;
use crate::dimension::DimensionId;
use crate::error::ConfigError;
use crate::ids::AgentId;

/// Per-dimension weight and veto behaviour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DimensionConfig {
    pub weight: f64,
    #[serde(default)]
    pub veto_capable: bool,
    /// A veto from this dimension escalates to a human instead of denying.
    #[serde(default)]
    pub escalate_on_veto: bool,
}

impl DimensionConfig {
    pub fn default_for(dimension: DimensionId) -> Self {
        let veto_capable = matches!(
            dimension,
            DimensionId::ScopeCompliance
                | DimensionId::AuthorityVerification
                | DimensionId::ResourceBoundaries
                | DimensionId::IncidentDetection
                | DimensionId::IsolationIntegrity
                | DimensionId::HumanOverride
                | DimensionId::EthicalAlignment
        );
        Self {
            weight: 1.0,
            veto_capable,
            escalate_on_veto: dimension == DimensionId::HumanOverride,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub allow: f64,
    pub deny: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            allow: 0.7,
            deny: 0.3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustSettings {
    pub initial: f64,
    pub success_increment: f64,
    pub violation_decrement: f64,
    pub interrupt_cost: f64,
    /// Drift toward `baseline` per idle hour past `decay_window_secs`.
    pub decay_rate: f64,
    pub decay_window_secs: u64,
    pub baseline: f64,
    pub floor: f64,
    pub ceiling: f64,
    pub minimum_for_action: f64,
    /// Verdicts kept per agent for deliberation.
    pub history_window: usize,
}

impl TrustSettings {
    pub fn decay_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.decay_window_secs).unwrap_or(i64::MAX))
    }

    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            self.floor
        } else {
            value.clamp(self.floor, self.ceiling)
        }
    }
}

impl Default for TrustSettings {
    fn default() -> Self {
        Self {
            initial: 0.5,
            success_increment: 0.01,
            violation_decrement: 0.05,
            interrupt_cost: 0.03,
            decay_rate: 0.01,
            decay_window_secs: 24 * 60 * 60,
            baseline: 0.5,
            floor: 0.0,
            ceiling: 1.0,
            minimum_for_action: 0.3,
            history_window: 20,
        }
    }
}

/// Trust-to-UCS scaling. Linear below the midpoint; `trust_scaling_strength`
/// interpolates between no scaling (0.0) and full linear scaling (1.0).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationSettings {
    pub trust_midpoint: f64,
    pub trust_scaling_strength: f64,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            trust_midpoint: 0.5,
            trust_scaling_strength: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliberationSettings {
    /// Non-vetoing dimensions scoring below this are "low".
    pub low_score_threshold: f64,
    /// DENY once this many denials sit in the agent's recent history.
    pub max_recent_denials: usize,
    /// ALLOW from the ambiguous band only at or above this trust, with no low
    /// dimensions and a clean history.
    pub trusted_allow_floor: f64,
}

impl Default for DeliberationSettings {
    fn default() -> Self {
        Self {
            low_score_threshold: 0.5,
            max_recent_denials: 3,
            trusted_allow_floor: 0.9,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationSettings {
    /// Deadline for any single scorer, including its external lookups.
    pub scorer_timeout_ms: u64,
}

impl EvaluationSettings {
    pub fn scorer_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.scorer_timeout_ms)
    }
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            scorer_timeout_ms: 250,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSettings {
    /// How long an ALLOW verdict may wait for `begin_execution`.
    pub approval_ttl_secs: u64,
    /// Terminal execution handles remembered for status lookups.
    pub retained_terminal: usize,
}

impl ExecutionSettings {
    pub fn approval_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.approval_ttl_secs).unwrap_or(i64::MAX))
    }
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            approval_ttl_secs: 3600,
            retained_terminal: 4096,
        }
    }
}

/// One governed agent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub scope: ScopeDefinition,
    pub initial_trust: Option<f64>,
    pub minimum_for_action: Option<f64>,
    pub owner: String,
    pub reason: String,
}

impl AgentConfig {
    pub fn new(scope: ScopeDefinition) -> Self {
        Self {
            scope,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Overrides; dimensions not listed use [`DimensionConfig::default_for`].
    pub dimensions: BTreeMap<DimensionId, DimensionConfig>,
    pub thresholds: Thresholds,
    pub trust: TrustSettings,
    pub aggregation: AggregationSettings,
    pub deliberation: DeliberationSettings,
    pub evaluation: EvaluationSettings,
    pub execution: ExecutionSettings,
    pub agents: BTreeMap<AgentId, AgentConfig>,
}

impl GovernanceConfig {
    pub fn with_thresholds(mut self, allow: f64, deny: f64) -> Self {
        self.thresholds = Thresholds { allow, deny };
        self
    }

    pub fn with_dimension(mut self, id: DimensionId, config: DimensionConfig) -> Self {
        self.dimensions.insert(id, config);
        self
    }

    pub fn with_agent(mut self, id: impl Into<AgentId>, agent: AgentConfig) -> Self {
        self.agents.insert(id.into(), agent);
        self
    }

    pub fn dimension(&self, id: DimensionId) -> DimensionConfig {
        self.dimensions
            .get(&id)
            .cloned()
            .unwrap_or_else(|| DimensionConfig::default_for(id))
    }

    pub fn weight(&self, id: DimensionId) -> f64 {
        self.dimension(id).weight
    }

    pub fn is_veto_capable(&self, id: DimensionId) -> bool {
        self.dimension(id).veto_capable
    }

    pub fn escalates_on_veto(&self, id: DimensionId) -> bool {
        self.dimension(id).escalate_on_veto
    }

    pub fn total_weight(&self) -> f64 {
        DimensionId::ALL.iter().map(|d| self.weight(*d)).sum()
    }

    pub fn agent(&self, id: &AgentId) -> Option<&AgentConfig> {
        self.agents.get(id)
    }

    /// Trust an agent starts with: its own override, else the global initial.
    pub fn initial_trust(&self, id: &AgentId) -> f64 {
        self.agent(id)
            .and_then(|a| a.initial_trust)
            .unwrap_or(self.trust.initial)
    }

    pub fn minimum_for_action(&self, id: &AgentId) -> f64 {
        self.agent(id)
            .and_then(|a| a.minimum_for_action)
            .unwrap_or(self.trust.minimum_for_action)
    }

    /// Check every invariant the engine relies on, reporting all failures.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        let t = &self.thresholds;
        check_unit(&mut errors, "thresholds.allow", t.allow);
        check_unit(&mut errors, "thresholds.deny", t.deny);
        if t.allow <= t.deny {
            errors.push(format!(
                "thresholds.allow ({}) must be greater than thresholds.deny ({})",
                t.allow, t.deny
            ));
        }

        for (id, dim) in &self.dimensions {
            if !dim.weight.is_finite() || dim.weight <= 0.0 {
                errors.push(format!(
                    "dimensions.{id}.weight must be a positive number, got {}",
                    dim.weight
                ));
            }
            if dim.escalate_on_veto && !dim.veto_capable {
                errors.push(format!(
                    "dimensions.{id} escalates on veto but is not veto-capable"
                ));
            }
        }
        let total = self.total_weight();
        if !(total.is_finite() && total > 0.0) {
            errors.push(format!("total dimension weight must be positive, got {total}"));
        }

        let trust = &self.trust;
        check_unit(&mut errors, "trust.floor", trust.floor);
        check_unit(&mut errors, "trust.ceiling", trust.ceiling);
        if trust.floor > trust.ceiling {
            errors.push(format!(
                "trust.floor ({}) must not exceed trust.ceiling ({})",
                trust.floor, trust.ceiling
            ));
        }
        for (name, value) in [
            ("trust.initial", trust.initial),
            ("trust.baseline", trust.baseline),
            ("trust.minimum_for_action", trust.minimum_for_action),
        ] {
            check_bounded(&mut errors, name, value, trust.floor, trust.ceiling);
        }
        for (name, value) in [
            ("trust.success_increment", trust.success_increment),
            ("trust.violation_decrement", trust.violation_decrement),
            ("trust.interrupt_cost", trust.interrupt_cost),
            ("trust.decay_rate", trust.decay_rate),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(format!("{name} must be non-negative, got {value}"));
            }
        }
        if trust.history_window == 0 {
            errors.push("trust.history_window must be at least 1".to_string());
        }

        let agg = &self.aggregation;
        if !(agg.trust_midpoint.is_finite() && agg.trust_midpoint > 0.0 && agg.trust_midpoint <= 1.0)
        {
            errors.push(format!(
                "aggregation.trust_midpoint must be in (0.0, 1.0], got {}",
                agg.trust_midpoint
            ));
        }
        check_unit(
            &mut errors,
            "aggregation.trust_scaling_strength",
            agg.trust_scaling_strength,
        );

        check_unit(
            &mut errors,
            "deliberation.low_score_threshold",
            self.deliberation.low_score_threshold,
        );
        check_unit(
            &mut errors,
            "deliberation.trusted_allow_floor",
            self.deliberation.trusted_allow_floor,
        );

        if self.evaluation.scorer_timeout_ms == 0 {
            errors.push("evaluation.scorer_timeout_ms must be at least 1".to_string());
        }
        if self.execution.approval_ttl_secs == 0 {
            errors.push("execution.approval_ttl_secs must be at least 1".to_string());
        }
        if self.execution.retained_terminal == 0 {
            errors.push("execution.retained_terminal must be at least 1".to_string());
        }

        for (id, agent) in &self.agents {
            if let Some(initial) = agent.initial_trust {
                check_bounded(
                    &mut errors,
                    &format!("agents.{id}.initial_trust"),
                    initial,
                    trust.floor,
                    trust.ceiling,
                );
            }
            if let Some(minimum) = agent.minimum_for_action {
                check_bounded(
                    &mut errors,
                    &format!("agents.{id}.minimum_for_action"),
                    minimum,
                    trust.floor,
                    trust.ceiling,
                );
            }
            errors.extend(
                agent
                    .scope
                    .problems()
                    .into_iter()
                    .map(|problem| format!("agents.{id}.scope.{problem}")),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}

fn check_unit(errors: &mut Vec<String>, name: &str, value: f64) {
    check_bounded(errors, name, value, 0.0, 1.0);
}

fn check_bounded(errors: &mut Vec<String>, name: &str, value: f64, lo: f64, hi: f64) {
    if !value.is_finite() || value < lo || value > hi {
        errors.push(format!("{name} must be between {lo} and {hi}, got {value}"));
    }
}
