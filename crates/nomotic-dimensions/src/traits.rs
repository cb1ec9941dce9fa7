use async_trait::async_trait;
use nomotic_types::{Action, AgentContext, DimensionId, DimensionResult, ScopeDefinition};

use crate::error::ScorerFault;

/// One concern axis.
///
/// Implementations are stateless with respect to an evaluation: everything
/// they need arrives through the arguments. A scorer may propose a veto; the
/// evaluator decides whether the dimension is allowed to cast it.
#[async_trait]
pub trait DimensionScorer: Send + Sync {
    fn dimension(&self) -> DimensionId;

    async fn score(
        &self,
        action: &Action,
        context: &AgentContext,
        scope: &ScopeDefinition,
    ) -> Result<DimensionResult, ScorerFault>;
}

/// A known-bad pattern matched by an incident lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct IncidentMatch {
    pub pattern: String,
    /// 0.0 (benign) to 1.0 (certain incident).
    pub severity: f64,
}

/// External incident-pattern lookup consumed by the incident detection scorer.
///
/// Lookups may be slow or remote; the evaluator's per-scorer deadline bounds
/// them and a miss of that deadline fails closed.
#[async_trait]
pub trait IncidentFeed: Send + Sync {
    async fn lookup(&self, action: &Action) -> Result<Option<IncidentMatch>, ScorerFault>;
}
