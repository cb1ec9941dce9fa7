use std::sync::Arc;

use async_trait::async_trait;
use nomotic_types::{Action, AgentContext, DimensionId, DimensionResult, ScopeDefinition};
use serde_json::Value;
use tracing::debug;

use crate::error::ScorerFault;
use crate::traits::{DimensionScorer, IncidentFeed, IncidentMatch};

/// Severity at or above which a match is a veto rather than a concern.
pub const VETO_SEVERITY: f64 = 0.8;

/// In-process feed of substring patterns matched against the action type,
/// the target and every string parameter.
pub struct StaticIncidentFeed {
    patterns: Vec<(String, f64)>,
}

impl StaticIncidentFeed {
    pub fn new() -> Self {
        Self { patterns: Vec::new() }
    }

    pub fn pattern(mut self, pattern: impl Into<String>, severity: f64) -> Self {
        self.patterns
            .push((pattern.into().to_ascii_lowercase(), severity));
        self
    }

    fn haystacks(action: &Action) -> Vec<String> {
        let mut out = vec![
            action.action_type.to_ascii_lowercase(),
            action.target.to_ascii_lowercase(),
        ];
        out.extend(action.params.values().filter_map(|v| match v {
            Value::String(s) => Some(s.to_ascii_lowercase()),
            _ => None,
        }));
        out
    }
}

impl Default for StaticIncidentFeed {
    /// Injection and traversal shapes seen in adversarial agent traffic.
    fn default() -> Self {
        Self::new()
            .pattern("rm -rf", 1.0)
            .pattern("drop table", 1.0)
            .pattern("; --", 0.9)
            .pattern("../", 0.85)
            .pattern("ignore previous instructions", 0.9)
            .pattern("sudo ", 0.6)
    }
}

#[async_trait]
impl IncidentFeed for StaticIncidentFeed {
    async fn lookup(&self, action: &Action) -> Result<Option<IncidentMatch>, ScorerFault> {
        let haystacks = Self::haystacks(action);
        let hit = self
            .patterns
            .iter()
            .filter(|(p, _)| haystacks.iter().any(|h| h.contains(p.as_str())))
            .max_by(|a, b| a.1.total_cmp(&b.1));
        Ok(hit.map(|(pattern, severity)| IncidentMatch {
            pattern: pattern.clone(),
            severity: *severity,
        }))
    }
}

/// Matches the action against known incident patterns through an
/// [`IncidentFeed`].
pub struct IncidentDetectionScorer {
    feed: Arc<dyn IncidentFeed>,
}

impl IncidentDetectionScorer {
    pub fn new(feed: Arc<dyn IncidentFeed>) -> Self {
        Self { feed }
    }
}

impl Default for IncidentDetectionScorer {
    fn default() -> Self {
        Self::new(Arc::new(StaticIncidentFeed::default()))
    }
}

#[async_trait]
impl DimensionScorer for IncidentDetectionScorer {
    fn dimension(&self) -> DimensionId {
        DimensionId::IncidentDetection
    }

    async fn score(
        &self,
        action: &Action,
        _context: &AgentContext,
        _scope: &ScopeDefinition,
    ) -> Result<DimensionResult, ScorerFault> {
        match self.feed.lookup(action).await? {
            None => Ok(DimensionResult::pass(self.dimension())),
            Some(m) => {
                debug!(action_id = %action.id, pattern = %m.pattern, severity = m.severity, "Incident pattern matched");
                if m.severity >= VETO_SEVERITY {
                    Ok(DimensionResult::veto(
                        self.dimension(),
                        format!("matches incident pattern '{}'", m.pattern),
                    ))
                } else {
                    Ok(DimensionResult::concern(
                        self.dimension(),
                        1.0 - m.severity,
                        format!("resembles incident pattern '{}'", m.pattern),
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorers::testing::context;

    struct RefusingFeed;

    #[async_trait]
    impl IncidentFeed for RefusingFeed {
        async fn lookup(&self, _action: &Action) -> Result<Option<IncidentMatch>, ScorerFault> {
            Err(ScorerFault::Internal("feed unavailable".into()))
        }
    }

    async fn run(scorer: &IncidentDetectionScorer, action: Action) -> Result<DimensionResult, ScorerFault> {
        scorer
            .score(&action, &context("ops"), &ScopeDefinition::empty())
            .await
    }

    #[tokio::test]
    async fn clean_action_passes() {
        let r = run(&IncidentDetectionScorer::default(), Action::new("ops", "read", "docs"))
            .await
            .unwrap();
        assert_eq!(r.score, 1.0);
    }

    #[tokio::test]
    async fn injection_in_params_vetoes() {
        let action = Action::builder("ops", "query", "orders")
            .param("sql", "SELECT 1; DROP TABLE orders")
            .build();
        let r = run(&IncidentDetectionScorer::default(), action).await.unwrap();
        assert!(r.veto);
        assert!(r.rationale.unwrap().contains("drop table"));
    }

    #[tokio::test]
    async fn low_severity_match_is_concern() {
        let action = Action::builder("ops", "shell", "host")
            .param("cmd", "sudo systemctl status")
            .build();
        let r = run(&IncidentDetectionScorer::default(), action).await.unwrap();
        assert!(!r.veto);
        assert!((r.score - 0.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn feed_error_propagates_as_fault() {
        let scorer = IncidentDetectionScorer::new(Arc::new(RefusingFeed));
        let result = run(&scorer, Action::new("ops", "read", "docs")).await;
        assert!(matches!(result, Err(ScorerFault::Internal(_))));
    }
}
