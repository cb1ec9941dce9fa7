use async_trait::async_trait;
use nomotic_types::{Action, AgentContext, DimensionId, DimensionResult, ScopeDefinition};

use crate::error::ScorerFault;
use crate::traits::DimensionScorer;

/// Action types whose effects are hard to undo or spread beyond the target.
const DESTRUCTIVE: &[&str] = &[
    "delete", "drop", "destroy", "transfer", "execute", "deploy", "admin", "approve",
];

/// Target fragments that indicate people are directly affected.
const PEOPLE_TARGETS: &[&str] = &["customer", "user", "patient"];

fn is_destructive(action_type: &str) -> bool {
    let lowered = action_type.to_ascii_lowercase();
    DESTRUCTIVE.iter().any(|d| lowered.contains(d))
}

/// Downstream blast radius of the action.
pub struct CascadingImpactScorer;

#[async_trait]
impl DimensionScorer for CascadingImpactScorer {
    fn dimension(&self) -> DimensionId {
        DimensionId::CascadingImpact
    }

    async fn score(
        &self,
        action: &Action,
        _context: &AgentContext,
        _scope: &ScopeDefinition,
    ) -> Result<DimensionResult, ScorerFault> {
        let mut score = 1.0;
        let mut reasons = Vec::new();

        if is_destructive(&action.action_type) {
            score = 0.6;
            reasons.push(format!("'{}' is not easily reversible", action.action_type));
        }

        let fanout = action
            .param_f64("affected_count")
            .or_else(|| action.param_f64("batch_size"))
            .unwrap_or(0.0);
        if fanout > 1000.0 {
            score *= 0.5;
            reasons.push(format!("affects {fanout} items"));
        } else if fanout > 100.0 {
            score *= 0.75;
            reasons.push(format!("affects {fanout} items"));
        }

        if action.param_bool("recursive") == Some(true) {
            score *= 0.8;
            reasons.push("recursive".to_string());
        }

        if reasons.is_empty() {
            Ok(DimensionResult::pass(self.dimension()))
        } else {
            Ok(DimensionResult::concern(self.dimension(), score, reasons.join("; ")))
        }
    }
}

/// Effect on parties outside the agent's own domain.
pub struct StakeholderImpactScorer;

#[async_trait]
impl DimensionScorer for StakeholderImpactScorer {
    fn dimension(&self) -> DimensionId {
        DimensionId::StakeholderImpact
    }

    async fn score(
        &self,
        action: &Action,
        _context: &AgentContext,
        _scope: &ScopeDefinition,
    ) -> Result<DimensionResult, ScorerFault> {
        let mut candidates: Vec<(f64, String)> = Vec::new();

        if action.param_bool("external") == Some(true) {
            candidates.push((0.6, "reaches external parties".into()));
        }
        if let Some(recipients) = action.param_f64("recipients") {
            if recipients > 50.0 {
                candidates.push((0.5, format!("{recipients} recipients")));
            }
        }
        let target = action.target.to_ascii_lowercase();
        if let Some(hit) = PEOPLE_TARGETS.iter().find(|p| target.contains(*p)) {
            candidates.push((0.7, format!("target concerns {hit} data")));
        }

        let worst = candidates
            .into_iter()
            .min_by(|a, b| a.0.total_cmp(&b.0));
        match worst {
            Some((score, rationale)) => {
                Ok(DimensionResult::concern(self.dimension(), score, rationale))
            }
            None => Ok(DimensionResult::pass(self.dimension())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorers::testing::context;

    async fn cascading(action: Action) -> DimensionResult {
        CascadingImpactScorer
            .score(&action, &context("ops"), &ScopeDefinition::empty())
            .await
            .unwrap()
    }

    async fn stakeholder(action: Action) -> DimensionResult {
        StakeholderImpactScorer
            .score(&action, &context("ops"), &ScopeDefinition::empty())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn reads_have_no_blast_radius() {
        assert_eq!(cascading(Action::new("ops", "read", "docs")).await.score, 1.0);
    }

    #[tokio::test]
    async fn destructive_bulk_actions_compound() {
        let single = cascading(Action::new("ops", "delete", "rows")).await;
        assert!((single.score - 0.6).abs() < 1e-9);

        let bulk = cascading(
            Action::builder("ops", "delete", "rows")
                .param("affected_count", 5000)
                .param("recursive", true)
                .build(),
        )
        .await;
        assert!((bulk.score - 0.24).abs() < 1e-9);
        assert!(!bulk.veto);
    }

    #[tokio::test]
    async fn stakeholder_takes_worst_signal() {
        let r = stakeholder(
            Action::builder("ops", "notify", "customer_list")
                .param("recipients", 200)
                .build(),
        )
        .await;
        assert_eq!(r.score, 0.5);

        let internal = stakeholder(Action::new("ops", "read", "metrics")).await;
        assert_eq!(internal.score, 1.0);
    }
}
