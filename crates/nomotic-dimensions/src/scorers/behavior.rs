//! Scorers that read the agent's verdict history.

use async_trait::async_trait;
use nomotic_types::{
    Action, AgentContext, DimensionId, DimensionResult, ScopeDefinition, VerdictKind,
};

use crate::error::ScorerFault;
use crate::traits::DimensionScorer;

/// Similarity of this action to the agent's recent pattern.
///
/// A fresh agent is slightly uncertain, a never-seen action type more so,
/// and a history dominated by denials drags everything down.
pub struct BehavioralConsistencyScorer;

#[async_trait]
impl DimensionScorer for BehavioralConsistencyScorer {
    fn dimension(&self) -> DimensionId {
        DimensionId::BehavioralConsistency
    }

    async fn score(
        &self,
        action: &Action,
        context: &AgentContext,
        _scope: &ScopeDefinition,
    ) -> Result<DimensionResult, ScorerFault> {
        let history = &context.trust.history;
        if history.is_empty() {
            return Ok(DimensionResult::concern(
                self.dimension(),
                0.8,
                "no behavioral history yet",
            ));
        }

        let denials = history
            .iter()
            .filter(|r| r.verdict == VerdictKind::Deny)
            .count();
        let deny_ratio = denials as f64 / history.len() as f64;
        let novel = !context.trust.has_seen(&action.action_type);

        let base = if novel { 0.6 } else { 1.0 };
        let score = base * (1.0 - 0.5 * deny_ratio);

        if score >= 1.0 {
            return Ok(DimensionResult::pass(self.dimension()));
        }
        let rationale = match (novel, denials) {
            (true, 0) => format!("'{}' is new for this agent", action.action_type),
            (true, n) => format!(
                "'{}' is new for this agent; {n} recent denial(s)",
                action.action_type
            ),
            (false, n) => format!("{n} of the last {} verdicts were denials", history.len()),
        };
        Ok(DimensionResult::concern(self.dimension(), score, rationale))
    }
}

/// Agreement with how similar actions by this agent were decided before.
pub struct PrecedentAlignmentScorer;

#[async_trait]
impl DimensionScorer for PrecedentAlignmentScorer {
    fn dimension(&self) -> DimensionId {
        DimensionId::PrecedentAlignment
    }

    async fn score(
        &self,
        action: &Action,
        context: &AgentContext,
        _scope: &ScopeDefinition,
    ) -> Result<DimensionResult, ScorerFault> {
        match context.trust.allow_fraction(&action.action_type) {
            None => Ok(DimensionResult::concern(
                self.dimension(),
                0.7,
                format!("no precedent for '{}'", action.action_type),
            )),
            Some(fraction) if fraction >= 1.0 => Ok(DimensionResult::pass(self.dimension())),
            Some(fraction) => Ok(DimensionResult::concern(
                self.dimension(),
                0.4 + 0.6 * fraction,
                format!(
                    "{:.0}% of prior '{}' actions were allowed",
                    fraction * 100.0,
                    action.action_type
                ),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorers::testing::context;
    use chrono::Utc;
    use nomotic_types::{Tier, VerdictRecord};

    fn with_history(entries: &[(&str, VerdictKind)]) -> AgentContext {
        let mut ctx = context("worker");
        for (action_type, verdict) in entries {
            ctx.trust.push_history(
                VerdictRecord {
                    action_type: (*action_type).into(),
                    verdict: *verdict,
                    tier: Tier::Threshold,
                    at: Utc::now(),
                },
                20,
            );
        }
        ctx
    }

    #[tokio::test]
    async fn fresh_agent_is_slightly_uncertain() {
        let action = Action::new("worker", "read", "docs");
        let r = BehavioralConsistencyScorer
            .score(&action, &context("worker"), &ScopeDefinition::empty())
            .await
            .unwrap();
        assert_eq!(r.score, 0.8);
    }

    #[tokio::test]
    async fn familiar_clean_history_passes() {
        let ctx = with_history(&[("read", VerdictKind::Allow), ("read", VerdictKind::Allow)]);
        let action = Action::new("worker", "read", "docs");
        let r = BehavioralConsistencyScorer
            .score(&action, &ctx, &ScopeDefinition::empty())
            .await
            .unwrap();
        assert_eq!(r.score, 1.0);
    }

    #[tokio::test]
    async fn denials_and_novelty_lower_consistency() {
        let ctx = with_history(&[("read", VerdictKind::Deny), ("read", VerdictKind::Allow)]);
        let action = Action::new("worker", "delete", "docs");
        let r = BehavioralConsistencyScorer
            .score(&action, &ctx, &ScopeDefinition::empty())
            .await
            .unwrap();
        assert!((r.score - 0.45).abs() < 1e-9);
    }

    #[tokio::test]
    async fn precedent_tracks_allow_fraction() {
        let ctx = with_history(&[("write", VerdictKind::Allow), ("write", VerdictKind::Deny)]);
        let scope = ScopeDefinition::empty();

        let seen = PrecedentAlignmentScorer
            .score(&Action::new("worker", "write", "docs"), &ctx, &scope)
            .await
            .unwrap();
        assert!((seen.score - 0.7).abs() < 1e-9);

        let unseen = PrecedentAlignmentScorer
            .score(&Action::new("worker", "read", "docs"), &ctx, &scope)
            .await
            .unwrap();
        assert_eq!(unseen.score, 0.7);
        assert!(unseen.rationale.unwrap().contains("no precedent"));
    }
}
