use async_trait::async_trait;
use nomotic_types::{Action, AgentContext, DimensionId, DimensionResult, ScopeDefinition};
use serde_json::Value;

use crate::error::ScorerFault;
use crate::traits::DimensionScorer;

/// Action type fragments that are unacceptable regardless of scope.
const PROHIBITED: &[&str] = &["deceive", "manipulate", "coerce", "impersonate", "surveil"];

/// Whether the action is explainable: where it came from and why.
pub struct TransparencyScorer;

#[async_trait]
impl DimensionScorer for TransparencyScorer {
    fn dimension(&self) -> DimensionId {
        DimensionId::Transparency
    }

    async fn score(
        &self,
        action: &Action,
        context: &AgentContext,
        _scope: &ScopeDefinition,
    ) -> Result<DimensionResult, ScorerFault> {
        let mut missing = Vec::new();
        if context.origin.is_none() {
            missing.push("origin");
        }
        let justified = ["justification", "reason"]
            .iter()
            .any(|k| action.param_str(k).is_some_and(|s| !s.trim().is_empty()));
        if !justified {
            missing.push("justification");
        }

        if missing.is_empty() {
            Ok(DimensionResult::pass(self.dimension()))
        } else {
            Ok(DimensionResult::concern(
                self.dimension(),
                1.0 - 0.2 * missing.len() as f64,
                format!("missing {}", missing.join(", ")),
            ))
        }
    }
}

/// Routes actions to a human when review is required or explicitly requested.
///
/// Its veto is configured to escalate rather than deny.
pub struct HumanOverrideScorer;

#[async_trait]
impl DimensionScorer for HumanOverrideScorer {
    fn dimension(&self) -> DimensionId {
        DimensionId::HumanOverride
    }

    async fn score(
        &self,
        action: &Action,
        context: &AgentContext,
        scope: &ScopeDefinition,
    ) -> Result<DimensionResult, ScorerFault> {
        if scope.review_required.contains(&action.action_type) {
            return Ok(DimensionResult::veto(
                self.dimension(),
                format!("'{}' requires human review", action.action_type),
            ));
        }
        let requested = action.param_bool("human_override") == Some(true)
            || context
                .metadata
                .get("human_override")
                .is_some_and(|v| v == "requested");
        if requested {
            return Ok(DimensionResult::veto(
                self.dimension(),
                "human review requested",
            ));
        }
        Ok(DimensionResult::pass(self.dimension()))
    }
}

pub struct EthicalAlignmentScorer;

#[async_trait]
impl DimensionScorer for EthicalAlignmentScorer {
    fn dimension(&self) -> DimensionId {
        DimensionId::EthicalAlignment
    }

    async fn score(
        &self,
        action: &Action,
        _context: &AgentContext,
        _scope: &ScopeDefinition,
    ) -> Result<DimensionResult, ScorerFault> {
        let lowered = action.action_type.to_ascii_lowercase();
        if let Some(hit) = PROHIBITED.iter().find(|p| lowered.contains(*p)) {
            return Ok(DimensionResult::veto(
                self.dimension(),
                format!("action type matches prohibited behavior '{hit}'"),
            ));
        }
        if let Some(Value::Array(flags)) = action.param("ethical_flags") {
            if !flags.is_empty() {
                let names: Vec<String> = flags
                    .iter()
                    .map(|f| f.as_str().map(str::to_string).unwrap_or_else(|| f.to_string()))
                    .collect();
                return Ok(DimensionResult::veto(
                    self.dimension(),
                    format!("flagged: {}", names.join(", ")),
                ));
            }
        }
        Ok(DimensionResult::pass(self.dimension()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorers::testing::context;
    use serde_json::json;

    #[tokio::test]
    async fn transparency_counts_missing_items() {
        let scope = ScopeDefinition::empty();
        let bare = Action::new("ops", "read", "docs");
        let r = TransparencyScorer.score(&bare, &context("ops"), &scope).await.unwrap();
        assert!((r.score - 0.6).abs() < 1e-9);

        let explained = Action::builder("ops", "read", "docs")
            .param("justification", "weekly report")
            .build();
        let ctx = context("ops").with_origin("scheduler");
        let r = TransparencyScorer.score(&explained, &ctx, &scope).await.unwrap();
        assert_eq!(r.score, 1.0);
    }

    #[tokio::test]
    async fn review_required_vetoes() {
        let scope = ScopeDefinition::with_actions(["refund"]).review("refund");
        let action = Action::new("ops", "refund", "orders");
        let r = HumanOverrideScorer.score(&action, &context("ops"), &scope).await.unwrap();
        assert!(r.veto);
    }

    #[tokio::test]
    async fn override_requested_through_metadata() {
        let scope = ScopeDefinition::with_actions(["read"]);
        let action = Action::new("ops", "read", "docs");
        let ctx = context("ops").with_metadata("human_override", "requested");
        let r = HumanOverrideScorer.score(&action, &ctx, &scope).await.unwrap();
        assert!(r.veto);

        let plain = HumanOverrideScorer.score(&action, &context("ops"), &scope).await.unwrap();
        assert!(!plain.veto);
    }

    #[tokio::test]
    async fn ethical_flags_veto() {
        let scope = ScopeDefinition::empty();
        let flagged = Action::builder("ops", "send", "inbox")
            .param("ethical_flags", json!(["dark_pattern"]))
            .build();
        let r = EthicalAlignmentScorer.score(&flagged, &context("ops"), &scope).await.unwrap();
        assert!(r.veto);
        assert!(r.rationale.unwrap().contains("dark_pattern"));

        let empty_flags = Action::builder("ops", "send", "inbox")
            .param("ethical_flags", json!([]))
            .build();
        let r = EthicalAlignmentScorer.score(&empty_flags, &context("ops"), &scope).await.unwrap();
        assert!(!r.veto);

        let prohibited = Action::new("ops", "impersonate_user", "inbox");
        let r = EthicalAlignmentScorer.score(&prohibited, &context("ops"), &scope).await.unwrap();
        assert!(r.veto);
    }
}
