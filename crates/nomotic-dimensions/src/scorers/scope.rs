use async_trait::async_trait;
use nomotic_types::{Action, AgentContext, DimensionId, DimensionResult, ScopeDefinition};

use crate::error::ScorerFault;
use crate::traits::DimensionScorer;

/// Action type must be one the agent is configured for. An agent without a
/// scope definition has zero scope.
pub struct ScopeComplianceScorer;

#[async_trait]
impl DimensionScorer for ScopeComplianceScorer {
    fn dimension(&self) -> DimensionId {
        DimensionId::ScopeCompliance
    }

    async fn score(
        &self,
        action: &Action,
        _context: &AgentContext,
        scope: &ScopeDefinition,
    ) -> Result<DimensionResult, ScorerFault> {
        if scope.is_empty() {
            return Ok(DimensionResult::veto(
                self.dimension(),
                format!("agent '{}' has no configured scope", action.agent_id),
            ));
        }
        if !scope.permits_action(&action.action_type) {
            return Ok(DimensionResult::veto(
                self.dimension(),
                format!(
                    "action type '{}' is outside the scope of agent '{}'",
                    action.action_type, action.agent_id
                ),
            ));
        }
        Ok(DimensionResult::pass(self.dimension()))
    }
}

/// The action must be submitted by the agent it names, and that agent must
/// have authority on record.
pub struct AuthorityVerificationScorer;

#[async_trait]
impl DimensionScorer for AuthorityVerificationScorer {
    fn dimension(&self) -> DimensionId {
        DimensionId::AuthorityVerification
    }

    async fn score(
        &self,
        action: &Action,
        context: &AgentContext,
        scope: &ScopeDefinition,
    ) -> Result<DimensionResult, ScorerFault> {
        if action.agent_id != context.agent_id {
            return Ok(DimensionResult::veto(
                self.dimension(),
                format!(
                    "action names agent '{}' but was submitted as '{}'",
                    action.agent_id, context.agent_id
                ),
            ));
        }
        if scope.is_empty() {
            return Ok(DimensionResult::veto(
                self.dimension(),
                format!("no authority on record for agent '{}'", action.agent_id),
            ));
        }
        if let Some(principal) = action.param_str("on_behalf_of") {
            return Ok(DimensionResult::concern(
                self.dimension(),
                0.6,
                format!("acting under delegated authority of '{principal}'"),
            ));
        }
        Ok(DimensionResult::pass(self.dimension()))
    }
}

/// Target must be one the agent owns or a declared boundary target.
pub struct IsolationIntegrityScorer;

#[async_trait]
impl DimensionScorer for IsolationIntegrityScorer {
    fn dimension(&self) -> DimensionId {
        DimensionId::IsolationIntegrity
    }

    async fn score(
        &self,
        action: &Action,
        _context: &AgentContext,
        scope: &ScopeDefinition,
    ) -> Result<DimensionResult, ScorerFault> {
        if !scope.permits_target(&action.target) {
            return Ok(DimensionResult::veto(
                self.dimension(),
                format!(
                    "target '{}' is outside the boundaries of agent '{}'",
                    action.target, action.agent_id
                ),
            ));
        }
        Ok(DimensionResult::pass(self.dimension()))
    }
}
