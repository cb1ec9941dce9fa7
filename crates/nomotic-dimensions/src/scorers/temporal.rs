use async_trait::async_trait;
use chrono::Timelike;
use nomotic_types::{
    Action, AgentContext, DimensionId, DimensionResult, ScopeDefinition, Urgency,
};

use crate::error::ScorerFault;
use crate::traits::DimensionScorer;

/// Timing of the action against the scope's active hours window (UTC).
///
/// Windows where `start > end` wrap past midnight. Critical urgency is
/// treated as a mild timing concern of its own since it tends to bypass
/// normal scheduling.
pub struct TemporalComplianceScorer;

fn within(hour: u32, (start, end): (u32, u32)) -> bool {
    if start <= end {
        hour >= start && hour < end
    } else {
        hour >= start || hour < end
    }
}

#[async_trait]
impl DimensionScorer for TemporalComplianceScorer {
    fn dimension(&self) -> DimensionId {
        DimensionId::TemporalCompliance
    }

    async fn score(
        &self,
        action: &Action,
        context: &AgentContext,
        scope: &ScopeDefinition,
    ) -> Result<DimensionResult, ScorerFault> {
        let mut score = 1.0;
        let mut reasons = Vec::new();

        if let Some(window) = scope.active_hours {
            let hour = action.created_at.hour();
            if !within(hour, window) {
                score = 0.3;
                reasons.push(format!(
                    "submitted at {hour:02}:00 outside active hours {:02}-{:02}",
                    window.0, window.1
                ));
            }
        }
        if context.urgency == Some(Urgency::Critical) {
            score *= 0.8;
            reasons.push("critical urgency".to_string());
        }

        if reasons.is_empty() {
            Ok(DimensionResult::pass(self.dimension()))
        } else {
            Ok(DimensionResult::concern(self.dimension(), score, reasons.join("; ")))
        }
    }
}
