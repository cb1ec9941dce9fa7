use async_trait::async_trait;
use nomotic_types::{Action, AgentContext, DimensionId, DimensionResult, ScopeDefinition};

use crate::error::ScorerFault;
use crate::traits::DimensionScorer;

/// Fraction of a limit that may be used with no concern at all.
const COMFORT_RATIO: f64 = 0.5;

/// Numeric parameters stay within the scope's resource limits.
///
/// Usage above half a limit lowers the score linearly (0.2 at the limit);
/// exceeding a limit is a veto. A limited parameter that is present but not
/// numeric cannot be checked and faults, as does a limit that is not a
/// positive number.
pub struct ResourceBoundariesScorer;

#[async_trait]
impl DimensionScorer for ResourceBoundariesScorer {
    fn dimension(&self) -> DimensionId {
        DimensionId::ResourceBoundaries
    }

    async fn score(
        &self,
        action: &Action,
        _context: &AgentContext,
        scope: &ScopeDefinition,
    ) -> Result<DimensionResult, ScorerFault> {
        let mut worst: Option<(&str, f64)> = None;

        for (param, limit) in &scope.resource_limits {
            let Some(raw) = action.param(param) else {
                continue;
            };
            if !limit.is_finite() || *limit <= 0.0 {
                return Err(ScorerFault::Internal(format!(
                    "limit for '{param}' is not a positive number: {limit}"
                )));
            }
            let value = raw.as_f64().ok_or_else(|| {
                ScorerFault::Internal(format!("parameter '{param}' is limited but not numeric"))
            })?;
            if value > *limit {
                return Ok(DimensionResult::veto(
                    self.dimension(),
                    format!("'{param}' = {value} exceeds limit {limit}"),
                ));
            }
            let ratio = value / limit;
            if worst.map_or(true, |(_, w)| ratio > w) {
                worst = Some((param.as_str(), ratio));
            }
        }

        match worst {
            Some((param, ratio)) if ratio > COMFORT_RATIO => Ok(DimensionResult::concern(
                self.dimension(),
                1.0 - (ratio - COMFORT_RATIO) * 1.6,
                format!("'{param}' uses {:.0}% of its limit", ratio * 100.0),
            )),
            _ => Ok(DimensionResult::pass(self.dimension())),
        }
    }
}
