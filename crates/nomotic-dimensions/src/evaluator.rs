use std::any::Any;
use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;
use nomotic_types::{
    clamp_score, Action, AgentContext, DimensionId, DimensionResult, GovernanceConfig,
    ScopeDefinition,
};
use tracing::{debug, warn};

use crate::error::ScorerFault;
use crate::registry::DimensionRegistry;

/// Runs every registered scorer concurrently against one action.
///
/// Output always holds exactly one result per dimension, in
/// [`DimensionId::ALL`] order, independent of completion order. Any scorer
/// that errors, panics, overruns its deadline or is absent yields score 0.0
/// and, for veto-capable dimensions, a veto. Vetoes proposed by dimensions
/// that are not veto-capable are dropped.
pub struct DimensionEvaluator {
    registry: DimensionRegistry,
    veto_capable: BTreeSet<DimensionId>,
    timeout: Duration,
}

impl DimensionEvaluator {
    pub fn new(registry: DimensionRegistry, config: &GovernanceConfig) -> Self {
        let veto_capable = DimensionId::ALL
            .into_iter()
            .filter(|d| config.is_veto_capable(*d))
            .collect();
        Self {
            registry,
            veto_capable,
            timeout: config.evaluation.scorer_timeout(),
        }
    }

    pub fn registry(&self) -> &DimensionRegistry {
        &self.registry
    }

    pub async fn evaluate(
        &self,
        action: &Action,
        context: &AgentContext,
        scope: &ScopeDefinition,
    ) -> Vec<DimensionResult> {
        let pending = DimensionId::ALL
            .into_iter()
            .map(|dimension| self.score_one(dimension, action, context, scope));
        let results = join_all(pending).await;

        debug!(
            action_id = %action.id,
            faults = results.iter().filter(|r| r.is_fault()).count(),
            vetoes = results.iter().filter(|r| r.veto).count(),
            "Dimensions scored"
        );
        results
    }

    async fn score_one(
        &self,
        dimension: DimensionId,
        action: &Action,
        context: &AgentContext,
        scope: &ScopeDefinition,
    ) -> DimensionResult {
        let veto_capable = self.veto_capable.contains(&dimension);

        let outcome = match self.registry.get(dimension) {
            None => Err(ScorerFault::Missing),
            Some(scorer) => {
                let guarded = AssertUnwindSafe(scorer.score(action, context, scope)).catch_unwind();
                match tokio::time::timeout(self.timeout, guarded).await {
                    Err(_) => Err(ScorerFault::TimedOut(self.timeout)),
                    Ok(Err(payload)) => Err(ScorerFault::Panicked(panic_message(payload))),
                    Ok(Ok(result)) => result,
                }
            }
        };

        match outcome {
            Ok(result) => self.normalize(dimension, veto_capable, result),
            Err(fault) => {
                warn!(
                    action_id = %action.id,
                    dimension = %dimension,
                    error = %fault,
                    "Scorer fault, failing closed"
                );
                DimensionResult::faulted(dimension, veto_capable, fault.to_string())
            }
        }
    }

    fn normalize(
        &self,
        dimension: DimensionId,
        veto_capable: bool,
        mut result: DimensionResult,
    ) -> DimensionResult {
        if result.dimension != dimension {
            warn!(
                expected = %dimension,
                reported = %result.dimension,
                "Scorer reported the wrong dimension"
            );
            result.dimension = dimension;
        }
        result.score = clamp_score(result.score);
        if result.veto && !veto_capable {
            warn!(dimension = %dimension, "Veto from non-veto-capable dimension ignored");
            result.veto = false;
        }
        result
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{FaultyScorer, FixedScorer, PanickingScorer, SlowScorer};
    use chrono::Utc;
    use nomotic_types::{AgentId, TrustProfile};
    use proptest::prelude::*;
    use std::sync::Arc;

    fn context() -> AgentContext {
        AgentContext::new(TrustProfile::new(AgentId::from("worker"), 0.5, Utc::now()))
    }

    fn all_pass() -> DimensionRegistry {
        let mut registry = DimensionRegistry::new();
        for dim in DimensionId::ALL {
            registry.register(Arc::new(FixedScorer::new(dim, 1.0)));
        }
        registry
    }

    async fn run(registry: DimensionRegistry) -> Vec<DimensionResult> {
        let evaluator = DimensionEvaluator::new(registry, &GovernanceConfig::default());
        evaluator
            .evaluate(&Action::new("worker", "read", "docs"), &context(), &ScopeDefinition::empty())
            .await
    }

    fn find(results: &[DimensionResult], dim: DimensionId) -> &DimensionResult {
        results.iter().find(|r| r.dimension == dim).unwrap()
    }

    #[tokio::test]
    async fn one_result_per_dimension_in_order() {
        let results = run(all_pass()).await;
        let dims: Vec<_> = results.iter().map(|r| r.dimension).collect();
        assert_eq!(dims, DimensionId::ALL.to_vec());
        assert!(results.iter().all(|r| r.score == 1.0 && !r.veto));
    }

    #[tokio::test]
    async fn fault_in_veto_capable_dimension_vetoes() {
        let mut registry = all_pass();
        registry.register(Arc::new(FaultyScorer(DimensionId::ScopeCompliance)));
        let results = run(registry).await;
        let r = find(&results, DimensionId::ScopeCompliance);
        assert_eq!(r.score, 0.0);
        assert!(r.veto);
        assert!(r.is_fault());
    }

    #[tokio::test]
    async fn fault_in_other_dimension_scores_zero_without_veto() {
        let mut registry = all_pass();
        registry.register(Arc::new(FaultyScorer(DimensionId::Transparency)));
        let results = run(registry).await;
        let r = find(&results, DimensionId::Transparency);
        assert_eq!(r.score, 0.0);
        assert!(!r.veto);
        assert!(r.is_fault());
    }

    #[tokio::test(start_paused = true)]
    async fn overrunning_scorer_times_out() {
        let mut registry = all_pass();
        registry.register(Arc::new(SlowScorer {
            dimension: DimensionId::IncidentDetection,
            delay: Duration::from_secs(30),
        }));
        let results = run(registry).await;
        let r = find(&results, DimensionId::IncidentDetection);
        assert!(r.veto);
        assert!(r.fault.as_deref().unwrap().contains("deadline"));
    }

    #[tokio::test]
    async fn panicking_scorer_is_contained() {
        let mut registry = all_pass();
        registry.register(Arc::new(PanickingScorer(DimensionId::EthicalAlignment)));
        let results = run(registry).await;
        assert_eq!(results.len(), 13);
        let r = find(&results, DimensionId::EthicalAlignment);
        assert!(r.veto);
        assert!(r.fault.as_deref().unwrap().contains("blew up"));
    }

    #[tokio::test]
    async fn missing_scorer_fails_closed() {
        let mut registry = all_pass();
        registry.remove(DimensionId::AuthorityVerification);
        let results = run(registry).await;
        let r = find(&results, DimensionId::AuthorityVerification);
        assert!(r.veto);
        assert_eq!(r.score, 0.0);
    }

    #[tokio::test]
    async fn veto_from_non_capable_dimension_is_masked() {
        let mut registry = all_pass();
        registry.register(Arc::new(FixedScorer::veto(DimensionId::Transparency)));
        let results = run(registry).await;
        let r = find(&results, DimensionId::Transparency);
        assert!(!r.veto);
        assert_eq!(r.score, 0.0);
    }

    #[tokio::test]
    async fn out_of_range_scores_are_clamped() {
        let mut registry = all_pass();
        let mut wild = DimensionResult::pass(DimensionId::StakeholderImpact);
        wild.score = 7.5;
        registry.register(Arc::new(FixedScorer::raw(wild)));
        let mut nan = DimensionResult::pass(DimensionId::CascadingImpact);
        nan.score = f64::NAN;
        registry.register(Arc::new(FixedScorer::raw(nan)));

        let results = run(registry).await;
        assert_eq!(find(&results, DimensionId::StakeholderImpact).score, 1.0);
        assert_eq!(find(&results, DimensionId::CascadingImpact).score, 0.0);
    }

    proptest! {
        #[test]
        fn completion_order_does_not_change_results(delays in proptest::collection::vec(0u64..50, 13)) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();

            let mut registry = DimensionRegistry::new();
            for (dim, delay) in DimensionId::ALL.into_iter().zip(delays) {
                registry.register(Arc::new(SlowScorer {
                    dimension: dim,
                    delay: Duration::from_millis(delay),
                }));
            }
            let results = rt.block_on(run(registry));
            let dims: Vec<_> = results.iter().map(|r| r.dimension).collect();
            prop_assert_eq!(dims, DimensionId::ALL.to_vec());
            prop_assert!(results.iter().all(|r| r.score == 1.0 && !r.is_fault()));
        }
    }
}
