use std::collections::BTreeMap;
use std::sync::Arc;

use nomotic_types::DimensionId;

use crate::scorers::{
    AuthorityVerificationScorer, BehavioralConsistencyScorer, CascadingImpactScorer,
    EthicalAlignmentScorer, HumanOverrideScorer, IncidentDetectionScorer,
    IsolationIntegrityScorer, PrecedentAlignmentScorer, ResourceBoundariesScorer,
    ScopeComplianceScorer, StakeholderImpactScorer, TemporalComplianceScorer,
    TransparencyScorer,
};
use crate::traits::{DimensionScorer, IncidentFeed};

/// Scorers keyed by the dimension they report on. At most one per dimension.
#[derive(Clone, Default)]
pub struct DimensionRegistry {
    scorers: BTreeMap<DimensionId, Arc<dyn DimensionScorer>>,
}

impl DimensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All thirteen built-in scorers, with the static incident feed.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ScopeComplianceScorer));
        registry.register(Arc::new(AuthorityVerificationScorer));
        registry.register(Arc::new(ResourceBoundariesScorer));
        registry.register(Arc::new(BehavioralConsistencyScorer));
        registry.register(Arc::new(CascadingImpactScorer));
        registry.register(Arc::new(StakeholderImpactScorer));
        registry.register(Arc::new(IncidentDetectionScorer::default()));
        registry.register(Arc::new(IsolationIntegrityScorer));
        registry.register(Arc::new(TemporalComplianceScorer));
        registry.register(Arc::new(PrecedentAlignmentScorer));
        registry.register(Arc::new(TransparencyScorer));
        registry.register(Arc::new(HumanOverrideScorer));
        registry.register(Arc::new(EthicalAlignmentScorer));
        registry
    }

    /// Swap the incident detection scorer's feed.
    pub fn with_incident_feed(mut self, feed: Arc<dyn IncidentFeed>) -> Self {
        self.register(Arc::new(IncidentDetectionScorer::new(feed)));
        self
    }

    /// Register a scorer under its own dimension, returning any scorer it displaced.
    pub fn register(
        &mut self,
        scorer: Arc<dyn DimensionScorer>,
    ) -> Option<Arc<dyn DimensionScorer>> {
        self.scorers.insert(scorer.dimension(), scorer)
    }

    pub fn remove(&mut self, dimension: DimensionId) -> Option<Arc<dyn DimensionScorer>> {
        self.scorers.remove(&dimension)
    }

    pub fn get(&self, dimension: DimensionId) -> Option<&Arc<dyn DimensionScorer>> {
        self.scorers.get(&dimension)
    }

    pub fn len(&self) -> usize {
        self.scorers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scorers.is_empty()
    }

    pub fn missing(&self) -> Vec<DimensionId> {
        DimensionId::ALL
            .into_iter()
            .filter(|d| !self.scorers.contains_key(d))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::FixedScorer;

    #[test]
    fn standard_registry_is_complete() {
        let registry = DimensionRegistry::standard();
        assert_eq!(registry.len(), 13);
        assert!(registry.is_complete());
        for dim in DimensionId::ALL {
            assert_eq!(registry.get(dim).unwrap().dimension(), dim);
        }
    }

    #[test]
    fn register_replaces_by_dimension() {
        let mut registry = DimensionRegistry::standard();
        let previous = registry.register(Arc::new(FixedScorer::new(DimensionId::Transparency, 0.4)));
        assert!(previous.is_some());
        assert_eq!(registry.len(), 13);
    }

    #[test]
    fn missing_reports_gaps() {
        let mut registry = DimensionRegistry::standard();
        registry.remove(DimensionId::EthicalAlignment);
        assert!(!registry.is_complete());
        assert_eq!(registry.missing(), vec![DimensionId::EthicalAlignment]);
    }
}
