//! The thirteen standard scorers.

pub mod behavior;
pub mod impact;
pub mod incident;
pub mod oversight;
pub mod resources;
pub mod scope;
pub mod temporal;

pub use behavior::{BehavioralConsistencyScorer, PrecedentAlignmentScorer};
pub use impact::{CascadingImpactScorer, StakeholderImpactScorer};
pub use incident::{IncidentDetectionScorer, StaticIncidentFeed};
pub use oversight::{EthicalAlignmentScorer, HumanOverrideScorer, TransparencyScorer};
pub use resources::ResourceBoundariesScorer;
pub use scope::{AuthorityVerificationScorer, IsolationIntegrityScorer, ScopeComplianceScorer};
pub use temporal::TemporalComplianceScorer;

#[cfg(test)]
pub(crate) mod testing {
    use chrono::Utc;
    use nomotic_types::{AgentContext, AgentId, TrustProfile};

    pub fn context(agent: &str) -> AgentContext {
        AgentContext::new(TrustProfile::new(AgentId::from(agent), 0.5, Utc::now()))
    }
}
