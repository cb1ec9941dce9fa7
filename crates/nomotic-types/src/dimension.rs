use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The 13 independent concern axes every action is scored on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionId {
    ScopeCompliance,
    AuthorityVerification,
    ResourceBoundaries,
    BehavioralConsistency,
    CascadingImpact,
    StakeholderImpact,
    IncidentDetection,
    IsolationIntegrity,
    TemporalCompliance,
    PrecedentAlignment,
    Transparency,
    HumanOverride,
    EthicalAlignment,
}

impl DimensionId {
    pub const ALL: [DimensionId; 13] = [
        DimensionId::ScopeCompliance,
        DimensionId::AuthorityVerification,
        DimensionId::ResourceBoundaries,
        DimensionId::BehavioralConsistency,
        DimensionId::CascadingImpact,
        DimensionId::StakeholderImpact,
        DimensionId::IncidentDetection,
        DimensionId::IsolationIntegrity,
        DimensionId::TemporalCompliance,
        DimensionId::PrecedentAlignment,
        DimensionId::Transparency,
        DimensionId::HumanOverride,
        DimensionId::EthicalAlignment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DimensionId::ScopeCompliance => "scope_compliance",
            DimensionId::AuthorityVerification => "authority_verification",
            DimensionId::ResourceBoundaries => "resource_boundaries",
            DimensionId::BehavioralConsistency => "behavioral_consistency",
            DimensionId::CascadingImpact => "cascading_impact",
            DimensionId::StakeholderImpact => "stakeholder_impact",
            DimensionId::IncidentDetection => "incident_detection",
            DimensionId::IsolationIntegrity => "isolation_integrity",
            DimensionId::TemporalCompliance => "temporal_compliance",
            DimensionId::PrecedentAlignment => "precedent_alignment",
            DimensionId::Transparency => "transparency",
            DimensionId::HumanOverride => "human_override",
            DimensionId::EthicalAlignment => "ethical_alignment",
        }
    }

    /// Whether a low score on this dimension can be addressed by constraining
    /// the action's parameters rather than rejecting it outright.
    pub fn is_isolable(&self) -> bool {
        matches!(
            self,
            DimensionId::ResourceBoundaries
                | DimensionId::CascadingImpact
                | DimensionId::TemporalCompliance
                | DimensionId::Transparency
        )
    }
}

impl std::fmt::Display for DimensionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownDimension(pub String);

impl std::fmt::Display for UnknownDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown dimension '{}'", self.0)
    }
}

impl std::error::Error for UnknownDimension {}

impl FromStr for DimensionId {
    type Err = UnknownDimension;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DimensionId::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| UnknownDimension(s.to_string()))
    }
}

/// Outcome of scoring one action along one dimension.
///
/// `score` is a concern score in [0.0, 1.0] where 1.0 means no concern.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DimensionResult {
    pub dimension: DimensionId,
    pub score: f64,
    pub veto: bool,
    pub rationale: Option<String>,
    /// Set when the scorer faulted and the result was forced closed.
    pub fault: Option<String>,
}

impl DimensionResult {
    /// No concern.
    pub fn pass(dimension: DimensionId) -> Self {
        Self {
            dimension,
            score: 1.0,
            veto: false,
            rationale: None,
            fault: None,
        }
    }

    /// A scored concern without veto. Out-of-range and NaN scores clamp
    /// toward concern.
    pub fn concern(dimension: DimensionId, score: f64, rationale: impl Into<String>) -> Self {
        Self {
            dimension,
            score: clamp_score(score),
            veto: false,
            rationale: Some(rationale.into()),
            fault: None,
        }
    }

    /// A hard stop: score 0.0 with the veto flag raised.
    pub fn veto(dimension: DimensionId, rationale: impl Into<String>) -> Self {
        Self {
            dimension,
            score: 0.0,
            veto: true,
            rationale: Some(rationale.into()),
            fault: None,
        }
    }

    /// Fail-closed result for a scorer that could not complete.
    pub fn faulted(dimension: DimensionId, veto: bool, fault: impl Into<String>) -> Self {
        let fault = fault.into();
        Self {
            dimension,
            score: 0.0,
            veto,
            rationale: Some(format!("scorer fault: {fault}")),
            fault: Some(fault),
        }
    }

    pub fn is_fault(&self) -> bool {
        self.fault.is_some()
    }
}

pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_dimensions_round_trip_names() {
        assert_eq!(DimensionId::ALL.len(), 13);
        for dim in DimensionId::ALL {
            assert_eq!(dim.as_str().parse::<DimensionId>().unwrap(), dim);
        }
        assert!("telepathy".parse::<DimensionId>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&DimensionId::HumanOverride).unwrap();
        assert_eq!(json, "\"human_override\"");
    }

    #[test]
    fn concern_clamps_scores() {
        assert_eq!(DimensionResult::concern(DimensionId::Transparency, 1.7, "x").score, 1.0);
        assert_eq!(DimensionResult::concern(DimensionId::Transparency, -0.2, "x").score, 0.0);
        assert_eq!(DimensionResult::concern(DimensionId::Transparency, f64::NAN, "x").score, 0.0);
    }

    #[test]
    fn faulted_results_are_closed() {
        let r = DimensionResult::faulted(DimensionId::IncidentDetection, true, "timeout");
        assert_eq!(r.score, 0.0);
        assert!(r.veto);
        assert!(r.is_fault());
    }
}
