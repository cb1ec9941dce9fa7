use nomotic_types::{
    DimensionId, DimensionResult, GovernanceConfig, Tier, TrustProfile, VerdictKind,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CascadeError;
use crate::ucs::compute_ucs;

/// What the cascade decided and why. The caller stamps identifiers,
/// latency and timestamp onto it to form a `Verdict`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub kind: VerdictKind,
    pub tier: Tier,
    pub ucs: f64,
    pub vetoed_by: Vec<DimensionId>,
    pub constrain: Option<DimensionId>,
    pub rationale: String,
}

impl Decision {
    fn new(kind: VerdictKind, tier: Tier, ucs: f64, rationale: impl Into<String>) -> Self {
        Self {
            kind,
            tier,
            ucs,
            vetoed_by: Vec::new(),
            constrain: None,
            rationale: rationale.into(),
        }
    }
}

/// Tier 1 veto gate, Tier 2 thresholds, Tier 3 deliberation.
///
/// Pure: the outcome depends only on the dimension results, the trust
/// snapshot and the configuration captured at construction.
#[derive(Clone, Debug)]
pub struct DecisionCascade {
    config: GovernanceConfig,
}

impl DecisionCascade {
    /// Refuses to build under inverted or out-of-range thresholds.
    pub fn new(config: GovernanceConfig) -> Result<Self, CascadeError> {
        let t = &config.thresholds;
        for (name, value) in [("allow", t.allow), ("deny", t.deny)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CascadeError::ThresholdOutOfRange { name, value });
            }
        }
        if t.allow <= t.deny {
            return Err(CascadeError::InvertedThresholds {
                allow: t.allow,
                deny: t.deny,
            });
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    /// Verdict for an evaluation that was not scored because a halt is active.
    pub fn suspended(reason: impl Into<String>) -> Decision {
        Decision::new(VerdictKind::Suspend, Tier::Halt, 0.0, reason)
    }

    /// Run the three tiers over one evaluation's dimension results.
    ///
    /// A veto from a veto-capable dimension ends at Tier 1. Otherwise the
    /// trust-scaled UCS is compared with the thresholds, and only the band
    /// between them reaches deliberation.
    pub fn decide(&self, results: &[DimensionResult], trust: &TrustProfile) -> Decision {
        let ucs = compute_ucs(results, trust.value, &self.config);

        if let Some(decision) = self.veto_gate(results, ucs) {
            return decision;
        }

        let t = &self.config.thresholds;
        if ucs >= t.allow {
            debug!(ucs, allow = t.allow, "Tier 2 allow");
            return Decision::new(
                VerdictKind::Allow,
                Tier::Threshold,
                ucs,
                format!("UCS {ucs:.3} meets allow threshold {}", t.allow),
            );
        }
        if ucs <= t.deny {
            debug!(ucs, deny = t.deny, "Tier 2 deny");
            return Decision::new(
                VerdictKind::Deny,
                Tier::Threshold,
                ucs,
                format!("UCS {ucs:.3} at or below deny threshold {}", t.deny),
            );
        }

        self.deliberate(results, trust, ucs)
    }

    fn veto_gate(&self, results: &[DimensionResult], ucs: f64) -> Option<Decision> {
        let vetoed_by: Vec<DimensionId> = results
            .iter()
            .filter(|r| r.veto && self.config.is_veto_capable(r.dimension))
            .map(|r| r.dimension)
            .collect();
        if vetoed_by.is_empty() {
            return None;
        }

        let escalate = vetoed_by
            .iter()
            .all(|d| self.config.escalates_on_veto(*d));
        let kind = if escalate {
            VerdictKind::Escalate
        } else {
            VerdictKind::Deny
        };
        let reasons: Vec<String> = results
            .iter()
            .filter(|r| vetoed_by.contains(&r.dimension))
            .map(|r| match &r.rationale {
                Some(why) => format!("{}: {why}", r.dimension),
                None => r.dimension.to_string(),
            })
            .collect();

        warn!(verdict = %kind, vetoes = ?vetoed_by, "Tier 1 veto");
        let mut decision = Decision::new(
            kind,
            Tier::VetoGate,
            ucs,
            format!("vetoed by {}", reasons.join("; ")),
        );
        decision.vetoed_by = vetoed_by;
        Some(decision)
    }

    fn deliberate(&self, results: &[DimensionResult], trust: &TrustProfile, ucs: f64) -> Decision {
        let d = &self.config.deliberation;
        let minimum = self.config.minimum_for_action(&trust.agent_id);

        if trust.value < minimum {
            return Decision::new(
                VerdictKind::Escalate,
                Tier::Deliberation,
                ucs,
                format!(
                    "trust {:.3} below minimum {minimum} for autonomous action",
                    trust.value
                ),
            );
        }

        let denials = trust.recent_denials();
        if denials >= d.max_recent_denials {
            return Decision::new(
                VerdictKind::Deny,
                Tier::Deliberation,
                ucs,
                format!("{denials} recent denials in history"),
            );
        }

        let low: Vec<&DimensionResult> = results
            .iter()
            .filter(|r| !r.veto && r.score < d.low_score_threshold)
            .collect();

        match low.as_slice() {
            [only] if only.dimension.is_isolable() => {
                let mut decision = Decision::new(
                    VerdictKind::Modify,
                    Tier::Deliberation,
                    ucs,
                    format!(
                        "only {} is low ({:.2}); constrain and resubmit",
                        only.dimension, only.score
                    ),
                );
                decision.constrain = Some(only.dimension);
                decision
            }
            [] if trust.value >= d.trusted_allow_floor && denials == 0 => Decision::new(
                VerdictKind::Allow,
                Tier::Deliberation,
                ucs,
                format!(
                    "no low dimensions, trust {:.3} and clean history",
                    trust.value
                ),
            ),
            _ => {
                let names: Vec<&str> = low.iter().map(|r| r.dimension.as_str()).collect();
                let rationale = if names.is_empty() {
                    format!("UCS {ucs:.3} ambiguous; human review")
                } else {
                    format!("low dimensions: {}; human review", names.join(", "))
                };
                Decision::new(VerdictKind::Escalate, Tier::Deliberation, ucs, rationale)
            }
        }
    }
}
