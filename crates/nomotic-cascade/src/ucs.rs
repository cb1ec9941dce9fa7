//! Unified Confidence Score.
//!
//! ```text
//! mean  = Σ w_d · s_d / Σ w_d            over non-vetoing dimensions
//! pull  = strength · (1 − trust / midpoint)   when trust < midpoint, else 0
//! UCS   = mean − pull · max(mean − trust, 0)
//! ```
//!
//! Below the midpoint the score is drawn linearly toward the agent's trust;
//! it is never raised by it.

use nomotic_types::{AggregationSettings, DimensionResult, GovernanceConfig};

/// Weighted mean of the non-vetoing scores. 0.0 if no weight remains.
pub fn weighted_mean(results: &[DimensionResult], config: &GovernanceConfig) -> f64 {
    let (sum, weights) = results
        .iter()
        .filter(|r| !(r.veto && config.is_veto_capable(r.dimension)))
        .fold((0.0, 0.0), |(sum, weights), r| {
            let w = config.weight(r.dimension);
            (sum + w * r.score, weights + w)
        });
    if weights > 0.0 && weights.is_finite() {
        (sum / weights).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// How strongly trust pulls the score, in [0.0, strength].
pub fn trust_pull(trust: f64, settings: &AggregationSettings) -> f64 {
    if trust >= settings.trust_midpoint {
        return 0.0;
    }
    let shortfall = 1.0 - trust.max(0.0) / settings.trust_midpoint;
    (settings.trust_scaling_strength * shortfall).clamp(0.0, 1.0)
}

pub fn compute_ucs(results: &[DimensionResult], trust: f64, config: &GovernanceConfig) -> f64 {
    let mean = weighted_mean(results, config);
    let pull = trust_pull(trust, &config.aggregation);
    let ucs = mean - pull * (mean - trust).max(0.0);
    if ucs.is_nan() {
        0.0
    } else {
        ucs.clamp(0.0, 1.0)
    }
}
