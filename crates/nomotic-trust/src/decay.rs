//! Idle decay toward the baseline.

use chrono::{DateTime, Duration, Utc};
use nomotic_types::{TrustProfile, TrustSettings};

/// Move `value` toward `baseline` by `rate_per_hour` for every hour in
/// `elapsed`, stopping at the baseline.
pub fn drift(value: f64, baseline: f64, rate_per_hour: f64, elapsed: Duration) -> f64 {
    if elapsed <= Duration::zero() || rate_per_hour <= 0.0 {
        return value;
    }
    let hours = elapsed.num_milliseconds() as f64 / 3_600_000.0;
    let step = rate_per_hour * hours;
    if value > baseline {
        (value - step).max(baseline)
    } else {
        (value + step).min(baseline)
    }
}

/// Apply decay for the idle time not yet accounted for.
///
/// Idle time only counts once `decay_window` has passed since the last
/// event, and each span of time is decayed at most once. Returns whether
/// the value moved.
pub fn apply(profile: &mut TrustProfile, settings: &TrustSettings, now: DateTime<Utc>) -> bool {
    let idle_from = profile.last_updated + settings.decay_window();
    let start = idle_from.max(profile.decayed_through);
    if now <= start {
        return false;
    }

    let before = profile.value;
    let after = settings.clamp(drift(before, settings.baseline, settings.decay_rate, now - start));
    profile.value = after;
    profile.decayed_through = now;
    after != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use nomotic_types::AgentId;

    #[test]
    fn drift_moves_toward_baseline_without_overshoot() {
        assert!((drift(0.9, 0.5, 0.01, Duration::hours(10)) - 0.8).abs() < 1e-9);
        assert!((drift(0.1, 0.5, 0.01, Duration::hours(10)) - 0.2).abs() < 1e-9);
        assert_eq!(drift(0.9, 0.5, 0.01, Duration::hours(1000)), 0.5);
        assert_eq!(drift(0.1, 0.5, 0.01, Duration::hours(1000)), 0.5);
        assert_eq!(drift(0.5, 0.5, 0.01, Duration::hours(5)), 0.5);
    }

    #[test]
    fn nothing_happens_inside_window() {
        let settings = TrustSettings::default();
        let start = Utc::now();
        let mut profile = TrustProfile::new(AgentId::from("a"), 0.9, start);
        assert!(!apply(&mut profile, &settings, start + Duration::hours(23)));
        assert_eq!(profile.value, 0.9);
    }

    #[test]
    fn idle_time_is_counted_once() {
        let settings = TrustSettings::default();
        let start = Utc::now();
        let mut profile = TrustProfile::new(AgentId::from("a"), 0.9, start);

        // 24h window then 10h of decay.
        assert!(apply(&mut profile, &settings, start + Duration::hours(34)));
        assert!((profile.value - 0.8).abs() < 1e-9);

        // Same instant again: no further movement.
        assert!(!apply(&mut profile, &settings, start + Duration::hours(34)));
        assert!((profile.value - 0.8).abs() < 1e-9);

        assert!(apply(&mut profile, &settings, start + Duration::hours(44)));
        assert!((profile.value - 0.7).abs() < 1e-9);
    }
}
