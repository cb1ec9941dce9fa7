use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use nomotic_types::{
    AgentId, Clock, GovernanceConfig, Tier, TrustProfile, TrustSettings, VerdictKind,
    VerdictRecord,
};
use parking_lot::Mutex;
use tracing::{debug, instrument};

use crate::decay;
use crate::error::{TrustError, TrustResult};

/// Event that moved an agent's trust.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrustEvent {
    Success,
    Violation,
    Interrupt,
}

/// Trust before and after one event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrustUpdate {
    pub before: f64,
    pub after: f64,
}

impl TrustUpdate {
    pub fn delta(&self) -> f64 {
        self.after - self.before
    }
}

/// Holds one [`TrustProfile`] per agent.
///
/// Each profile sits behind its own mutex so read-modify-write updates for
/// one agent serialize while different agents never contend. Profiles are
/// created on first touch at the agent's configured initial trust. Idle
/// decay is applied lazily whenever a profile is accessed.
pub struct TrustStore {
    settings: TrustSettings,
    initial_overrides: BTreeMap<AgentId, f64>,
    clock: Arc<dyn Clock>,
    profiles: DashMap<AgentId, Arc<Mutex<TrustProfile>>>,
}

impl TrustStore {
    pub fn new(settings: TrustSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            initial_overrides: BTreeMap::new(),
            clock,
            profiles: DashMap::new(),
        }
    }

    /// Build from a full configuration, picking up per-agent initial trust.
    pub fn from_config(config: &GovernanceConfig, clock: Arc<dyn Clock>) -> Self {
        let initial_overrides = config
            .agents
            .iter()
            .filter_map(|(id, agent)| agent.initial_trust.map(|v| (id.clone(), v)))
            .collect();
        Self {
            settings: config.trust.clone(),
            initial_overrides,
            clock,
            profiles: DashMap::new(),
        }
    }

    /// Settings the store was built with.
    pub fn settings(&self) -> &TrustSettings {
        &self.settings
    }

    fn initial_for(&self, agent: &AgentId) -> f64 {
        let value = self
            .initial_overrides
            .get(agent)
            .copied()
            .unwrap_or(self.settings.initial);
        self.settings.clamp(value)
    }

    fn entry(&self, agent: &AgentId) -> Arc<Mutex<TrustProfile>> {
        self.profiles
            .entry(agent.clone())
            .or_insert_with(|| {
                debug!(agent_id = %agent, "Creating trust profile");
                Arc::new(Mutex::new(TrustProfile::new(
                    agent.clone(),
                    self.initial_for(agent),
                    self.clock.now(),
                )))
            })
            .clone()
    }

    /// Run `f` on the agent's profile with decay already applied, under the
    /// agent's lock.
    fn with_profile<R>(
        &self,
        agent: &AgentId,
        f: impl FnOnce(&mut TrustProfile, DateTime<Utc>) -> R,
    ) -> R {
        let slot = self.entry(agent);
        let mut profile = slot.lock();
        let now = self.clock.now();
        if decay::apply(&mut profile, &self.settings, now) {
            debug!(agent_id = %agent, trust = profile.value, "Idle decay applied");
        }
        f(&mut profile, now)
    }

    /// Copy of the agent's current profile.
    pub fn snapshot(&self, agent: &AgentId) -> TrustProfile {
        self.with_profile(agent, |profile, _| profile.clone())
    }

    /// Current trust of `agent` after idle decay. Creates the profile on
    /// first sight.
    pub fn trust(&self, agent: &AgentId) -> f64 {
        self.with_profile(agent, |profile, _| profile.value)
    }

    /// Whether `agent` has a profile yet.
    pub fn contains(&self, agent: &AgentId) -> bool {
        self.profiles.contains_key(agent)
    }

    /// Number of agents with a profile.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    #[instrument(skip(self), fields(agent_id = %agent))]
    pub fn record(&self, agent: &AgentId, event: TrustEvent) -> TrustUpdate {
        let delta = match event {
            TrustEvent::Success => self.settings.success_increment,
            TrustEvent::Violation => -self.settings.violation_decrement,
            TrustEvent::Interrupt => -self.settings.interrupt_cost,
        };
        let update = self.with_profile(agent, |profile, now| {
            let before = profile.value;
            profile.value = self.settings.clamp(before + delta);
            profile.last_updated = now;
            profile.decayed_through = now;
            TrustUpdate {
                before,
                after: profile.value,
            }
        });
        debug!(?event, before = update.before, after = update.after, "Trust updated");
        update
    }

    pub fn record_success(&self, agent: &AgentId) -> TrustUpdate {
        self.record(agent, TrustEvent::Success)
    }

    pub fn record_violation(&self, agent: &AgentId) -> TrustUpdate {
        self.record(agent, TrustEvent::Violation)
    }

    pub fn record_interrupt(&self, agent: &AgentId) -> TrustUpdate {
        self.record(agent, TrustEvent::Interrupt)
    }

    /// Append a verdict to the agent's history, charging a violation when the
    /// verdict is a DENY from the veto gate or the deny threshold.
    ///
    /// Returns the trust update if one was applied.
    pub fn record_verdict(
        &self,
        agent: &AgentId,
        action_type: &str,
        verdict: VerdictKind,
        tier: Tier,
    ) -> Option<TrustUpdate> {
        let window = self.settings.history_window;
        let violation =
            verdict == VerdictKind::Deny && matches!(tier, Tier::VetoGate | Tier::Threshold);
        let decrement = self.settings.violation_decrement;

        let update = self.with_profile(agent, |profile, now| {
            profile.push_history(
                VerdictRecord {
                    action_type: action_type.to_string(),
                    verdict,
                    tier,
                    at: now,
                },
                window,
            );
            if !violation {
                return None;
            }
            let before = profile.value;
            profile.value = self.settings.clamp(before - decrement);
            profile.last_updated = now;
            profile.decayed_through = now;
            Some(TrustUpdate {
                before,
                after: profile.value,
            })
        });
        if let Some(u) = update {
            debug!(agent_id = %agent, %verdict, before = u.before, after = u.after, "Violation charged");
        }
        update
    }

    /// Set an agent's trust outright. Intended for operators restoring state
    /// and for tests; the value must already be within bounds.
    pub fn seed(&self, agent: &AgentId, value: f64) -> TrustResult<()> {
        let s = &self.settings;
        if !(value.is_finite() && value >= s.floor && value <= s.ceiling) {
            return Err(TrustError::OutOfBounds {
                agent: agent.clone(),
                value,
                floor: s.floor,
                ceiling: s.ceiling,
            });
        }
        let slot = self.entry(agent);
        let mut profile = slot.lock();
        let now = self.clock.now();
        profile.value = value;
        profile.last_updated = now;
        profile.decayed_through = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use nomotic_types::{AgentConfig, ManualClock, ScopeDefinition};
    use proptest::prelude::*;

    fn store() -> (TrustStore, ManualClock) {
        let clock = ManualClock::default();
        (
            TrustStore::new(TrustSettings::default(), Arc::new(clock.clone())),
            clock,
        )
    }

    fn agent() -> AgentId {
        AgentId::from("billing-agent")
    }

    #[test]
    fn profiles_are_created_lazily_at_initial() {
        let (store, _) = store();
        assert!(store.is_empty());
        assert_eq!(store.trust(&agent()), 0.5);
        assert!(store.contains(&agent()));
    }

    #[test]
    fn per_agent_initial_override() {
        let config = GovernanceConfig::default().with_agent(
            "trusted",
            AgentConfig {
                initial_trust: Some(0.8),
                ..AgentConfig::new(ScopeDefinition::with_actions(["read"]))
            },
        );
        let store = TrustStore::from_config(&config, Arc::new(ManualClock::default()));
        assert_eq!(store.trust(&AgentId::from("trusted")), 0.8);
        assert_eq!(store.trust(&AgentId::from("other")), 0.5);
    }

    #[test]
    fn updates_are_asymmetric() {
        let (store, _) = store();
        let up = store.record_success(&agent());
        let down = store.record_violation(&agent());
        assert!((up.delta() - 0.01).abs() < 1e-12);
        assert!((down.delta() + 0.05).abs() < 1e-12);
        let cost = store.record_interrupt(&agent());
        assert!((cost.delta() + 0.03).abs() < 1e-12);
    }

    #[test]
    fn verdicts_only_charge_violations() {
        let (store, _) = store();
        let a = agent();
        assert!(store
            .record_verdict(&a, "read", VerdictKind::Allow, Tier::Threshold)
            .is_none());
        assert!(store
            .record_verdict(&a, "read", VerdictKind::Escalate, Tier::Deliberation)
            .is_none());
        assert!(store
            .record_verdict(&a, "read", VerdictKind::Deny, Tier::Deliberation)
            .is_none());
        let charged = store
            .record_verdict(&a, "delete", VerdictKind::Deny, Tier::VetoGate)
            .unwrap();
        assert!((charged.after - 0.45).abs() < 1e-12);

        let snapshot = store.snapshot(&a);
        assert_eq!(snapshot.history.len(), 4);
        assert_eq!(snapshot.recent_denials(), 2);
    }

    #[test]
    fn decay_pulls_idle_agents_to_baseline() {
        let (store, clock) = store();
        let a = agent();
        store.seed(&a, 0.9).unwrap();

        clock.advance(Duration::hours(20));
        assert_eq!(store.trust(&a), 0.9);

        clock.advance(Duration::hours(14));
        assert!((store.trust(&a) - 0.8).abs() < 1e-9);

        // An update resets the idle window.
        store.record_success(&a);
        clock.advance(Duration::hours(23));
        assert!((store.trust(&a) - 0.81).abs() < 1e-9);
    }

    #[test]
    fn seed_rejects_out_of_bounds() {
        let (store, _) = store();
        assert!(matches!(
            store.seed(&agent(), 1.5),
            Err(TrustError::OutOfBounds { .. })
        ));
        assert!(store.seed(&agent(), f64::NAN).is_err());
    }

    #[test]
    fn concurrent_updates_are_serialized() {
        let (store, _) = store();
        let store = Arc::new(store);
        let a = agent();
        store.seed(&a, 0.0).unwrap();

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let a = a.clone();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        store.record_success(&a);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert!((store.trust(&a) - 0.8).abs() < 1e-9);
    }

    fn event() -> impl Strategy<Value = TrustEvent> {
        prop_oneof![
            Just(TrustEvent::Success),
            Just(TrustEvent::Violation),
            Just(TrustEvent::Interrupt),
        ]
    }

    proptest! {
        #[test]
        fn trust_stays_within_bounds(
            start in 0.0f64..=1.0,
            events in proptest::collection::vec((event(), 0i64..100), 0..200),
        ) {
            let (store, clock) = store();
            let a = agent();
            store.seed(&a, start).unwrap();
            for (event, idle_hours) in events {
                clock.advance(Duration::hours(idle_hours));
                let update = store.record(&a, event);
                prop_assert!((0.0..=1.0).contains(&update.after));
            }
            let final_trust = store.trust(&a);
            prop_assert!((0.0..=1.0).contains(&final_trust));
        }

        #[test]
        fn one_violation_outweighs_one_success(start in 0.1f64..=0.9) {
            let (store, _) = store();
            let a = agent();
            store.seed(&a, start).unwrap();
            let up = store.record_success(&a).delta();
            let down = store.record_violation(&a).delta();
            prop_assert!(-down > up);
            prop_assert!((-down / up - 5.0).abs() < 1e-6);
        }
    }
}
