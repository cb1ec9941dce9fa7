use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use nomotic_audit::{
    AuditEmitter, AuditQuery, AuditRecord, AuditStatistics, InMemoryAuditLog,
};
use nomotic_cascade::DecisionCascade;
use nomotic_dimensions::{DimensionEvaluator, DimensionRegistry};
use nomotic_execution::{ExecutionController, ExecutionHandle, InterruptReport, Rollback};
use nomotic_trust::{TrustStore, TrustUpdate};
use nomotic_types::{
    Action, ActionId, AgentContext, AgentId, Clock, ConfigError, GovernanceConfig,
    InterruptScope, ScopeDefinition, SystemClock, TrustProfile, Verdict, VerdictKind,
};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{RuntimeError, RuntimeResult};

/// Evaluations between sweeps of expired approvals.
const APPROVAL_SWEEP_EVERY: u64 = 256;

/// An ALLOW verdict waiting for, or running under, an execution handle.
struct Approval {
    agent: AgentId,
    expires_at: DateTime<Utc>,
}

/// Builder for [`GovernanceRuntime`].
pub struct RuntimeBuilder {
    config: GovernanceConfig,
    registry: Option<DimensionRegistry>,
    clock: Option<Arc<dyn Clock>>,
}

impl RuntimeBuilder {
    /// Replace the thirteen built-in scorers.
    pub fn registry(mut self, registry: DimensionRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Time source for trust decay, approval expiry and audit timestamps.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate the configuration and start the audit writer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> RuntimeResult<GovernanceRuntime> {
        self.config.validate()?;
        let cascade = DecisionCascade::new(self.config.clone())?;
        tokio::runtime::Handle::try_current().map_err(|_| RuntimeError::NoAsyncRuntime)?;

        let registry = self.registry.unwrap_or_else(DimensionRegistry::standard);
        let missing = registry.missing();
        if !missing.is_empty() {
            warn!(?missing, "Dimensions without a scorer will fail closed");
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let evaluator = DimensionEvaluator::new(registry, &self.config);
        let trust = TrustStore::from_config(&self.config, clock.clone());
        let execution = ExecutionController::with_retention(self.config.execution.retained_terminal);
        let audit_log = Arc::new(InMemoryAuditLog::new());
        let (audit, _writer) = AuditEmitter::spawn(audit_log.clone(), clock.clone());

        let scopes = DashMap::new();
        for (agent, agent_config) in &self.config.agents {
            scopes.insert(agent.clone(), agent_config.scope.clone());
        }

        info!(
            agents = scopes.len(),
            allow = self.config.thresholds.allow,
            deny = self.config.thresholds.deny,
            "Governance runtime started"
        );

        Ok(GovernanceRuntime {
            config: self.config,
            clock,
            evaluator,
            cascade,
            trust,
            execution,
            audit,
            audit_log,
            scopes,
            approved: DashMap::new(),
            evaluations: AtomicU64::new(0),
        })
    }
}

/// The authorization engine's front door.
///
/// `evaluate` scores an action on every dimension, runs the decision
/// cascade against a trust snapshot, charges the trust store and emits an
/// audit record. Actions that came back ALLOW may then run under an
/// execution handle that any caller can interrupt.
pub struct GovernanceRuntime {
    config: GovernanceConfig,
    clock: Arc<dyn Clock>,
    evaluator: DimensionEvaluator,
    cascade: DecisionCascade,
    trust: TrustStore,
    execution: ExecutionController,
    audit: AuditEmitter,
    audit_log: Arc<InMemoryAuditLog>,
    scopes: DashMap<AgentId, ScopeDefinition>,
    /// ALLOW verdicts not yet run to a terminal state. Entries that never
    /// start are dropped once they expire.
    approved: DashMap<ActionId, Approval>,
    evaluations: AtomicU64,
}

impl GovernanceRuntime {
    /// Builder starting from `config`, with the built-in scorers and the
    /// wall clock unless replaced.
    pub fn builder(config: GovernanceConfig) -> RuntimeBuilder {
        RuntimeBuilder {
            config,
            registry: None,
            clock: None,
        }
    }

    /// Runtime with the built-in scorers and the wall clock.
    pub fn new(config: GovernanceConfig) -> RuntimeResult<Self> {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    /// Fresh context for `agent` carrying its current trust.
    pub fn context(&self, agent: &AgentId) -> AgentContext {
        AgentContext::new(self.trust.snapshot(agent))
    }

    /// Decide whether `action` may proceed.
    ///
    /// The trust carried by `context` is replaced with a snapshot from the
    /// trust store, taken once. Scope and trust are those of the submitting
    /// agent (`context.agent_id`). Never fails: faults inside scoring resolve
    /// toward denial.
    #[instrument(skip_all, fields(action_id = %action.id, agent_id = %context.agent_id, action_type = %action.action_type))]
    pub async fn evaluate(&self, action: &Action, mut context: AgentContext) -> Verdict {
        let started = Instant::now();
        let agent = context.agent_id.clone();
        let snapshot = self.trust.snapshot(&agent);
        context.trust = snapshot.clone();

        let (decision, dimensions) = match self.execution.halt_reason(&agent) {
            Some(reason) => {
                info!(%reason, "Evaluation suspended by halt");
                (DecisionCascade::suspended(reason), Vec::new())
            }
            None => {
                let scope = self.scope_for(&agent);
                let dimensions = self.evaluator.evaluate(action, &context, &scope).await;
                (self.cascade.decide(&dimensions, &snapshot), dimensions)
            }
        };

        let verdict = Verdict {
            action_id: action.id,
            agent_id: agent.clone(),
            kind: decision.kind,
            ucs: decision.ucs,
            tier: decision.tier,
            dimensions,
            vetoed_by: decision.vetoed_by,
            constrain: decision.constrain,
            rationale: decision.rationale,
            latency: started.elapsed(),
            decided_at: self.clock.now(),
        };

        if let Some(update) =
            self.trust
                .record_verdict(&agent, &action.action_type, verdict.kind, verdict.tier)
        {
            debug!(before = update.before, after = update.after, "Trust charged for violation");
        }

        self.audit.evaluation(action, &verdict, &snapshot);
        if verdict.kind == VerdictKind::Allow {
            let expires_at = verdict.decided_at + self.config.execution.approval_ttl();
            self.approved.insert(action.id, Approval { agent, expires_at });
        } else {
            self.withdraw_approval(&action.id);
        }
        if self.evaluations.fetch_add(1, Ordering::Relaxed) % APPROVAL_SWEEP_EVERY
            == APPROVAL_SWEEP_EVERY - 1
        {
            self.expire_approvals();
        }

        info!(
            verdict = %verdict.kind,
            tier = verdict.tier.number(),
            ucs = verdict.ucs,
            latency_us = verdict.latency.as_micros() as u64,
            "Action evaluated"
        );
        verdict
    }

    /// Replace an agent's scope. Returns the scope it had before.
    ///
    /// A scope with non-positive limits or a malformed hour window is
    /// refused and the current scope stays in force.
    #[instrument(skip(self, scope), fields(agent_id = %agent))]
    pub fn configure_scope(
        &self,
        agent: &AgentId,
        scope: ScopeDefinition,
        actor: &str,
        reason: &str,
    ) -> RuntimeResult<Option<ScopeDefinition>> {
        let problems = scope.problems();
        if !problems.is_empty() {
            warn!(%actor, ?problems, "Scope change refused");
            return Err(ConfigError::Invalid(
                problems
                    .into_iter()
                    .map(|problem| format!("agents.{agent}.scope.{problem}"))
                    .collect(),
            )
            .into());
        }
        let previous = self.scopes.insert(agent.clone(), scope.clone());
        self.audit
            .scope_changed(agent, previous.clone(), &scope, actor, reason);
        info!(%actor, %reason, actions = scope.actions.len(), "Scope configured");
        Ok(previous)
    }

    /// The scope evaluations for `agent` run against. Unknown agents get
    /// the empty scope.
    pub fn scope_for(&self, agent: &AgentId) -> ScopeDefinition {
        self.scopes
            .get(agent)
            .map(|s| s.value().clone())
            .unwrap_or_default()
    }

    /// Current trust of `agent`, idle decay applied.
    pub fn trust(&self, agent: &AgentId) -> f64 {
        self.trust.trust(agent)
    }

    /// Full trust profile of `agent`, including its verdict history.
    pub fn trust_profile(&self, agent: &AgentId) -> TrustProfile {
        self.trust.snapshot(agent)
    }

    pub fn trust_store(&self) -> &TrustStore {
        &self.trust
    }

    // ── Execution surface ────────────────────────────────────────────

    /// Start running an action that was evaluated ALLOW. An approval that
    /// was never started within `execution.approval_ttl_secs` has lapsed.
    pub fn begin_execution(
        &self,
        action_id: ActionId,
        rollback: Option<Rollback>,
    ) -> RuntimeResult<ExecutionHandle> {
        let (agent, expires_at) = self
            .approved
            .get(&action_id)
            .map(|a| (a.agent.clone(), a.expires_at))
            .ok_or(RuntimeError::NotApproved(action_id))?;
        if expires_at <= self.clock.now() && self.withdraw_approval(&action_id) {
            warn!(action_id = %action_id, %expires_at, "Approval lapsed before execution");
            return Err(RuntimeError::NotApproved(action_id));
        }
        Ok(self.execution.begin_execution(action_id, agent, rollback)?)
    }

    /// Whether the executor of `action_id` should stop. True once the
    /// action, its agent or the whole system has been interrupted.
    pub fn check_interrupt(&self, action_id: &ActionId) -> RuntimeResult<bool> {
        Ok(self.execution.check_interrupt(action_id)?)
    }

    /// Mark a running action COMPLETED and credit its agent.
    #[instrument(skip(self), fields(action_id = %action_id))]
    pub fn complete_execution(&self, action_id: &ActionId) -> RuntimeResult<TrustUpdate> {
        let handle = self.execution.complete_execution(action_id)?;
        self.approved.remove(action_id);
        let update = self.trust.record_success(handle.agent_id());
        self.audit
            .completion(*action_id, handle.agent_id(), update.after);
        Ok(update)
    }

    /// Interrupt at the given breadth. Every handle this call seals costs
    /// its agent `interrupt_cost` trust and gets an interruption record.
    pub fn interrupt_action(
        &self,
        action_id: &ActionId,
        reason: &str,
        scope: InterruptScope,
    ) -> RuntimeResult<InterruptReport> {
        let report = self.execution.interrupt_action(action_id, reason, scope)?;
        self.settle(&report);
        Ok(report)
    }

    /// Interrupt everything `agent` is running and refuse it new work.
    pub fn interrupt_agent(&self, agent: &AgentId, reason: &str) -> InterruptReport {
        let report = self.execution.interrupt_agent(agent, reason);
        self.settle(&report);
        report
    }

    /// Interrupt everything and refuse all new work.
    pub fn interrupt_global(&self, reason: &str) -> InterruptReport {
        let report = self.execution.interrupt_global(reason);
        self.settle(&report);
        report
    }

    /// Lift an agent halt. Audited when a halt was actually lifted.
    pub fn resume_agent(&self, agent: &AgentId, actor: &str) -> bool {
        let lifted = self.execution.resume_agent(agent);
        if lifted {
            self.audit.halt_cleared(Some(agent), actor);
        }
        lifted
    }

    pub fn resume_global(&self, actor: &str) -> bool {
        let lifted = self.execution.resume_global();
        if lifted {
            self.audit.halt_cleared(None, actor);
        }
        lifted
    }

    pub fn is_globally_halted(&self) -> bool {
        self.execution.is_globally_halted()
    }

    pub fn active_executions(&self) -> usize {
        self.execution.active_count()
    }

    /// ALLOW verdicts not yet run to a terminal state.
    pub fn pending_approvals(&self) -> usize {
        self.approved.len()
    }

    /// Drop approvals whose window has passed without an execution
    /// starting. Runs on its own every few hundred evaluations; returns how
    /// many were dropped.
    pub fn expire_approvals(&self) -> usize {
        let now = self.clock.now();
        let lapsed: Vec<ActionId> = self
            .approved
            .iter()
            .filter(|a| a.expires_at <= now)
            .map(|a| *a.key())
            .collect();
        let dropped = lapsed
            .iter()
            .filter(|id| self.withdraw_approval(id))
            .count();
        if dropped > 0 {
            debug!(dropped, "Lapsed approvals dropped");
        }
        dropped
    }

    /// Remove the approval of an action that has not started. Approvals of
    /// running actions stay until the handle is terminal.
    fn withdraw_approval(&self, action_id: &ActionId) -> bool {
        if !self.approved.contains_key(action_id) || self.execution.handle(action_id).is_ok() {
            return false;
        }
        let removed = self.approved.remove(action_id).is_some();
        if removed {
            self.audit.forget(action_id);
        }
        removed
    }

    fn settle(&self, report: &InterruptReport) {
        for sealed in &report.sealed {
            self.approved.remove(&sealed.action_id);
            let update = self.trust.record_interrupt(&sealed.agent_id);
            if sealed.rollback.is_failure() {
                error!(
                    action_id = %sealed.action_id,
                    agent_id = %sealed.agent_id,
                    rollback = ?sealed.rollback,
                    "Rollback failed; handle sealed INTERRUPTED regardless"
                );
            }
            self.audit.interruption(
                sealed.action_id,
                &sealed.agent_id,
                report.scope,
                &report.reason,
                sealed.rollback.clone(),
                update.after,
            );
        }
    }

    // ── Audit surface ────────────────────────────────────────────────

    /// Records matching `query`, in chain order. Only records the writer
    /// has appended are visible; call [`flush_audit`](Self::flush_audit)
    /// first to include everything emitted so far.
    pub fn audit_query(&self, query: &AuditQuery) -> Vec<AuditRecord> {
        self.audit_log.query(query)
    }

    /// Counts by record kind and verdict over the whole log.
    pub fn audit_statistics(&self) -> AuditStatistics {
        self.audit_log.statistics()
    }

    pub fn verify_audit_chain(&self) -> RuntimeResult<()> {
        Ok(self.audit_log.verify_chain()?)
    }

    pub fn export_audit<W: Write>(&self, query: &AuditQuery, out: W) -> RuntimeResult<usize> {
        Ok(self.audit_log.export_jsonl(query, out)?)
    }

    /// Wait for every record emitted so far to land in the log.
    pub async fn flush_audit(&self) -> RuntimeResult<()> {
        Ok(self.audit.flush().await?)
    }

    /// Records that never reached the audit writer.
    pub fn dropped_audit_records(&self) -> u64 {
        self.audit.dropped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nomotic_audit::AuditRecordKind;
    use nomotic_dimensions::mocks::{FaultyScorer, FixedScorer};
    use nomotic_execution::ExecutionError;
    use nomotic_types::{AgentConfig, DimensionId, ManualClock, Tier};

    fn reader_config() -> GovernanceConfig {
        GovernanceConfig::default().with_agent(
            "reader",
            AgentConfig::new(ScopeDefinition::with_actions(["read"]).target("docs")),
        )
    }

    fn uniform(score: f64) -> DimensionRegistry {
        let mut registry = DimensionRegistry::new();
        for dimension in DimensionId::ALL {
            registry.register(Arc::new(FixedScorer::new(dimension, score)));
        }
        registry
    }

    async fn allowed(rt: &GovernanceRuntime) -> Action {
        let action = Action::builder("reader", "read", "docs")
            .param("justification", "weekly summary")
            .build();
        let ctx = rt.context(&action.agent_id).with_origin("scheduler");
        let verdict = rt.evaluate(&action, ctx).await;
        assert_eq!(verdict.kind, VerdictKind::Allow, "{}", verdict.rationale);
        action
    }

    #[tokio::test]
    async fn in_scope_read_is_allowed_at_threshold() {
        let rt = GovernanceRuntime::new(reader_config()).unwrap();
        let action = allowed(&rt).await;
        rt.flush_audit().await.unwrap();

        let records = rt.audit_query(&AuditQuery::for_action(action.id));
        assert_eq!(records.len(), 1);
        let verdict = records[0].verdict().unwrap();
        assert_eq!(verdict.tier, Tier::Threshold);
        assert_eq!(verdict.dimensions.len(), 13);
    }

    #[tokio::test]
    async fn out_of_scope_write_is_denied_and_charged() {
        let rt = GovernanceRuntime::new(reader_config()).unwrap();
        let agent = AgentId::from("reader");
        let before = rt.trust(&agent);

        let action = Action::new("reader", "write", "docs");
        let verdict = rt.evaluate(&action, rt.context(&agent)).await;

        assert_eq!(verdict.kind, VerdictKind::Deny);
        assert_eq!(verdict.tier, Tier::VetoGate);
        assert!(verdict.vetoed_by.contains(&DimensionId::ScopeCompliance));
        let after = rt.trust(&agent);
        assert!((before - after - rt.config().trust.violation_decrement).abs() < 1e-9);
    }

    #[tokio::test]
    async fn unknown_agent_gets_empty_scope() {
        let rt = GovernanceRuntime::new(reader_config()).unwrap();
        let stranger = AgentId::from("stranger");
        assert!(rt.scope_for(&stranger).is_empty());
        let action = Action::new("stranger", "read", "docs");
        let verdict = rt.evaluate(&action, rt.context(&stranger)).await;
        assert_eq!(verdict.kind, VerdictKind::Deny);
    }

    #[tokio::test]
    async fn inverted_thresholds_refused_at_build() {
        let config = GovernanceConfig::default().with_thresholds(0.3, 0.7);
        assert!(GovernanceRuntime::new(config).is_err());
    }

    #[test]
    fn build_outside_tokio_is_refused() {
        match GovernanceRuntime::new(GovernanceConfig::default()) {
            Err(RuntimeError::NoAsyncRuntime) => {}
            other => panic!("expected NoAsyncRuntime, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn only_allowed_actions_may_execute() {
        let rt = GovernanceRuntime::new(reader_config()).unwrap();
        let denied = Action::new("reader", "write", "docs");
        rt.evaluate(&denied, rt.context(&denied.agent_id)).await;
        assert!(matches!(
            rt.begin_execution(denied.id, None),
            Err(RuntimeError::NotApproved(_))
        ));

        let action = allowed(&rt).await;
        rt.begin_execution(action.id, None).unwrap();
        assert!(matches!(
            rt.begin_execution(action.id, None),
            Err(RuntimeError::Execution(ExecutionError::DoubleExecution(_)))
        ));
    }

    #[tokio::test]
    async fn completion_credits_trust_and_links_audit() {
        let rt = GovernanceRuntime::new(reader_config()).unwrap();
        let action = allowed(&rt).await;
        rt.begin_execution(action.id, None).unwrap();
        let update = rt.complete_execution(&action.id).unwrap();
        assert!((update.delta() - rt.config().trust.success_increment).abs() < 1e-9);
        rt.flush_audit().await.unwrap();

        let records = rt.audit_query(&AuditQuery::for_action(action.id));
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].kind(), AuditRecordKind::Completion);
        assert_eq!(records[1].parent, Some(records[0].id));
        rt.verify_audit_chain().unwrap();
    }

    #[tokio::test]
    async fn interrupted_action_cannot_complete() {
        let rt = GovernanceRuntime::new(reader_config()).unwrap();
        let action = allowed(&rt).await;
        rt.begin_execution(action.id, None).unwrap();
        let report = rt
            .interrupt_action(&action.id, "operator", InterruptScope::Action)
            .unwrap();
        assert_eq!(report.sealed.len(), 1);
        assert!(rt.check_interrupt(&action.id).unwrap());
        assert!(rt.complete_execution(&action.id).is_err());
    }

    #[tokio::test]
    async fn agent_halt_suspends_until_resumed() {
        let rt = GovernanceRuntime::new(reader_config()).unwrap();
        let agent = AgentId::from("reader");
        rt.interrupt_agent(&agent, "investigation");

        let action = Action::new("reader", "read", "docs");
        let verdict = rt.evaluate(&action, rt.context(&agent)).await;
        assert_eq!(verdict.kind, VerdictKind::Suspend);
        assert_eq!(verdict.tier, Tier::Halt);
        assert!(verdict.dimensions.is_empty());

        assert!(rt.resume_agent(&agent, "oncall"));
        assert!(!rt.resume_agent(&agent, "oncall"));
        allowed(&rt).await;

        rt.flush_audit().await.unwrap();
        let cleared = rt.audit_query(&AuditQuery::default().kind(AuditRecordKind::HaltCleared));
        assert_eq!(cleared.len(), 1);
    }

    #[tokio::test]
    async fn scope_changes_apply_and_are_audited() {
        let rt = GovernanceRuntime::new(reader_config()).unwrap();
        let agent = AgentId::from("reader");
        let widened = ScopeDefinition::with_actions(["read", "write"]).target("docs");
        let previous = rt
            .configure_scope(&agent, widened, "admin", "quarterly review")
            .unwrap();
        assert!(previous.unwrap().permits_action("read"));

        let action = Action::builder("reader", "write", "docs")
            .param("justification", "fix typo")
            .build();
        let verdict = rt
            .evaluate(&action, rt.context(&agent).with_origin("editor"))
            .await;
        assert_ne!(verdict.tier, Tier::VetoGate);

        rt.flush_audit().await.unwrap();
        let changes = rt.audit_query(&AuditQuery::default().kind(AuditRecordKind::ScopeChanged));
        assert_eq!(changes.len(), 1);
    }

    #[tokio::test]
    async fn malformed_scope_change_is_refused() {
        let rt = GovernanceRuntime::new(reader_config()).unwrap();
        let agent = AgentId::from("reader");
        let broken = ScopeDefinition::with_actions(["read"])
            .target("docs")
            .limit("pages", 0.0)
            .hours(25, 3);

        match rt.configure_scope(&agent, broken, "admin", "typo") {
            Err(RuntimeError::Config(err)) => assert_eq!(err.errors().len(), 2, "{err}"),
            other => panic!("expected a config error, got {other:?}"),
        }
        assert!(rt.scope_for(&agent).resource_limits.is_empty());
        rt.flush_audit().await.unwrap();
        assert!(rt
            .audit_query(&AuditQuery::default().kind(AuditRecordKind::ScopeChanged))
            .is_empty());
    }

    #[tokio::test]
    async fn refused_verdicts_leave_nothing_pending() {
        let rt = GovernanceRuntime::new(reader_config()).unwrap();
        for _ in 0..300 {
            let action = Action::new("reader", "write", "docs");
            rt.evaluate(&action, rt.context(&action.agent_id)).await;
        }
        assert_eq!(rt.pending_approvals(), 0);
        assert_eq!(rt.audit.pending_parents(), 0);
    }

    #[tokio::test]
    async fn refused_reevaluation_withdraws_an_unstarted_approval() {
        let rt = GovernanceRuntime::new(reader_config()).unwrap();
        let action = allowed(&rt).await;
        assert_eq!(rt.pending_approvals(), 1);

        rt.interrupt_agent(&action.agent_id, "investigation");
        let verdict = rt.evaluate(&action, rt.context(&action.agent_id)).await;
        assert_eq!(verdict.kind, VerdictKind::Suspend);
        rt.resume_agent(&action.agent_id, "oncall");

        assert_eq!(rt.pending_approvals(), 0);
        assert_eq!(rt.audit.pending_parents(), 0);
        assert!(matches!(
            rt.begin_execution(action.id, None),
            Err(RuntimeError::NotApproved(_))
        ));
    }

    #[tokio::test]
    async fn unstarted_approval_lapses() {
        let clock = ManualClock::default();
        let mut config = reader_config();
        config.execution.approval_ttl_secs = 60;
        let rt = GovernanceRuntime::builder(config)
            .clock(Arc::new(clock.clone()))
            .build()
            .unwrap();

        let running = allowed(&rt).await;
        rt.begin_execution(running.id, None).unwrap();
        let idle = allowed(&rt).await;
        let late = allowed(&rt).await;
        clock.advance(chrono::Duration::seconds(61));

        assert_eq!(rt.expire_approvals(), 2);
        assert_eq!(rt.pending_approvals(), 1);
        assert_eq!(rt.audit.pending_parents(), 1);
        for action in [&idle, &late] {
            assert!(matches!(
                rt.begin_execution(action.id, None),
                Err(RuntimeError::NotApproved(_))
            ));
        }

        // The running action keeps its approval and its audit parent.
        rt.complete_execution(&running.id).unwrap();
        rt.flush_audit().await.unwrap();
        let records = rt.audit_query(&AuditQuery::for_action(running.id));
        assert_eq!(records[1].parent, Some(records[0].id));
        assert_eq!(rt.pending_approvals(), 0);
    }

    #[tokio::test]
    async fn lapsed_approval_is_refused_at_begin() {
        let clock = ManualClock::default();
        let rt = GovernanceRuntime::builder(reader_config())
            .clock(Arc::new(clock.clone()))
            .build()
            .unwrap();
        let action = allowed(&rt).await;
        clock.advance(rt.config().execution.approval_ttl());

        assert!(matches!(
            rt.begin_execution(action.id, None),
            Err(RuntimeError::NotApproved(_))
        ));
        assert_eq!(rt.pending_approvals(), 0);
    }

    #[tokio::test]
    async fn missing_or_faulty_scorers_fail_closed() {
        let mut registry = uniform(1.0);
        registry.register(Arc::new(FaultyScorer(DimensionId::ScopeCompliance)));
        registry.remove(DimensionId::EthicalAlignment);
        let rt = GovernanceRuntime::builder(reader_config())
            .registry(registry)
            .build()
            .unwrap();

        let action = Action::new("reader", "read", "docs");
        let verdict = rt.evaluate(&action, rt.context(&action.agent_id)).await;
        assert_eq!(verdict.kind, VerdictKind::Deny);
        assert!(verdict.vetoed_by.contains(&DimensionId::ScopeCompliance));
        assert!(verdict.vetoed_by.contains(&DimensionId::EthicalAlignment));
    }
}
