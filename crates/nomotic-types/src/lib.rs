//! Core type definitions for the Nomotic governance engine.
//!
//! This crate provides the shared data model and configuration types. No
//! decision logic lives here; every other Nomotic crate depends on it.

pub mod action;
pub mod clock;
pub mod config;
pub mod context;
pub mod dimension;
pub mod error;
pub mod execution;
pub mod ids;
pub mod trust;
pub mod verdict;

// Re-export primary types at crate root for ergonomic use.
pub use action::{Action, ActionBuilder};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    AgentConfig, AggregationSettings, DeliberationSettings, DimensionConfig, EvaluationSettings,
    ExecutionSettings, GovernanceConfig, Thresholds, TrustSettings,
};
pub use context::{AgentContext, ScopeDefinition, Urgency};
pub use dimension::{clamp_score, DimensionId, DimensionResult, UnknownDimension};
pub use error::ConfigError;
pub use execution::{ExecutionState, InterruptScope};
pub use ids::{ActionId, AgentId, AuditRecordId};
pub use trust::{TrustProfile, VerdictRecord};
pub use verdict::{Tier, Verdict, VerdictKind};
