#![allow(dead_code)]

use std::sync::Arc;

use nomotic_dimensions::mocks::FixedScorer;
use nomotic_dimensions::DimensionRegistry;
use nomotic_types::{AgentConfig, DimensionId, GovernanceConfig, ScopeDefinition};

/// Install a subscriber once so `RUST_LOG=debug cargo test` shows the trace.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// `reader` may read `docs` and touch the `shared` boundary target.
/// `analyst` may read or query `reports` but starts at trust 0.01.
pub fn fleet_config() -> GovernanceConfig {
    GovernanceConfig::default()
        .with_agent(
            "reader",
            AgentConfig::new(
                ScopeDefinition::with_actions(["read"])
                    .target("docs")
                    .boundary("shared"),
            ),
        )
        .with_agent(
            "analyst",
            AgentConfig {
                initial_trust: Some(0.01),
                ..AgentConfig::new(
                    ScopeDefinition::with_actions(["read", "query"]).target("reports"),
                )
            },
        )
}

/// Every dimension returns `score`.
pub fn uniform(score: f64) -> DimensionRegistry {
    let mut registry = DimensionRegistry::new();
    for dimension in DimensionId::ALL {
        registry.register(Arc::new(FixedScorer::new(dimension, score)));
    }
    registry
}
