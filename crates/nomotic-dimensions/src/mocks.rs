//! Scorers with scripted behavior for exercising the evaluator and the
//! layers above it.

use std::time::Duration;

use async_trait::async_trait;
use nomotic_types::{Action, AgentContext, DimensionId, DimensionResult, ScopeDefinition};

use crate::error::ScorerFault;
use crate::traits::DimensionScorer;

/// Always returns the same result.
pub struct FixedScorer {
    result: DimensionResult,
}

impl FixedScorer {
    pub fn new(dimension: DimensionId, score: f64) -> Self {
        let result = if score >= 1.0 {
            DimensionResult::pass(dimension)
        } else {
            DimensionResult::concern(dimension, score, "fixed score")
        };
        Self { result }
    }

    pub fn veto(dimension: DimensionId) -> Self {
        Self {
            result: DimensionResult::veto(dimension, "fixed veto"),
        }
    }

    /// Returns `result` verbatim, even if it names another dimension or
    /// carries an out-of-range score.
    pub fn raw(result: DimensionResult) -> Self {
        Self { result }
    }
}

#[async_trait]
impl DimensionScorer for FixedScorer {
    fn dimension(&self) -> DimensionId {
        self.result.dimension
    }

    async fn score(
        &self,
        _action: &Action,
        _context: &AgentContext,
        _scope: &ScopeDefinition,
    ) -> Result<DimensionResult, ScorerFault> {
        Ok(self.result.clone())
    }
}

/// Fails every call.
pub struct FaultyScorer(pub DimensionId);

#[async_trait]
impl DimensionScorer for FaultyScorer {
    fn dimension(&self) -> DimensionId {
        self.0
    }

    async fn score(
        &self,
        _action: &Action,
        _context: &AgentContext,
        _scope: &ScopeDefinition,
    ) -> Result<DimensionResult, ScorerFault> {
        Err(ScorerFault::Internal("scripted failure".into()))
    }
}

/// Sleeps before passing.
pub struct SlowScorer {
    pub dimension: DimensionId,
    pub delay: Duration,
}

#[async_trait]
impl DimensionScorer for SlowScorer {
    fn dimension(&self) -> DimensionId {
        self.dimension
    }

    async fn score(
        &self,
        _action: &Action,
        _context: &AgentContext,
        _scope: &ScopeDefinition,
    ) -> Result<DimensionResult, ScorerFault> {
        tokio::time::sleep(self.delay).await;
        Ok(DimensionResult::pass(self.dimension))
    }
}

pub struct PanickingScorer(pub DimensionId);

#[async_trait]
impl DimensionScorer for PanickingScorer {
    fn dimension(&self) -> DimensionId {
        self.0
    }

    async fn score(
        &self,
        _action: &Action,
        _context: &AgentContext,
        _scope: &ScopeDefinition,
    ) -> Result<DimensionResult, ScorerFault> {
        panic!("scorer for {} blew up", self.0)
    }
}
