//! Dimension Evaluator for the Nomotic governance engine.
//!
//! Every action is scored independently along thirteen concern axes. Each
//! axis is a [`DimensionScorer`]; the [`DimensionEvaluator`] fans out to all
//! of them concurrently and guarantees one result per dimension even when a
//! scorer errors, panics or hangs.
//!
//! ```text
//! Action ──► DimensionEvaluator ──┬──► scope_compliance      ──┐
//!                                 ├──► authority_verification ─┤
//!                                 ├──► ...                     ├──► Vec<DimensionResult>
//!                                 └──► ethical_alignment     ──┘
//! ```

pub mod error;
pub mod evaluator;
pub mod mocks;
pub mod registry;
pub mod scorers;
pub mod traits;

pub use error::ScorerFault;
pub use evaluator::DimensionEvaluator;
pub use registry::DimensionRegistry;
pub use scorers::StaticIncidentFeed;
pub use traits::{DimensionScorer, IncidentFeed, IncidentMatch};
