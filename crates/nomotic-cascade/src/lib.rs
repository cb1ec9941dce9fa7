//! Decision Cascade for the Nomotic governance engine.
//!
//! Folds the thirteen dimension results and the agent's trust into one
//! verdict:
//!
//! 1. **Veto gate**: any veto from a veto-capable dimension ends evaluation
//!    with DENY (or ESCALATE when every vetoing dimension escalates on veto).
//! 2. **Thresholds**: UCS at or above `allow` is ALLOW, at or below `deny`
//!    is DENY.
//! 3. **Deliberation**: the ambiguous band in between weighs trust, recent
//!    history and the low-scoring dimensions.

#![deny(unsafe_code)]

pub mod cascade;
pub mod error;
pub mod ucs;

pub use cascade::{Decision, DecisionCascade};
pub use error::CascadeError;
pub use ucs::{compute_ucs, trust_pull, weighted_mean};
