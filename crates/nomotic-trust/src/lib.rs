//! Trust Store for the Nomotic governance engine.
//!
//! Trust is a bounded scalar per agent. It grows slowly with successful
//! completions, drops sharply on violations and interruptions, and drifts
//! back toward a baseline when the agent goes idle.

pub mod decay;
pub mod error;
pub mod store;

pub use error::{TrustError, TrustResult};
pub use store::{TrustEvent, TrustStore, TrustUpdate};
