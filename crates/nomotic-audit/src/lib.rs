//! Audit Emitter for the Nomotic governance engine.
//!
//! Every evaluation, completion, interruption, scope change and halt
//! release becomes an append-only [`AuditRecord`]. Records are sequenced
//! and BLAKE3-chained by the sink, so any later edit is detectable with
//! [`InMemoryAuditLog::verify_chain`]. Emission is fire-and-forget relative
//! to the decision path.

pub mod emitter;
pub mod error;
pub mod query;
pub mod record;
pub mod sink;

pub use emitter::AuditEmitter;
pub use error::{AuditError, AuditResult};
pub use query::{AuditQuery, AuditStatistics};
pub use record::{AuditDraft, AuditPayload, AuditRecord, AuditRecordKind, GENESIS_DIGEST};
pub use sink::{AuditSink, InMemoryAuditLog};
