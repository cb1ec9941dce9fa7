use std::io::Write;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{AuditError, AuditResult};
use crate::query::{AuditQuery, AuditStatistics};
use crate::record::{AuditDraft, AuditRecord, GENESIS_DIGEST};

/// Durable destination for audit records.
///
/// The sink owns ordering: it assigns each draft the next sequence number
/// and chains it to the previous record.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, draft: AuditDraft) -> AuditResult<AuditRecord>;
}

/// Append-only in-process audit log with query support.
pub struct InMemoryAuditLog {
    records: RwLock<Vec<AuditRecord>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.read().clone()
    }

    /// Matching records, oldest first.
    pub fn query(&self, query: &AuditQuery) -> Vec<AuditRecord> {
        let records = self.records.read();
        let matching = records.iter().filter(|r| query.matches(r)).cloned();
        match query.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        }
    }

    pub fn statistics(&self) -> AuditStatistics {
        AuditStatistics::from_records(self.records.read().iter())
    }

    /// Re-derive every digest and check each record links to its predecessor.
    pub fn verify_chain(&self) -> AuditResult<()> {
        let records = self.records.read();
        let mut prev = GENESIS_DIGEST.to_string();
        for (expected_seq, record) in records.iter().enumerate() {
            let sequence = record.sequence;
            if sequence != expected_seq as u64 {
                return Err(AuditError::ChainBroken {
                    sequence,
                    detail: format!("expected sequence {expected_seq}"),
                });
            }
            if record.prev_digest != prev {
                return Err(AuditError::ChainBroken {
                    sequence,
                    detail: "previous digest mismatch".into(),
                });
            }
            if record.recompute_digest()? != record.digest {
                return Err(AuditError::ChainBroken {
                    sequence,
                    detail: "content digest mismatch".into(),
                });
            }
            prev = record.digest.clone();
        }
        Ok(())
    }

    /// Write matching records as JSON lines. Returns the number written.
    pub fn export_jsonl<W: Write>(&self, query: &AuditQuery, mut out: W) -> AuditResult<usize> {
        let records = self.query(query);
        for record in &records {
            serde_json::to_writer(&mut out, record)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(records.len())
    }

    #[cfg(test)]
    pub(crate) fn tamper(&self, sequence: usize, f: impl FnOnce(&mut AuditRecord)) {
        if let Some(record) = self.records.write().get_mut(sequence) {
            f(record);
        }
    }
}

impl Default for InMemoryAuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditLog {
    async fn append(&self, draft: AuditDraft) -> AuditResult<AuditRecord> {
        let mut records = self.records.write();
        let (sequence, prev) = match records.last() {
            Some(last) => (last.sequence + 1, last.digest.clone()),
            None => (0, GENESIS_DIGEST.to_string()),
        };
        let record = AuditRecord::seal(draft, sequence, &prev)?;
        records.push(record.clone());
        Ok(record)
    }
}
