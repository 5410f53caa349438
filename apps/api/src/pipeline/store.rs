//! Aggregate Store: the one structure every worker writes into during a run.
//!
//! Callers only see `reset`, `upsert_shell`, `write_field` and `snapshot`; the lock
//! never leaves this module.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::models::aggregate::{PartialApplicantRecord, SlotRejection};
use crate::models::applicant::ApplicantId;
use crate::models::enrichment::EnrichedRecord;

/// Result of a [`AggregateStore::write_field`] call. Only `Written` changes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    KeyMissing,
    NotScheduled,
    AlreadyWritten,
}

#[derive(Debug, Default)]
pub struct AggregateStore {
    records: RwLock<BTreeMap<ApplicantId, PartialApplicantRecord>>,
}

impl AggregateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every record. Called at the start of each run.
    pub fn reset(&self) {
        self.records.write().clear();
    }

    /// Inserts `record` under its applicant id, or merges it into the existing entry
    /// without discarding slots that are already filled.
    pub fn upsert_shell(&self, record: PartialApplicantRecord) {
        let id = record.identity.id;
        let mut records = self.records.write();
        match records.get_mut(&id) {
            Some(existing) => existing.absorb(record),
            None => {
                records.insert(id, record);
            }
        }
    }

    /// Writes one enrichment slot of an existing entry.
    ///
    /// Never fails the caller: an absent key, an unscheduled kind or a second write to
    /// the same slot is logged and reported through the outcome.
    pub fn write_field(&self, applicant_id: ApplicantId, value: EnrichedRecord) -> WriteOutcome {
        let kind = value.kind();
        let mut records = self.records.write();
        let Some(record) = records.get_mut(&applicant_id) else {
            warn!(%applicant_id, %kind, "aggregate entry missing, dropping enrichment result");
            return WriteOutcome::KeyMissing;
        };
        match record.fill(value) {
            Ok(()) => {
                debug!(%applicant_id, %kind, "aggregate slot written");
                WriteOutcome::Written
            }
            Err(SlotRejection::NotScheduled) => {
                warn!(%applicant_id, %kind, "enrichment result for a kind that was never scheduled");
                WriteOutcome::NotScheduled
            }
            Err(SlotRejection::AlreadyWritten) => {
                warn!(%applicant_id, %kind, "aggregate slot already written, keeping first value");
                WriteOutcome::AlreadyWritten
            }
        }
    }

    /// Owned copy of every record. Meaningful once the run's work has drained.
    pub fn snapshot(&self) -> BTreeMap<ApplicantId, PartialApplicantRecord> {
        self.records.read().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
