//! The Ledger: append, validate and query a hash-chained record log.
//!
//! The Ledger brings together a [`ChainStore`], a payload schema and a
//! clock into the operations callers use.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use custody_ledger_core::{
    audit_stored, validate_stored, ChainFault, CustodyEvent, Payload, Record, RecordBuilder,
    RecordHash, StoredRecord, Verdict,
};
use custody_ledger_store::{ChainStore, StoreError};

use crate::clock::{Clock, SystemClock};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};

/// One entry of a subject's custody timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub position: u64,
    pub timestamp: i64,
    pub self_hash: RecordHash,
    /// Whether the record still matches its own hash.
    pub intact: bool,
    /// The record read as a custody event, if it is one.
    pub event: Option<CustodyEvent>,
}

impl From<&Record> for TimelineEntry {
    fn from(record: &Record) -> Self {
        Self {
            position: record.position,
            timestamp: record.timestamp,
            self_hash: record.self_hash,
            intact: record.is_intact(),
            event: CustodyEvent::try_from(&record.payload).ok(),
        }
    }
}

/// The main Ledger struct.
///
/// Appends through one `Ledger` are serialized, so two concurrent appends
/// never read the same tail. Several ledgers sharing one store are kept
/// apart by the store itself, which rejects a record that does not extend
/// its current tail.
pub struct Ledger<S: ChainStore> {
    /// The storage backend.
    store: Arc<S>,
    /// Configuration.
    config: LedgerConfig,
    /// Source of record timestamps.
    clock: Arc<dyn Clock>,
    /// Held from tail read to store append.
    append_lock: Mutex<()>,
}

impl<S: ChainStore> Ledger<S> {
    /// Create a new ledger over a store.
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self {
            store: Arc::new(store),
            config,
            clock: Arc::new(SystemClock),
            append_lock: Mutex::new(()),
        }
    }

    /// Replace the clock used to timestamp new records.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Append
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a payload to the chain.
    ///
    /// The payload is checked against the schema before anything is hashed.
    /// The new record links to the current tail (or is the genesis record
    /// on an empty chain) and is only returned once durably stored. A tail
    /// row that no longer decodes is reported as tampered.
    pub async fn append(&self, payload: Payload) -> Result<Record> {
        self.config.schema.check(&payload)?;

        let _guard = self.append_lock.lock().await;

        let tail = match self.store.tail().await {
            Ok(tail) => tail,
            Err(StoreError::Malformed { position, detail }) => {
                warn!(position, %detail, "refusing to extend undecodable tail");
                return Err(LedgerError::TailTampered { position });
            }
            Err(err) => return Err(err.into()),
        };
        if let Some(tail) = &tail {
            if self.config.verify_tail_on_append && !tail.is_intact() {
                warn!(position = tail.position, "refusing to extend tampered tail");
                return Err(LedgerError::TailTampered {
                    position: tail.position,
                });
            }
        }

        let record = RecordBuilder::extending(tail.as_ref())
            .timestamp(self.clock.now_millis())
            .payload(payload)
            .build();

        self.store.append(&record).await?;

        info!(
            position = record.position,
            self_hash = %record.self_hash,
            "appended record"
        );
        Ok(record)
    }

    /// Append a typed custody event.
    pub async fn append_event(&self, event: CustodyEvent) -> Result<Record> {
        self.append(event.into_payload()).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Validation
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate the whole chain, stopping at the first failure.
    ///
    /// Stored rows that no longer decode are part of the verdict, not an
    /// error.
    pub async fn validate(&self) -> Result<Verdict> {
        let entries = self.store.entries().await?;
        let verdict = validate_stored(&entries);

        match verdict.failure() {
            None => debug!(length = verdict.length, "chain valid"),
            Some(fault) => warn!(
                length = verdict.length,
                position = fault.position,
                reason = %fault.reason,
                "chain invalid"
            ),
        }
        Ok(verdict)
    }

    /// Validate the whole chain, reporting every failure.
    pub async fn audit(&self) -> Result<Vec<ChainFault>> {
        let entries = self.store.entries().await?;
        let faults = audit_stored(&entries);

        if !faults.is_empty() {
            warn!(length = entries.len(), faults = faults.len(), "chain audit found faults");
        }
        Ok(faults)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Records whose subject field equals `subject`, ascending by position.
    ///
    /// An unknown subject yields an empty list.
    pub async fn chain_for(&self, subject: &str) -> Result<Vec<Record>> {
        Ok(self
            .store
            .filter_by_field(&self.config.subject_field, subject)
            .await?)
    }

    /// The custody timeline of a subject.
    pub async fn timeline(&self, subject: &str) -> Result<Vec<TimelineEntry>> {
        let records = self.chain_for(subject).await?;
        Ok(records.iter().map(TimelineEntry::from).collect())
    }

    /// The full chain, ascending by position.
    ///
    /// Fails if any stored row no longer decodes; see [`Ledger::entries`].
    pub async fn all_records(&self) -> Result<Vec<Record>> {
        Ok(self.store.all().await?)
    }

    /// Every stored row, ascending by position, including rows that no
    /// longer decode.
    pub async fn entries(&self) -> Result<Vec<StoredRecord>> {
        Ok(self.store.entries().await?)
    }

    /// The record at a position.
    pub async fn get(&self, position: u64) -> Result<Option<Record>> {
        Ok(self.store.get(position).await?)
    }

    /// The most recent record.
    pub async fn tail(&self) -> Result<Option<Record>> {
        Ok(self.store.tail().await?)
    }

    /// Number of records in the chain.
    pub async fn len(&self) -> Result<u64> {
        Ok(self.store.len().await?)
    }

    /// Check if the chain holds no records.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.store.is_empty().await?)
    }
}
