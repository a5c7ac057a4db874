//! In-memory implementation of the ChainStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use custody_ledger_core::{check_extends, Record};
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::traits::ChainStore;

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    /// Records ordered by position; `records[i].position == i`.
    records: RwLock<Vec<Record>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Record>>> {
        self.records.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Record>>> {
        self.records.write().map_err(|_| StoreError::Poisoned)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainStore for MemoryStore {
    async fn append(&self, record: &Record) -> Result<()> {
        let mut records = self.write()?;

        if let Err(err) = check_extends(records.last(), record) {
            warn!(position = record.position, error = %err, "rejected append");
            return Err(StoreError::Rejected(err));
        }

        records.push(record.clone());
        debug!(position = record.position, "appended record");
        Ok(())
    }

    async fn tail(&self) -> Result<Option<Record>> {
        Ok(self.read()?.last().cloned())
    }

    async fn all(&self) -> Result<Vec<Record>> {
        Ok(self.read()?.clone())
    }

    async fn filter_by_field(&self, field: &str, value: &str) -> Result<Vec<Record>> {
        Ok(self
            .read()?
            .iter()
            .filter(|r| r.payload.field_equals(field, value))
            .cloned()
            .collect())
    }

    async fn get(&self, position: u64) -> Result<Option<Record>> {
        let records = self.read()?;
        Ok(usize::try_from(position)
            .ok()
            .and_then(|i| records.get(i))
            .cloned())
    }

    async fn len(&self) -> Result<u64> {
        Ok(self.read()?.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custody_ledger_core::{validate_chain, Payload, RecordBuilder, ValidationError};

    fn event(product_id: &str, status: &str) -> Payload {
        Payload::new()
            .with("product_id", product_id)
            .with("status", status)
    }

    async fn append_event(store: &MemoryStore, product_id: &str, status: &str) -> Record {
        let tail = store.tail().await.unwrap();
        let record = RecordBuilder::extending(tail.as_ref())
            .timestamp(1000 + store.len().await.unwrap() as i64)
            .payload(event(product_id, status))
            .build();
        store.append(&record).await.unwrap();
        record
    }

    #[tokio::test]
    async fn test_append_and_read() {
        let store = MemoryStore::new();
        assert!(store.is_empty().await.unwrap());
        assert!(store.tail().await.unwrap().is_none());

        let genesis = append_event(&store, "LOT-1", "MANUFACTURED").await;
        let second = append_event(&store, "LOT-1", "SHIPPED").await;

        assert_eq!(store.len().await.unwrap(), 2);
        assert_eq!(store.tail().await.unwrap(), Some(second.clone()));
        assert_eq!(store.get(0).await.unwrap(), Some(genesis));
        assert_eq!(store.get(7).await.unwrap(), None);
        assert_eq!(store.all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_filter_by_field() {
        let store = MemoryStore::new();
        append_event(&store, "LOT-1", "MANUFACTURED").await;
        append_event(&store, "LOT-2", "MANUFACTURED").await;
        append_event(&store, "LOT-1", "SHIPPED").await;

        let lot1 = store.filter_by_field("product_id", "LOT-1").await.unwrap();
        let positions: Vec<u64> = lot1.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![0, 2]);

        assert!(store
            .filter_by_field("product_id", "LOT-9")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_rejects_record_not_extending_tail() {
        let store = MemoryStore::new();
        let genesis = append_event(&store, "LOT-1", "MANUFACTURED").await;

        // A second genesis would fork the chain
        let fork = RecordBuilder::genesis()
            .payload(event("LOT-1", "SHIPPED"))
            .build();
        let err = store.append(&fork).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Rejected(ValidationError::OutOfSequence { expected: 1, got: 0 })
        ));

        // A stale successor of the genesis, after the chain moved on
        let first = RecordBuilder::after(&genesis).timestamp(1).build();
        let stale = RecordBuilder::after(&genesis).timestamp(2).build();
        store.append(&first).await.unwrap();
        assert!(matches!(
            store.append(&stale).await,
            Err(StoreError::Rejected(_))
        ));

        assert_eq!(store.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_in_place_tamper_detected() {
        let store = MemoryStore::new();
        append_event(&store, "LOT-1", "MANUFACTURED").await;
        append_event(&store, "LOT-1", "SHIPPED").await;

        store.records.write().unwrap()[0]
            .payload
            .insert("status", "STOLEN");

        let verdict = validate_chain(&store.all().await.unwrap());
        assert!(!verdict.valid);
        assert_eq!(verdict.first_failure_position, Some(0));
    }
}
