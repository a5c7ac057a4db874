//! ChainStore trait: the abstract interface for record persistence.
//!
//! This trait allows the ledger to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use std::sync::Arc;

use async_trait::async_trait;
use custody_ledger_core::{Record, StoredRecord};

use crate::error::Result;

/// The ChainStore trait: async interface for ordered record persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Contract
///
/// - **Insertion order**: every read returns records ascending by position.
/// - **Strict reads**: `tail`, `all`, `get` fail with [`StoreError::Malformed`]
///   on a row that does not decode. [`entries`] reads the same rows without
///   failing, and `filter_by_field` skips rows it cannot read.
/// - **Append-only**: no method updates or deletes a stored record.
/// - **Atomic linkage**: `append` checks, under the store's own lock, that
///   the record extends the current tail (or is a genesis record on an
///   empty store) and fails with [`StoreError::Rejected`] otherwise.
///   Nothing is stored when `append` fails.
///
/// [`StoreError::Rejected`]: crate::StoreError::Rejected
/// [`StoreError::Malformed`]: crate::StoreError::Malformed
/// [`entries`]: ChainStore::entries
#[async_trait]
pub trait ChainStore: Send + Sync {
    /// Durably append a record to the end of the chain.
    async fn append(&self, record: &Record) -> Result<()>;

    /// Get the record with the highest position, if any.
    async fn tail(&self) -> Result<Option<Record>>;

    /// Get every record, ordered by position.
    ///
    /// This is a single consistent read.
    async fn all(&self) -> Result<Vec<Record>>;

    /// Get every stored row, ordered by position, keeping rows that no
    /// longer decode as [`StoredRecord::Malformed`].
    ///
    /// Stores that cannot hold an undecodable row can rely on the default.
    async fn entries(&self) -> Result<Vec<StoredRecord>> {
        Ok(self.all().await?.into_iter().map(StoredRecord::from).collect())
    }

    /// Get records whose top-level text field `field` equals `value`,
    /// ordered by position.
    ///
    /// Matching is done on the stored payload itself, so the result always
    /// agrees with what the records say.
    async fn filter_by_field(&self, field: &str, value: &str) -> Result<Vec<Record>>;

    /// Get the record at a position.
    async fn get(&self, position: u64) -> Result<Option<Record>>;

    /// Number of stored records.
    async fn len(&self) -> Result<u64>;

    /// Check if the store holds no records.
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

#[async_trait]
impl<S: ChainStore + ?Sized> ChainStore for Arc<S> {
    async fn append(&self, record: &Record) -> Result<()> {
        (**self).append(record).await
    }

    async fn tail(&self) -> Result<Option<Record>> {
        (**self).tail().await
    }

    async fn all(&self) -> Result<Vec<Record>> {
        (**self).all().await
    }

    async fn entries(&self) -> Result<Vec<StoredRecord>> {
        (**self).entries().await
    }

    async fn filter_by_field(&self, field: &str, value: &str) -> Result<Vec<Record>> {
        (**self).filter_by_field(field, value).await
    }

    async fn get(&self, position: u64) -> Result<Option<Record>> {
        (**self).get(position).await
    }

    async fn len(&self) -> Result<u64> {
        (**self).len().await
    }
}
