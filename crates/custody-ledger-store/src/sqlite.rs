//! SQLite implementation of the ChainStore trait.
//!
//! This is the primary storage backend for the custody ledger. It uses
//! rusqlite with bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::{debug, warn};

use custody_ledger_core::{
    check_extends, decode_payload, payload_bytes, LinkHash, MalformedRecord, Record, RecordHash,
    StoredRecord, ENCODING_VERSION,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::ChainStore;

const SELECT_RECORD: &str =
    "SELECT position, timestamp, payload, link_hash, self_hash, encoding_version FROM records";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file (and its parent directory) and runs migrations if it
    /// doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened sqlite store");
        Self::init(conn)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

/// A `records` row as stored, before decoding.
///
/// Columns other than the position are read as dynamically typed values,
/// so a row with a wrongly typed column still comes back and can be
/// reported as malformed.
struct RecordRow {
    position: u64,
    timestamp: Value,
    payload: Value,
    link_hash: Value,
    self_hash: Value,
    encoding_version: Value,
}

impl RecordRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let position: i64 = row.get("position")?;
        Ok(Self {
            position: u64::try_from(position)
                .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, position))?,
            timestamp: row.get("timestamp")?,
            payload: row.get("payload")?,
            link_hash: row.get("link_hash")?,
            self_hash: row.get("self_hash")?,
            encoding_version: row.get("encoding_version")?,
        })
    }

    fn decode(&self) -> std::result::Result<Record, String> {
        match self.encoding_version {
            Value::Integer(v) if v == ENCODING_VERSION as i64 => {}
            Value::Integer(v) => return Err(format!("unsupported encoding version {v}")),
            _ => return Err("encoding_version is not an integer".into()),
        }

        let timestamp = match self.timestamp {
            Value::Integer(ts) => ts,
            _ => return Err("timestamp is not an integer".into()),
        };

        let payload = match &self.payload {
            Value::Blob(bytes) => decode_payload(bytes).map_err(|e| format!("payload: {e}"))?,
            _ => return Err("payload is not a blob".into()),
        };

        let link_hash = match &self.link_hash {
            Value::Null => LinkHash::Genesis,
            other => LinkHash::Record(column_hash(other, "link_hash")?),
        };

        Ok(Record {
            position: self.position,
            timestamp,
            payload,
            link_hash,
            self_hash: column_hash(&self.self_hash, "self_hash")?,
        })
    }

    fn into_stored(self) -> StoredRecord {
        match self.decode() {
            Ok(record) => StoredRecord::Decoded(record),
            Err(error) => {
                debug!(position = self.position, %error, "undecodable record row");
                StoredRecord::Malformed(MalformedRecord {
                    position: self.position,
                    self_hash: column_hash(&self.self_hash, "self_hash").ok(),
                    error,
                })
            }
        }
    }

    fn into_record(self) -> Result<Record> {
        match self.into_stored() {
            StoredRecord::Decoded(record) => Ok(record),
            StoredRecord::Malformed(row) => Err(StoreError::Malformed {
                position: row.position,
                detail: row.error,
            }),
        }
    }
}

fn column_hash(value: &Value, column: &str) -> std::result::Result<RecordHash, String> {
    match value {
        Value::Blob(bytes) => RecordHash::try_from(bytes.as_slice())
            .map_err(|_| format!("{column} is {} bytes, expected 32", bytes.len())),
        _ => Err(format!("{column} is not a blob")),
    }
}

fn query_rows(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<RecordRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, RecordRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn query_all(conn: &Connection) -> Result<Vec<RecordRow>> {
    query_rows(conn, &format!("{SELECT_RECORD} ORDER BY position"), [])
}

fn query_tail(conn: &Connection) -> Result<Option<Record>> {
    conn.query_row(
        &format!("{SELECT_RECORD} ORDER BY position DESC LIMIT 1"),
        [],
        RecordRow::from_row,
    )
    .optional()?
    .map(RecordRow::into_record)
    .transpose()
}

fn insert_record(tx: &Transaction<'_>, record: &Record) -> Result<()> {
    tx.execute(
        "INSERT INTO records (
            position, timestamp, payload, link_hash, self_hash, encoding_version, appended_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.position as i64,
            record.timestamp,
            payload_bytes(&record.payload),
            record.link_hash.record_hash().map(|h| h.as_bytes().as_slice()),
            record.self_hash.as_bytes().as_slice(),
            ENCODING_VERSION as i64,
            now_millis(),
        ],
    )?;
    Ok(())
}

#[async_trait]
impl ChainStore for SqliteStore {
    async fn append(&self, record: &Record) -> Result<()> {
        let record = record.clone();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            let tail = query_tail(&tx)?;
            if let Err(err) = check_extends(tail.as_ref(), &record) {
                warn!(position = record.position, error = %err, "rejected append");
                return Err(StoreError::Rejected(err));
            }

            insert_record(&tx, &record)?;
            tx.commit()?;

            debug!(position = record.position, "appended record");
            Ok(())
        })
        .await
    }

    async fn tail(&self) -> Result<Option<Record>> {
        self.blocking(|conn| query_tail(conn)).await
    }

    async fn all(&self) -> Result<Vec<Record>> {
        self.blocking(|conn| {
            query_all(conn)?
                .into_iter()
                .map(RecordRow::into_record)
                .collect()
        })
        .await
    }

    async fn entries(&self) -> Result<Vec<StoredRecord>> {
        self.blocking(|conn| Ok(query_all(conn)?.into_iter().map(RecordRow::into_stored).collect()))
            .await
    }

    async fn filter_by_field(&self, field: &str, value: &str) -> Result<Vec<Record>> {
        let field = field.to_string();
        let value = value.to_string();

        self.blocking(move |conn| {
            Ok(query_all(conn)?
                .into_iter()
                .filter_map(|row| row.into_stored().into_record())
                .filter(|record| record.payload.field_equals(&field, &value))
                .collect())
        })
        .await
    }

    async fn get(&self, position: u64) -> Result<Option<Record>> {
        let Ok(position) = i64::try_from(position) else {
            return Ok(None);
        };

        self.blocking(move |conn| {
            conn.query_row(
                &format!("{SELECT_RECORD} WHERE position = ?1"),
                params![position],
                RecordRow::from_row,
            )
            .optional()?
            .map(RecordRow::into_record)
            .transpose()
        })
        .await
    }

    async fn len(&self) -> Result<u64> {
        self.blocking(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }
}

/// Current local time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use custody_ledger_core::{
        validate_chain, validate_stored, FailureReason, FieldValue, Payload, RecordBuilder,
        ValidationError,
    };

    fn event(product_id: &str, status: &str) -> Payload {
        Payload::new()
            .with("product_id", product_id)
            .with("status", status)
    }

    /// Run raw SQL against the store's connection with the append-only
    /// triggers out of the way.
    fn rewrite(store: &SqliteStore, sql: &str) {
        let conn = store.conn.lock().unwrap();
        conn.execute_batch("DROP TRIGGER IF EXISTS records_no_update")
            .unwrap();
        conn.execute_batch(sql).unwrap();
    }

    async fn append_event(store: &SqliteStore, product_id: &str, status: &str) -> Record {
        let tail = store.tail().await.unwrap();
        let record = RecordBuilder::extending(tail.as_ref())
            .timestamp(1_736_870_400_000 + store.len().await.unwrap() as i64)
            .payload(event(product_id, status))
            .build();
        store.append(&record).await.unwrap();
        record
    }

    #[tokio::test]
    async fn test_append_and_read_back() {
        let store = SqliteStore::open_memory().unwrap();
        assert!(store.is_empty().await.unwrap());

        let genesis = append_event(&store, "LOT-1", "MANUFACTURED").await;
        let second = append_event(&store, "LOT-1", "SHIPPED").await;

        assert_eq!(store.len().await.unwrap(), 2);
        assert_eq!(store.tail().await.unwrap(), Some(second.clone()));
        assert_eq!(store.get(0).await.unwrap(), Some(genesis.clone()));
        assert_eq!(store.get(5).await.unwrap(), None);
        assert_eq!(store.get(u64::MAX).await.unwrap(), None);

        let all = store.all().await.unwrap();
        assert_eq!(all, vec![genesis, second]);
        assert!(validate_chain(&all).valid);
    }

    #[tokio::test]
    async fn test_payload_survives_storage() {
        let store = SqliteStore::open_memory().unwrap();

        let mut location = std::collections::BTreeMap::new();
        location.insert("lat".to_string(), FieldValue::Float(13.7563));
        location.insert("lng".to_string(), FieldValue::Float(100.5018));
        let payload = event("LOT-1", "MANUFACTURED")
            .with("qty", 12i64)
            .with("signature", FieldValue::Null)
            .with("location", FieldValue::Map(location));

        let record = RecordBuilder::genesis().timestamp(7).payload(payload).build();
        store.append(&record).await.unwrap();

        let stored = store.get(0).await.unwrap().unwrap();
        assert_eq!(stored, record);
        assert!(stored.is_intact());
    }

    #[tokio::test]
    async fn test_filter_by_field() {
        let store = SqliteStore::open_memory().unwrap();
        append_event(&store, "LOT-1", "MANUFACTURED").await;
        append_event(&store, "LOT-2", "MANUFACTURED").await;
        append_event(&store, "LOT-1", "SHIPPED").await;
        append_event(&store, "LOT-1", "DELIVERED").await;

        let lot1 = store.filter_by_field("product_id", "LOT-1").await.unwrap();
        let positions: Vec<u64> = lot1.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![0, 2, 3]);

        let manufactured = store.filter_by_field("status", "MANUFACTURED").await.unwrap();
        assert_eq!(manufactured.len(), 2);

        assert!(store
            .filter_by_field("product_id", "LOT-9")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_rejected_append_stores_nothing() {
        let store = SqliteStore::open_memory().unwrap();
        let genesis = append_event(&store, "LOT-1", "MANUFACTURED").await;

        let mut forged = RecordBuilder::after(&genesis)
            .payload(event("LOT-1", "SHIPPED"))
            .build();
        forged.payload.insert("status", "STOLEN");

        let err = store.append(&forged).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Rejected(ValidationError::ContentMismatch { position: 1 })
        ));
        assert_eq!(store.len().await.unwrap(), 1);
        assert!(store
            .filter_by_field("status", "STOLEN")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_reopen_persists_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            append_event(&store, "LOT-1", "MANUFACTURED").await;
            append_event(&store, "LOT-1", "SHIPPED").await;
        }

        let store = SqliteStore::open(&path).unwrap();
        let all = store.all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(validate_chain(&all).valid);

        append_event(&store, "LOT-1", "DELIVERED").await;
        assert_eq!(store.len().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_readers() {
        let store = Arc::new(SqliteStore::open_memory().unwrap());
        for status in ["MANUFACTURED", "SHIPPED", "DELIVERED"] {
            append_event(&store, "LOT-1", status).await;
        }

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.all().await.unwrap().len() })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 3);
        }
    }

    #[tokio::test]
    async fn test_short_link_hash_reads_as_malformed() {
        let store = SqliteStore::open_memory().unwrap();
        append_event(&store, "LOT-1", "MANUFACTURED").await;
        let shipped = append_event(&store, "LOT-1", "SHIPPED").await;
        append_event(&store, "LOT-1", "DELIVERED").await;

        rewrite(&store, "UPDATE records SET link_hash = x'00' WHERE position = 1");

        let entries = store.entries().await.unwrap();
        assert_eq!(entries.len(), 3);
        match &entries[1] {
            StoredRecord::Malformed(row) => {
                assert_eq!(row.position, 1);
                assert_eq!(row.self_hash, Some(shipped.self_hash));
                assert_eq!(row.error, "link_hash is 1 bytes, expected 32");
            }
            other => panic!("expected a malformed row, got {other:?}"),
        }

        let verdict = validate_stored(&entries);
        assert_eq!(verdict.first_failure_position, Some(1));
        assert_eq!(verdict.reason, Some(FailureReason::Malformed));

        assert!(matches!(
            store.all().await,
            Err(StoreError::Malformed { position: 1, .. })
        ));
        assert!(matches!(
            store.get(1).await,
            Err(StoreError::Malformed { position: 1, .. })
        ));
        assert!(store.get(2).await.unwrap().is_some());

        let lot1 = store.filter_by_field("product_id", "LOT-1").await.unwrap();
        let positions: Vec<u64> = lot1.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![0, 2]);
    }

    #[tokio::test]
    async fn test_wrongly_typed_columns_read_as_malformed() {
        let store = SqliteStore::open_memory().unwrap();
        append_event(&store, "LOT-1", "MANUFACTURED").await;
        append_event(&store, "LOT-1", "SHIPPED").await;

        rewrite(
            &store,
            "UPDATE records SET payload = 'not cbor' WHERE position = 0;
             UPDATE records SET timestamp = 'yesterday' WHERE position = 1;",
        );

        let errors: Vec<String> = store
            .entries()
            .await
            .unwrap()
            .into_iter()
            .map(|entry| match entry {
                StoredRecord::Malformed(row) => row.error,
                StoredRecord::Decoded(record) => panic!("{record:?} should not decode"),
            })
            .collect();
        assert_eq!(
            errors,
            vec!["payload is not a blob", "timestamp is not an integer"]
        );

        // a malformed tail blocks further appends
        let next = RecordBuilder::genesis().payload(event("LOT-1", "DELIVERED")).build();
        assert!(matches!(
            store.append(&next).await,
            Err(StoreError::Malformed { position: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_filter_reads_stored_payload() {
        let store = SqliteStore::open_memory().unwrap();
        append_event(&store, "LOT-1", "MANUFACTURED").await;
        append_event(&store, "LOT-1", "SHIPPED").await;
        append_event(&store, "LOT-1", "DELIVERED").await;

        let forged = hex::encode(payload_bytes(&event("LOT-X", "SHIPPED")));
        rewrite(
            &store,
            &format!("UPDATE records SET payload = x'{forged}' WHERE position = 1"),
        );

        let lot_x = store.filter_by_field("product_id", "LOT-X").await.unwrap();
        assert_eq!(lot_x.len(), 1);
        assert_eq!(lot_x[0].position, 1);
        assert_eq!(lot_x[0].payload.get_text("product_id"), Some("LOT-X"));
        assert!(!lot_x[0].is_intact());

        let lot1 = store.filter_by_field("product_id", "LOT-1").await.unwrap();
        let positions: Vec<u64> = lot1.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![0, 2]);

        let verdict = validate_chain(&store.all().await.unwrap());
        assert_eq!(verdict.first_failure_position, Some(1));
    }
}
