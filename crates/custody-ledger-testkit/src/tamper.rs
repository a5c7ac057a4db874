//! Direct tampering with a SQLite ledger.
//!
//! Opens its own connection to the database file and drops the
//! append-only triggers, so tests can play the part of someone editing
//! storage behind the ledger's back.

use std::path::Path;

use custody_ledger_core::{payload_bytes, LinkHash, Payload, RecordHash};
use rusqlite::{params, Connection};

/// A raw connection to a ledger database with append-only triggers removed.
pub struct SqliteTamper {
    conn: Connection,
}

impl SqliteTamper {
    /// Open the database at `path` and remove its append-only triggers.
    pub fn open(path: impl AsRef<Path>) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "DROP TRIGGER IF EXISTS records_no_update;
             DROP TRIGGER IF EXISTS records_no_delete;",
        )?;
        Ok(Self { conn })
    }

    /// Replace a record's payload, leaving its hashes untouched.
    pub fn set_payload(&self, position: u64, payload: &Payload) -> rusqlite::Result<usize> {
        self.conn.execute(
            "UPDATE records SET payload = ?1 WHERE position = ?2",
            params![payload_bytes(payload), position as i64],
        )
    }

    /// Replace a record's payload column with arbitrary bytes.
    pub fn set_raw_payload(&self, position: u64, bytes: &[u8]) -> rusqlite::Result<usize> {
        self.conn.execute(
            "UPDATE records SET payload = ?1 WHERE position = ?2",
            params![bytes, position as i64],
        )
    }

    /// Replace a record's timestamp.
    pub fn set_timestamp(&self, position: u64, timestamp: i64) -> rusqlite::Result<usize> {
        self.conn.execute(
            "UPDATE records SET timestamp = ?1 WHERE position = ?2",
            params![timestamp, position as i64],
        )
    }

    /// Replace a record's link hash.
    pub fn set_link_hash(&self, position: u64, link_hash: &LinkHash) -> rusqlite::Result<usize> {
        self.conn.execute(
            "UPDATE records SET link_hash = ?1 WHERE position = ?2",
            params![
                link_hash.record_hash().map(|h| h.as_bytes().as_slice()),
                position as i64
            ],
        )
    }

    /// Replace a record's link hash column with arbitrary bytes.
    pub fn set_raw_link_hash(&self, position: u64, bytes: &[u8]) -> rusqlite::Result<usize> {
        self.conn.execute(
            "UPDATE records SET link_hash = ?1 WHERE position = ?2",
            params![bytes, position as i64],
        )
    }

    /// Replace a record's stored self hash.
    pub fn set_self_hash(&self, position: u64, self_hash: &RecordHash) -> rusqlite::Result<usize> {
        self.conn.execute(
            "UPDATE records SET self_hash = ?1 WHERE position = ?2",
            params![self_hash.as_bytes().as_slice(), position as i64],
        )
    }

    /// Delete a record outright.
    pub fn delete(&self, position: u64) -> rusqlite::Result<usize> {
        self.conn.execute(
            "DELETE FROM records WHERE position = ?1",
            params![position as i64],
        )
    }
}
