//! Records: the immutable entries of the ledger.
//!
//! A record is created once, by [`RecordBuilder`] (or by the ledger's
//! append path, which uses it), and is only read afterwards.

use serde::{Deserialize, Serialize};

use crate::hash::record_hash;
use crate::payload::Payload;
use crate::types::{LinkHash, RecordHash};

/// One entry in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Zero-based position in the chain.
    pub position: u64,

    /// Creation time (Unix milliseconds, UTC), set at append.
    pub timestamp: i64,

    /// Caller-defined content.
    pub payload: Payload,

    /// Self hash of the preceding record, or the genesis sentinel.
    pub link_hash: LinkHash,

    /// Hash over `(position, link_hash, timestamp, payload)`.
    pub self_hash: RecordHash,
}

impl Record {
    /// Recompute the self hash from the record's stored fields.
    pub fn compute_hash(&self) -> RecordHash {
        record_hash(self.position, &self.link_hash, self.timestamp, &self.payload)
    }

    /// Check that the stored self hash matches the stored fields.
    pub fn is_intact(&self) -> bool {
        self.compute_hash() == self.self_hash
    }

    /// Check if this is the first record of a chain.
    pub fn is_genesis(&self) -> bool {
        self.position == 0 && self.link_hash.is_genesis()
    }
}

/// Builder for the next record of a chain.
///
/// ```
/// use custody_ledger_core::{Payload, RecordBuilder};
///
/// let genesis = RecordBuilder::genesis()
///     .timestamp(1_000)
///     .payload(Payload::new().with("status", "MANUFACTURED"))
///     .build();
/// let next = RecordBuilder::after(&genesis)
///     .timestamp(2_000)
///     .payload(Payload::new().with("status", "SHIPPED"))
///     .build();
///
/// assert_eq!(next.position, 1);
/// assert_eq!(next.link_hash.record_hash(), Some(&genesis.self_hash));
/// ```
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    position: u64,
    link_hash: LinkHash,
    timestamp: i64,
    payload: Payload,
}

impl RecordBuilder {
    /// Start building the record at position 0.
    pub fn genesis() -> Self {
        Self {
            position: 0,
            link_hash: LinkHash::Genesis,
            timestamp: 0,
            payload: Payload::new(),
        }
    }

    /// Start building the record that extends `tail`.
    pub fn after(tail: &Record) -> Self {
        Self {
            position: tail.position + 1,
            link_hash: LinkHash::Record(tail.self_hash),
            timestamp: 0,
            payload: Payload::new(),
        }
    }

    /// Start building the record that extends an optional tail.
    pub fn extending(tail: Option<&Record>) -> Self {
        tail.map_or_else(Self::genesis, Self::after)
    }

    /// Set the timestamp.
    pub fn timestamp(mut self, ts: i64) -> Self {
        self.timestamp = ts;
        self
    }

    /// Set the payload.
    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Compute the self hash and produce the record.
    pub fn build(self) -> Record {
        let self_hash = record_hash(self.position, &self.link_hash, self.timestamp, &self.payload);
        Record {
            position: self.position,
            timestamp: self.timestamp,
            payload: self.payload,
            link_hash: self.link_hash,
            self_hash,
        }
    }
}

/// A stored row whose columns could not be read back as a [`Record`].
///
/// Only the position is guaranteed. The self hash is kept when its column
/// still decodes, so the next record's link can be checked against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MalformedRecord {
    pub position: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_hash: Option<RecordHash>,

    /// What failed to decode.
    pub error: String,
}

/// A row as read from storage: a record, or whatever was left of one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredRecord {
    Decoded(Record),
    Malformed(MalformedRecord),
}

impl StoredRecord {
    pub fn position(&self) -> u64 {
        match self {
            StoredRecord::Decoded(record) => record.position,
            StoredRecord::Malformed(row) => row.position,
        }
    }

    /// The stored self hash, if it could be read.
    pub fn self_hash(&self) -> Option<&RecordHash> {
        match self {
            StoredRecord::Decoded(record) => Some(&record.self_hash),
            StoredRecord::Malformed(row) => row.self_hash.as_ref(),
        }
    }

    pub fn record(&self) -> Option<&Record> {
        match self {
            StoredRecord::Decoded(record) => Some(record),
            StoredRecord::Malformed(_) => None,
        }
    }

    pub fn into_record(self) -> Option<Record> {
        match self {
            StoredRecord::Decoded(record) => Some(record),
            StoredRecord::Malformed(_) => None,
        }
    }
}

impl From<Record> for StoredRecord {
    fn from(record: Record) -> Self {
        StoredRecord::Decoded(record)
    }
}
