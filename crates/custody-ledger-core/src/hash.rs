//! Record hashing.
//!
//! A record's self hash is Blake3 over a domain tag followed by the
//! canonical bytes of its position, link hash, timestamp and payload.

use crate::canonical::canonical_record_bytes;
use crate::payload::Payload;
use crate::types::{LinkHash, RecordHash};

/// Domain separation tag prepended to every hashed record.
pub const HASH_DOMAIN: &[u8] = b"custody-ledger/record/v1:";

/// Compute the self hash of a record from its hashed fields.
pub fn record_hash(
    position: u64,
    link_hash: &LinkHash,
    timestamp: i64,
    payload: &Payload,
) -> RecordHash {
    let bytes = canonical_record_bytes(position, link_hash, timestamp, payload);

    let mut hasher = blake3::Hasher::new();
    hasher.update(HASH_DOMAIN);
    hasher.update(&bytes);
    RecordHash(*hasher.finalize().as_bytes())
}
