//! # Custody Ledger Core
//!
//! Pure primitives for the custody ledger: records, canonical encoding,
//! hashing and chain validation.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over hash-linked records.
//!
//! ## Key Types
//!
//! - [`Record`] - One immutable entry in the ledger
//! - [`StoredRecord`] - A row read back from storage, decoded or not
//! - [`RecordHash`] - 32-byte content hash of a record (Blake3)
//! - [`LinkHash`] - A record's pointer to its predecessor (`"0"` for genesis)
//! - [`Payload`] - Caller-defined ordered field map carried by a record
//! - [`Verdict`] - Result of validating an ordered sequence of records
//!
//! ## Canonicalization
//!
//! Records are hashed over deterministic CBOR. See [`canonical`] module.

pub mod canonical;
pub mod error;
pub mod event;
pub mod hash;
pub mod payload;
pub mod record;
pub mod types;
pub mod validation;

pub use canonical::{canonical_record_bytes, decode_payload, payload_bytes, ENCODING_VERSION};
pub use error::{CoreError, PayloadError, ValidationError};
pub use event::{CustodyEvent, Location};
pub use hash::{record_hash, HASH_DOMAIN};
pub use payload::{FieldValue, Payload, PayloadSchema};
pub use record::{MalformedRecord, Record, RecordBuilder, StoredRecord};
pub use types::{LinkHash, RecordHash};
pub use validation::{
    audit_chain, audit_stored, check_extends, check_record, validate_chain, validate_stored,
    ChainFault, FailureReason, Verdict,
};
