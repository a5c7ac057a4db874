//! # Custody Ledger
//!
//! A tamper-evident, append-only log of custody events. Every record carries
//! the hash of its predecessor and its own content hash, so any in-place
//! edit of stored history is detected by re-validating the chain.
//!
//! ## Overview
//!
//! - **Append**: check a payload, link it to the current tail, hash it, store it
//! - **Validate**: recompute every hash and link, report the first failure
//! - **Audit**: like validate, but report every failure
//! - **Query**: records for one subject, or the whole chain, in order
//!
//! ## Usage
//!
//! ```rust,no_run
//! use custody_ledger::{CustodyEvent, Ledger, LedgerConfig};
//! use custody_ledger::store::SqliteStore;
//!
//! async fn example() {
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!     let ledger = Ledger::new(store, LedgerConfig::default());
//!
//!     let record = ledger
//!         .append_event(CustodyEvent::new("LOT-1", "MANUFACTURED"))
//!         .await
//!         .unwrap();
//!     assert_eq!(record.position, 0);
//!
//!     let verdict = ledger.validate().await.unwrap();
//!     assert!(verdict.valid);
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `custody_ledger::core` - Core primitives (Record, Payload, validation)
//! - `custody_ledger::store` - Storage abstraction and SQLite

pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;

// Re-export component crates
pub use custody_ledger_core as core;
pub use custody_ledger_store as store;

// Re-export main types for convenience
pub use clock::{Clock, SystemClock};
pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use ledger::{Ledger, TimelineEntry};

// Re-export commonly used core types
pub use custody_ledger_core::{
    ChainFault, CustodyEvent, FailureReason, FieldValue, LinkHash, Location, MalformedRecord,
    Payload, PayloadError, PayloadSchema, Record, RecordHash, StoredRecord, Verdict,
};
