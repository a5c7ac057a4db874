//! # Custody Ledger Testkit
//!
//! Testing utilities for the custody ledger.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known canonical encodings for cross-platform verification
//! - **Generators**: Proptest strategies for payloads, chains and tamper cases
//! - **Fixtures**: Deterministic clocks, ledgers and sample custody events
//! - **Tampering**: Direct edits of a SQLite ledger, bypassing its append-only triggers
//!
//! ## Golden Vectors
//!
//! ```rust
//! use custody_ledger_testkit::vectors::verify_all_vectors;
//!
//! for (name, ok, detail) in verify_all_vectors() {
//!     assert!(ok, "{name}: {detail}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use custody_ledger_core::validate_chain;
//! use custody_ledger_testkit::generators::chain;
//!
//! proptest! {
//!     #[test]
//!     fn built_chains_validate(records in chain(16)) {
//!         prop_assert!(validate_chain(&records).valid);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use custody_ledger_testkit::fixtures::{build_chain, lot_journey};
//!
//! let records = build_chain(lot_journey("LOT-1").into_iter().map(Into::into));
//! assert_eq!(records.len(), 3);
//! ```

pub mod fixtures;
pub mod generators;
pub mod tamper;
pub mod vectors;

pub use fixtures::{
    build_chain, custody_event, lot_journey, memory_ledger, SqliteFixture, SteppingClock,
};
pub use generators::{Mutation, TamperCase};
pub use tamper::SqliteTamper;
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector};
