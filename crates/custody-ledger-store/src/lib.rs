//! # Custody Ledger Store
//!
//! Storage abstraction for the custody ledger. Provides a trait-based interface
//! for ordered, append-only record persistence with SQLite and in-memory
//! implementations.
//!
//! ## Key Types
//!
//! - [`ChainStore`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use custody_ledger_store::{ChainStore, SqliteStore};
//!
//! async fn example() {
//!     // Open a SQLite database
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!
//!     // Or use an in-memory database for testing
//!     let store = SqliteStore::open_memory().unwrap();
//!
//!     let records = store.all().await.unwrap();
//!     assert!(records.is_empty());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Append-only**: no operation updates or deletes a stored record
//! - **Linked appends**: `append` rejects a record that does not extend the current tail
//! - **Ordered reads**: every read returns records ascending by position

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::ChainStore;
