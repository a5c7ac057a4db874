//! Error types for the ledger.

use custody_ledger_core::PayloadError;
use custody_ledger_store::StoreError;
use thiserror::Error;

/// Errors that can occur during ledger operations.
///
/// A broken chain is not an error: validation reports it in a `Verdict`.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The payload was rejected before anything was hashed or stored.
    #[error("payload error: {0}")]
    Payload(#[from] PayloadError),

    /// Storage error. Nothing was appended.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// The current tail no longer matches its own hash.
    #[error("tail record at position {position} has been tampered with")]
    TailTampered { position: u64 },
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
