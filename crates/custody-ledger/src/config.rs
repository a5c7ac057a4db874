//! Ledger configuration.

use custody_ledger_core::PayloadSchema;
use serde::{Deserialize, Serialize};

/// Configuration for the Ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Fields every appended payload must carry.
    pub schema: PayloadSchema,

    /// Payload field that names the subject of a record, used by `chain_for`.
    pub subject_field: String,

    /// Recompute the tail's hash before extending it.
    pub verify_tail_on_append: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            schema: PayloadSchema::custody(),
            subject_field: "product_id".to_string(),
            verify_tail_on_append: true,
        }
    }
}
