//! # Custody Ledger Server
//!
//! Serves a custody ledger over HTTP:
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /chain` | append `{"data": {...}}` |
//! | `GET /chain/:subject` | records for one subject |
//! | `GET /timeline/:subject` | custody timeline for one subject |
//! | `GET /blocks` | the whole chain |
//! | `GET /validate` | first failure, if any |
//! | `GET /audit` | every failure |
//! | `GET /health` | liveness |
//!
//! Errors come back as `{"error": "..."}`.

pub mod api;
pub mod config;

pub use api::{create_router, ApiError, AppState, SharedLedger};
pub use config::{Backend, Config, ConfigError, ServerConfig, StorageConfig};

use custody_ledger::Ledger;

/// Open the configured store and build a ledger over it.
pub fn build_state(config: &Config) -> custody_ledger::store::Result<AppState> {
    let store = config.storage.open()?;
    Ok(AppState::new(Ledger::new(store, config.ledger.clone())))
}
