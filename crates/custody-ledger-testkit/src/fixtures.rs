//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use custody_ledger::{Clock, Ledger, LedgerConfig};
use custody_ledger_core::{CustodyEvent, Location, Payload, Record, RecordBuilder};
use custody_ledger_store::{MemoryStore, SqliteStore};
use tempfile::TempDir;

use crate::tamper::SqliteTamper;

/// 2025-01-14T16:00:00Z, the first timestamp handed out by [`SteppingClock::default`].
pub const START_MILLIS: i64 = 1_736_870_400_000;

/// A clock that advances by a fixed step on every read.
#[derive(Debug)]
pub struct SteppingClock {
    next: AtomicI64,
    step: i64,
}

impl SteppingClock {
    pub fn new(start: i64, step: i64) -> Self {
        Self {
            next: AtomicI64::new(start),
            step,
        }
    }

    /// A clock that always returns `at`.
    pub fn fixed(at: i64) -> Self {
        Self::new(at, 0)
    }
}

impl Default for SteppingClock {
    fn default() -> Self {
        Self::new(START_MILLIS, 1000)
    }
}

impl Clock for SteppingClock {
    fn now_millis(&self) -> i64 {
        self.next.fetch_add(self.step, Ordering::SeqCst)
    }
}

/// A ledger over a fresh in-memory store with a stepping clock.
pub fn memory_ledger() -> Ledger<MemoryStore> {
    Ledger::new(MemoryStore::new(), LedgerConfig::default()).with_clock(SteppingClock::default())
}

/// A SQLite ledger database in a temporary directory.
///
/// The directory is removed when the fixture is dropped.
pub struct SqliteFixture {
    _dir: TempDir,
    path: PathBuf,
}

impl SqliteFixture {
    pub fn new() -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("ledger.db");
        Ok(Self { _dir: dir, path })
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a store on the database.
    pub fn store(&self) -> custody_ledger_store::Result<SqliteStore> {
        SqliteStore::open(&self.path)
    }

    /// Open a ledger on the database with a stepping clock.
    pub fn ledger(&self) -> custody_ledger_store::Result<Ledger<SqliteStore>> {
        Ok(Ledger::new(self.store()?, LedgerConfig::default()).with_clock(SteppingClock::default()))
    }

    /// Open a second, raw connection that can rewrite stored records.
    pub fn tamper(&self) -> rusqlite::Result<SqliteTamper> {
        SqliteTamper::open(&self.path)
    }
}

/// A custody event with plausible parties and location for its status.
pub fn custody_event(product_id: &str, status: &str) -> CustodyEvent {
    let (sender, receiver, address, lat, lng) = match status {
        "MANUFACTURED" => ("Factory A", "Factory A", "Rayong", 12.6814, 101.2816),
        "SHIPPED" => ("Factory A", "Warehouse", "Laem Chabang", 13.0827, 100.8833),
        "DELIVERED" => ("Warehouse", "Dealer B", "Bangkok", 13.7563, 100.5018),
        _ => ("Warehouse", "Warehouse", "Bangkok", 13.7563, 100.5018),
    };

    let mut event = CustodyEvent::new(product_id, status)
        .between(sender, receiver)
        .at(Location {
            lat,
            lng,
            address: Some(address.to_string()),
        });
    event.item = Some("Pallet of widgets".to_string());
    event.factory = Some("Factory A".to_string());
    event
}

/// The usual three hand-overs of a lot.
pub fn lot_journey(product_id: &str) -> Vec<CustodyEvent> {
    ["MANUFACTURED", "SHIPPED", "DELIVERED"]
        .into_iter()
        .map(|status| custody_event(product_id, status))
        .collect()
}

/// Build a valid chain from payloads without any store.
///
/// Timestamps start at [`START_MILLIS`] and advance by one second.
pub fn build_chain(payloads: impl IntoIterator<Item = Payload>) -> Vec<Record> {
    build_chain_from(START_MILLIS, payloads)
}

/// Build a valid chain whose first timestamp is `start`.
pub fn build_chain_from(start: i64, payloads: impl IntoIterator<Item = Payload>) -> Vec<Record> {
    let mut chain: Vec<Record> = Vec::new();
    for (i, payload) in payloads.into_iter().enumerate() {
        let record = RecordBuilder::extending(chain.last())
            .timestamp(start.saturating_add(i as i64 * 1000))
            .payload(payload)
            .build();
        chain.push(record);
    }
    chain
}
