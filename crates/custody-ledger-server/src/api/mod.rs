//! HTTP API over a shared ledger.

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use custody_ledger::store::ChainStore;
use custody_ledger::Ledger;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// A ledger whose backend is chosen at startup.
pub type SharedLedger = Arc<Ledger<Arc<dyn ChainStore>>>;

/// State shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub ledger: SharedLedger,
}

impl AppState {
    pub fn new(ledger: Ledger<Arc<dyn ChainStore>>) -> Self {
        Self {
            ledger: Arc::new(ledger),
        }
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Ledger
        .route("/chain", post(routes::append))
        .route("/chain/:subject", get(routes::chain_for))
        .route("/blocks", get(routes::entries))
        .route("/timeline/:subject", get(routes::timeline))
        // Integrity
        .route("/validate", get(routes::validate))
        .route("/audit", get(routes::audit))
        // Health check
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
