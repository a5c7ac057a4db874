//! HTTP handlers
//!
//! Thin wrappers that turn ledger calls into JSON responses.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use custody_ledger::{ChainFault, Payload, Record, StoredRecord, TimelineEntry, Verdict};
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState};

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    "OK"
}

#[derive(Debug, Deserialize)]
pub struct AppendRequest {
    pub data: Payload,
}

#[derive(Debug, Serialize)]
pub struct AppendResponse {
    pub message: String,
    pub record: Record,
}

/// POST /chain
pub async fn append(
    State(state): State<AppState>,
    body: Result<Json<AppendRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AppendResponse>), ApiError> {
    let Json(request) = body?;
    let record = state.ledger.append(request.data).await?;

    Ok((
        StatusCode::CREATED,
        Json(AppendResponse {
            message: format!("record {} added to the chain", record.position),
            record,
        }),
    ))
}

/// GET /validate
pub async fn validate(State(state): State<AppState>) -> Result<Json<Verdict>, ApiError> {
    Ok(Json(state.ledger.validate().await?))
}

/// GET /audit
pub async fn audit(State(state): State<AppState>) -> Result<Json<Vec<ChainFault>>, ApiError> {
    Ok(Json(state.ledger.audit().await?))
}

/// GET /chain/:subject
pub async fn chain_for(
    State(state): State<AppState>,
    Path(subject): Path<String>,
) -> Result<Json<Vec<Record>>, ApiError> {
    Ok(Json(state.ledger.chain_for(&subject).await?))
}

/// GET /timeline/:subject
pub async fn timeline(
    State(state): State<AppState>,
    Path(subject): Path<String>,
) -> Result<Json<Vec<TimelineEntry>>, ApiError> {
    Ok(Json(state.ledger.timeline(&subject).await?))
}

/// GET /blocks
///
/// Rows that no longer decode are listed with their position and the
/// decoding error in place of a record.
pub async fn entries(State(state): State<AppState>) -> Result<Json<Vec<StoredRecord>>, ApiError> {
    Ok(Json(state.ledger.entries().await?))
}
