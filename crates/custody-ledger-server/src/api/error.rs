//! API error responses

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use custody_ledger::store::StoreError;
use custody_ledger::LedgerError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("invalid request body: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Ledger(LedgerError::Payload(_)) => StatusCode::BAD_REQUEST,
            ApiError::Ledger(LedgerError::TailTampered { .. }) => StatusCode::CONFLICT,
            ApiError::Ledger(LedgerError::Storage(
                StoreError::Rejected(_) | StoreError::Malformed { .. },
            )) => StatusCode::CONFLICT,
            ApiError::Ledger(LedgerError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Storage internals are logged, not returned
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "request failed");
            "internal storage error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custody_ledger::core::ValidationError;
    use custody_ledger::PayloadError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ApiError::Ledger(PayloadError::MissingField("status".into()).into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Ledger(LedgerError::TailTampered { position: 3 }),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::Ledger(
                    StoreError::Rejected(ValidationError::BrokenLink { position: 4 }).into(),
                ),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::Ledger(
                    StoreError::Malformed {
                        position: 1,
                        detail: "link_hash is 1 bytes, expected 32".into(),
                    }
                    .into(),
                ),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::Ledger(StoreError::Poisoned.into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ApiError::BadRequest("eof".into()), StatusCode::BAD_REQUEST),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status(), expected, "{err}");
        }
    }
}
