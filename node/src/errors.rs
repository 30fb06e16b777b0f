// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::api::ClientError;

#[derive(Error, Debug)]
pub enum LedgerError {
    /// Missing or malformed client input. The ledger is untouched.
    #[error("{0}")]
    Validation(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
    /// The existing ledger file cannot be resumed.
    #[error("ledger file is not resumable: {0}")]
    Corrupt(String),
    #[error("ledger writer failed earlier and accepts no more writes")]
    Poisoned,
    #[error("ledger writer is already closed")]
    Closed,
    #[error("{0} is not implemented yet")]
    Unimplemented(&'static str),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    /// Errors after which the ledger's integrity can no longer be vouched for.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, LedgerError::Validation(_) | LedgerError::Unimplemented(_))
    }

    /// Builds the HTTP response. `detailed` exposes internal error text on 5xx.
    pub fn to_response(&self, detailed: bool) -> Response {
        match self {
            LedgerError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                Json(ClientError::new(format!("Error: {msg}"))),
            )
                .into_response(),
            LedgerError::Unimplemented(_) => (
                StatusCode::NOT_IMPLEMENTED,
                Json(ClientError::new("Error: not implemented yet")),
            )
                .into_response(),
            other => {
                let message = if detailed {
                    other.to_string()
                } else {
                    "Internal server error".to_string()
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": message })),
                )
                    .into_response()
            }
        }
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        self.to_response(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (LedgerError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (LedgerError::Unimplemented("search"), StatusCode::NOT_IMPLEMENTED),
            (LedgerError::Poisoned, StatusCode::INTERNAL_SERVER_ERROR),
            (
                LedgerError::Storage(std::io::Error::other("disk full")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_fatal_classification() {
        assert!(!LedgerError::Validation("x".into()).is_fatal());
        assert!(!LedgerError::Unimplemented("search").is_fatal());
        assert!(LedgerError::Poisoned.is_fatal());
        assert!(LedgerError::Corrupt("bad".into()).is_fatal());
    }
}
