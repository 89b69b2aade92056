//! Error types for plantcare operations.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

/// Errors that can occur during data store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataStoreError {
    /// The requested item was not found in the data store.
    NotFound,
    /// An item with the same unique key already exists.
    AlreadyExists,
    /// A stored value could not be decoded into its domain type.
    Corrupt(String),
    /// An internal storage system error occurred.
    Internal(String),
}

impl std::fmt::Display for DataStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "Item not found in data store"),
            Self::AlreadyExists => write!(f, "Item already exists in data store"),
            Self::Corrupt(msg) => write!(f, "Corrupt record: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl From<sqlx::Error> for DataStoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => DataStoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DataStoreError::AlreadyExists
            }
            _ => DataStoreError::Internal(e.to_string()),
        }
    }
}

impl std::error::Error for DataStoreError {}

/////////////////////////////////////////////// ApiError ///////////////////////////////////////////////

/// Errors surfaced to HTTP callers.
///
/// Every variant renders as a status code plus a JSON body of the form
/// `{"message": "..."}`.  Unexpected failures are logged and replaced by a
/// generic message so store internals never leak to clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed body or invalid field value (400).
    #[error("{0}")]
    Validation(String),
    /// The request collides with existing state, e.g. a registered email (409).
    #[error("{0}")]
    Conflict(String),
    /// Missing, malformed or expired credentials (401).
    #[error("{0}")]
    Unauthenticated(String),
    /// Missing resource, or one owned by somebody else (404).
    #[error("{0}")]
    NotFound(String),
    /// Store, connectivity or hashing failure (500).
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl ApiError {
    /// The HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn plant_not_found() -> Self {
        ApiError::NotFound("plant not found".to_string())
    }
}

impl From<DataStoreError> for ApiError {
    fn from(e: DataStoreError) -> Self {
        match e {
            DataStoreError::NotFound => ApiError::NotFound("not found".to_string()),
            DataStoreError::AlreadyExists => ApiError::Conflict("already exists".to_string()),
            DataStoreError::Corrupt(_) | DataStoreError::Internal(_) => {
                ApiError::Unexpected(e.to_string())
            }
        }
    }
}

/// JSON body returned alongside every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Short human-readable description.
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Unexpected(detail) => {
                tracing::error!(error = %detail, "request failed");
                "server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorBody { message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_api_errors() {
        assert!(matches!(
            ApiError::from(DataStoreError::NotFound),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(DataStoreError::AlreadyExists),
            ApiError::Conflict(_)
        ));
        let unexpected = ApiError::from(DataStoreError::Internal("pool closed".to_string()));
        assert_eq!(unexpected.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn statuses() {
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::Unauthenticated("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::plant_not_found().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unexpected_errors_hide_details() {
        let response = ApiError::Unexpected("password for db is hunter2".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
