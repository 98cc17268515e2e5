//! Application-level error type returned by handlers.
//!
//! Every variant serialises to CouchDB's `{"error", "reason"}` body and maps
//! to the status code CouchDB uses for it.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use couchflow_api::{codes, reasons, ErrorBody};

use crate::storage::StoreError;

/// An error that a handler can return; converts directly to an HTTP response.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    IllegalDatabaseName,
    Unauthorized(&'static str),
    NotFound(&'static str),
    Conflict,
    FileExists,
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, reason) = match self {
            AppError::BadRequest(reason) => (StatusCode::BAD_REQUEST, codes::BAD_REQUEST, reason),
            AppError::IllegalDatabaseName => (
                StatusCode::BAD_REQUEST,
                codes::ILLEGAL_DATABASE_NAME,
                reasons::ILLEGAL_DB_NAME.to_string(),
            ),
            AppError::Unauthorized(reason) => {
                (StatusCode::UNAUTHORIZED, codes::UNAUTHORIZED, reason.to_string())
            }
            AppError::NotFound(reason) => {
                (StatusCode::NOT_FOUND, codes::NOT_FOUND, reason.to_string())
            }
            AppError::Conflict => (
                StatusCode::CONFLICT,
                codes::CONFLICT,
                reasons::UPDATE_CONFLICT.to_string(),
            ),
            AppError::FileExists => (
                StatusCode::PRECONDITION_FAILED,
                codes::FILE_EXISTS,
                reasons::DB_EXISTS.to_string(),
            ),
            AppError::Internal(reason) => {
                tracing::error!("internal error: {reason}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_server_error", reason)
            }
        };
        (status, Json(ErrorBody::new(error, reason))).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NoDatabase => AppError::NotFound(reasons::NO_DB_FILE),
            StoreError::DatabaseExists => AppError::FileExists,
            StoreError::IllegalDatabaseName(_) => AppError::IllegalDatabaseName,
            StoreError::Missing => AppError::NotFound(reasons::MISSING),
            StoreError::Deleted => AppError::NotFound(reasons::DELETED),
            StoreError::Conflict => AppError::Conflict,
            StoreError::BadRequest(reason) => AppError::BadRequest(reason),
            StoreError::Internal(reason) => AppError::Internal(reason),
        }
    }
}
