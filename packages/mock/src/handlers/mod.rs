//! HTTP request handlers for the CouchDB endpoints the mock serves.
//!
//! Handlers are thin: they parse paths, query strings and bodies, call the
//! [`Store`], and map [`StoreError`]s to CouchDB error bodies through
//! [`AppError`]. All document semantics live in storage.
//!
//! [`StoreError`]: crate::storage::StoreError
//! [`AppError`]: crate::error::AppError

pub mod dbs;
pub mod docs;
pub mod server;

use std::sync::Arc;

use axum::body::Bytes;
use serde_json::Value;

use crate::{config::MockConfig, error::AppError, storage::Store};

/// Shared application state threaded through all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: MockConfig,
}

/// Parse a request body as a JSON object.
///
/// Taken as raw bytes rather than `Json<Value>` so malformed bodies get
/// CouchDB's `bad_request` shape instead of axum's plain-text rejection.
pub(crate) fn json_object(body: &Bytes) -> Result<Value, AppError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(AppError::BadRequest(
            "Request body must be a JSON object".into(),
        )),
        Err(_) => Err(AppError::BadRequest("invalid UTF-8 JSON".into())),
    }
}
