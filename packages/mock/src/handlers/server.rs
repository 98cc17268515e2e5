//! Server-level endpoints: `GET /` and `GET /_all_dbs`.

use axum::{extract::State, Json};
use couchflow_api::{Vendor, Welcome};

use super::AppState;
use crate::error::AppError;

/// CouchDB release whose API surface the mock follows.
pub const COUCHDB_VERSION: &str = "3.3.3";

/// `GET /`
pub async fn welcome() -> Json<Welcome> {
    Json(Welcome {
        couchdb: "Welcome".into(),
        version: COUCHDB_VERSION.into(),
        vendor: Some(Vendor {
            name: env!("CARGO_PKG_NAME").into(),
        }),
    })
}

/// `GET /_all_dbs`
pub async fn all_dbs(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.store.list_dbs().await?))
}
