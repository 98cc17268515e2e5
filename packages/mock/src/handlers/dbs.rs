//! Database endpoints: `/{db}`, `/{db}/_all_docs` and `/{db}/_find`.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use couchflow_api::{
    AllDocsQuery, AllDocsResponse, DatabaseInfo, DocumentResponse, FindRequest, FindResponse,
    OkResponse,
};

use super::{json_object, AppState};
use crate::error::AppError;

/// `PUT /{db}`
pub async fn create(
    State(state): State<AppState>,
    Path(db): Path<String>,
) -> Result<(StatusCode, Json<OkResponse>), AppError> {
    state.store.create_db(&db).await?;
    tracing::info!(db = %db, "database created");
    Ok((StatusCode::CREATED, Json(OkResponse::ok())))
}

/// `DELETE /{db}`
pub async fn delete(
    State(state): State<AppState>,
    Path(db): Path<String>,
) -> Result<Json<OkResponse>, AppError> {
    state.store.delete_db(&db).await?;
    tracing::info!(db = %db, "database deleted");
    Ok(Json(OkResponse::ok()))
}

/// `GET /{db}`
pub async fn info(
    State(state): State<AppState>,
    Path(db): Path<String>,
) -> Result<Json<DatabaseInfo>, AppError> {
    Ok(Json(state.store.db_info(&db).await?))
}

/// `POST /{db}`
///
/// Creates a document, or updates one when the body carries `_id` and
/// `_rev`.
pub async fn post_doc(
    State(state): State<AppState>,
    Path(db): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<DocumentResponse>), AppError> {
    let doc = json_object(&body)?;
    let written = state.store.put_doc(&db, doc).await?;
    Ok((StatusCode::CREATED, Json(written)))
}

/// `GET /{db}/_all_docs`
///
/// Query parameters: `limit`, `skip`, `startkey`, `endkey` (JSON-encoded),
/// `include_docs`, `descending`.
pub async fn all_docs(
    State(state): State<AppState>,
    Path(db): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<AllDocsResponse>, AppError> {
    let query = AllDocsQuery::from_query_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .map_err(|param| AppError::BadRequest(format!("Invalid value for {param}")))?;
    Ok(Json(state.store.all_docs(&db, &query).await?))
}

/// `POST /{db}/_find`
pub async fn find(
    State(state): State<AppState>,
    Path(db): Path<String>,
    body: Bytes,
) -> Result<Json<FindResponse>, AppError> {
    let request: FindRequest = serde_json::from_value(json_object(&body)?)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(Json(state.store.find(&db, &request).await?))
}
