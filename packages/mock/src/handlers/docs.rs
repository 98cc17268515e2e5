//! Document endpoints: `/{db}/{doc}`.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use couchflow_api::DocumentResponse;
use serde::Deserialize;
use serde_json::Value;

use super::{json_object, AppState};
use crate::error::AppError;

/// The `?rev=` query parameter.
#[derive(Debug, Default, Deserialize)]
pub struct RevParam {
    pub rev: Option<String>,
}

/// `GET /{db}/{doc}`
pub async fn get(
    State(state): State<AppState>,
    Path((db, id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(state.store.get_doc(&db, &id).await?))
}

/// `PUT /{db}/{doc}`
///
/// The path id always wins over any `_id` in the body. The revision may come
/// from the body's `_rev` or the `rev` query parameter.
pub async fn put(
    State(state): State<AppState>,
    Path((db, id)): Path<(String, String)>,
    Query(param): Query<RevParam>,
    body: Bytes,
) -> Result<(StatusCode, Json<DocumentResponse>), AppError> {
    let mut doc = json_object(&body)?;
    if let Value::Object(ref mut fields) = doc {
        fields.insert("_id".into(), Value::String(id));
        if let Some(rev) = param.rev {
            fields.entry("_rev").or_insert(Value::String(rev));
        }
    }
    let written = state.store.put_doc(&db, doc).await?;
    Ok((StatusCode::CREATED, Json(written)))
}

/// `DELETE /{db}/{doc}?rev=`
pub async fn delete(
    State(state): State<AppState>,
    Path((db, id)): Path<(String, String)>,
    Query(param): Query<RevParam>,
) -> Result<Json<DocumentResponse>, AppError> {
    Ok(Json(
        state.store.delete_doc(&db, &id, param.rev.as_deref()).await?,
    ))
}
