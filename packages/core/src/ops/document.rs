//! Single-document adapters: insert, get, update, delete.
//!
//! Updates and deletes need the document's current revision token (`_rev`);
//! the server refuses a write against a stale revision with `409 conflict`.

use async_trait::async_trait;
use couchflow_api::DocumentResponse;
use serde::Deserialize;
use serde_json::Value;

use crate::connection::{ClientError, Connection};
use crate::error::ValidationError;
use crate::lenient;
use crate::message::{is_truthy, Message};
use crate::node::Operation;
use crate::registry::NodeKind;
use crate::resolve::resolve;
use crate::status::Status;

use super::{require_database, to_json};

/// A document body bound for a database.
#[derive(Debug, Clone)]
pub struct DocumentWrite {
    pub database: String,
    pub doc: Value,
}

/// A document addressed by id (and revision, for deletes).
#[derive(Debug, Clone)]
pub struct DocumentRef {
    pub database: String,
    pub id: String,
    pub rev: Option<String>,
}

/// `msg.payload`, which must be a JSON object.
fn object_payload(msg: &Message) -> Result<Value, ValidationError> {
    match msg.payload() {
        Some(doc @ Value::Object(_)) => Ok(doc.clone()),
        _ => Err(ValidationError::PayloadNotObject),
    }
}

/// Attach `result`, `docId` and `docRev` from a write response.
fn write_result(msg: &mut Message, response: &DocumentResponse) {
    msg.set("result", to_json(response));
    msg.set("docId", response.id.clone());
    msg.set("docRev", response.rev.clone());
}

// ---------------------------------------------------------------------------
// Insert
// ---------------------------------------------------------------------------

/// `couchdb-insert`: store `msg.payload` as a new document.
///
/// The server assigns an id unless the payload carries `_id`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insert {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub server: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub database: Option<String>,
}

#[async_trait]
impl Operation for Insert {
    type Request = DocumentWrite;
    type Response = DocumentResponse;

    fn kind(&self) -> NodeKind {
        NodeKind::Insert
    }

    fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    fn prepare(&self, msg: &Message) -> Result<DocumentWrite, ValidationError> {
        let database = require_database(self.database.as_deref(), msg)?;
        let doc = object_payload(msg)?;
        Ok(DocumentWrite { database, doc })
    }

    fn busy(&self, _request: &DocumentWrite) -> Status {
        Status::busy("inserting...")
    }

    async fn call(
        &self,
        conn: &Connection,
        request: &DocumentWrite,
    ) -> Result<DocumentResponse, ClientError> {
        conn.insert(&request.database, &request.doc).await
    }

    fn complete(
        &self,
        msg: &mut Message,
        _request: DocumentWrite,
        response: DocumentResponse,
    ) -> Status {
        write_result(msg, &response);
        Status::success(format!("Inserted: {}", response.id))
    }

    fn failure_label(&self) -> &'static str {
        "Insert failed"
    }
}

// ---------------------------------------------------------------------------
// Get
// ---------------------------------------------------------------------------

/// `couchdb-get`: fetch a document by id into `msg.payload`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Get {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub server: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub database: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub doc_id: Option<String>,
}

#[async_trait]
impl Operation for Get {
    type Request = DocumentRef;
    type Response = Value;

    fn kind(&self) -> NodeKind {
        NodeKind::Get
    }

    fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    fn prepare(&self, msg: &Message) -> Result<DocumentRef, ValidationError> {
        let database = require_database(self.database.as_deref(), msg)?;
        let id = resolve(self.doc_id.clone(), msg.text("docId"))
            .ok_or(ValidationError::MissingDocId)?;
        Ok(DocumentRef {
            database,
            id,
            rev: None,
        })
    }

    fn busy(&self, _request: &DocumentRef) -> Status {
        Status::busy("fetching...")
    }

    async fn call(&self, conn: &Connection, request: &DocumentRef) -> Result<Value, ClientError> {
        conn.get(&request.database, &request.id).await
    }

    fn complete(&self, msg: &mut Message, request: DocumentRef, doc: Value) -> Status {
        let id = doc
            .get("_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or(request.id);
        let rev = doc.get("_rev").cloned().unwrap_or(Value::Null);
        msg.set("payload", doc);
        msg.set("docId", id.clone());
        msg.set("docRev", rev);
        Status::success(format!("Retrieved: {id}"))
    }

    fn failure_label(&self) -> &'static str {
        "Get failed"
    }
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// `couchdb-update`: write a new revision of an existing document.
///
/// `msg.payload` must carry the document's `_id` and current `_rev`
/// (typically obtained from a preceding get).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub server: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub database: Option<String>,
}

#[async_trait]
impl Operation for Update {
    type Request = DocumentWrite;
    type Response = DocumentResponse;

    fn kind(&self) -> NodeKind {
        NodeKind::Update
    }

    fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    fn prepare(&self, msg: &Message) -> Result<DocumentWrite, ValidationError> {
        let database = require_database(self.database.as_deref(), msg)?;
        let doc = object_payload(msg)?;
        if !doc.get("_id").is_some_and(is_truthy) {
            return Err(ValidationError::MissingId);
        }
        if !doc.get("_rev").is_some_and(is_truthy) {
            return Err(ValidationError::MissingRev);
        }
        Ok(DocumentWrite { database, doc })
    }

    fn busy(&self, _request: &DocumentWrite) -> Status {
        Status::busy("updating...")
    }

    async fn call(
        &self,
        conn: &Connection,
        request: &DocumentWrite,
    ) -> Result<DocumentResponse, ClientError> {
        conn.insert(&request.database, &request.doc).await
    }

    fn complete(
        &self,
        msg: &mut Message,
        _request: DocumentWrite,
        response: DocumentResponse,
    ) -> Status {
        write_result(msg, &response);
        Status::success(format!("Updated: {}", response.id))
    }

    fn failure_label(&self) -> &'static str {
        "Update failed"
    }
}

// ---------------------------------------------------------------------------
// DeleteDoc
// ---------------------------------------------------------------------------

/// `couchdb-delete-doc`: delete a document revision.
///
/// The id resolves from node config then `msg.docId`; the revision always
/// comes from `msg.docRev`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteDoc {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub server: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub database: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub doc_id: Option<String>,
}

#[async_trait]
impl Operation for DeleteDoc {
    type Request = DocumentRef;
    type Response = DocumentResponse;

    fn kind(&self) -> NodeKind {
        NodeKind::DeleteDoc
    }

    fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    fn prepare(&self, msg: &Message) -> Result<DocumentRef, ValidationError> {
        let database = require_database(self.database.as_deref(), msg)?;
        let id = resolve(self.doc_id.clone(), msg.text("docId"))
            .ok_or(ValidationError::MissingDocId)?;
        let rev = msg.text("docRev").ok_or(ValidationError::MissingDocRev)?;
        Ok(DocumentRef {
            database,
            id,
            rev: Some(rev),
        })
    }

    fn busy(&self, _request: &DocumentRef) -> Status {
        Status::busy("deleting...")
    }

    async fn call(
        &self,
        conn: &Connection,
        request: &DocumentRef,
    ) -> Result<DocumentResponse, ClientError> {
        let rev = request.rev.as_deref().unwrap_or_default();
        conn.destroy(&request.database, &request.id, rev).await
    }

    fn complete(
        &self,
        msg: &mut Message,
        _request: DocumentRef,
        response: DocumentResponse,
    ) -> Status {
        write_result(msg, &response);
        Status::success(format!("Deleted: {}", response.id))
    }

    fn failure_label(&self) -> &'static str {
        "Delete failed"
    }
}
