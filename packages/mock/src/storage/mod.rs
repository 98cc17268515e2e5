//! Storage abstraction for the mock server.
//!
//! The [`Store`] trait is the contract between the HTTP handlers and the
//! document data. Handlers translate requests and errors; storage owns
//! revision bookkeeping, listing order and selector matching.
//!
//! | Type | When to use |
//! |------|-------------|
//! | [`MemoryStore`] | Tests, the conformance suite, local flows |
//!
//! [`MemoryStore`]: memory::MemoryStore

pub mod mango;
pub mod memory;

use async_trait::async_trait;
use couchflow_api::{
    AllDocsQuery, AllDocsResponse, DatabaseInfo, DocumentResponse, FindRequest, FindResponse,
};
use serde_json::Value;

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("database does not exist")]
    NoDatabase,

    #[error("database already exists")]
    DatabaseExists,

    #[error("illegal database name {0:?}")]
    IllegalDatabaseName(String),

    /// The document was never written.
    #[error("document missing")]
    Missing,

    /// The document exists only as a deletion tombstone.
    #[error("document deleted")]
    Deleted,

    /// The supplied revision is absent or not the current one.
    #[error("document update conflict")]
    Conflict,

    #[error("{0}")]
    BadRequest(String),

    #[error("internal storage error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// Database names
// ---------------------------------------------------------------------------

/// CouchDB's rule: a lowercase letter, then lowercase letters, digits, or
/// any of `_$()+-/`.
pub fn is_valid_db_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "_$()+-/".contains(c))
}

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// The persistence contract for the mock server.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    // --- Databases -----------------------------------------------------------

    /// All database names, sorted.
    async fn list_dbs(&self) -> Result<Vec<String>, StoreError>;

    async fn create_db(&self, name: &str) -> Result<(), StoreError>;

    async fn delete_db(&self, name: &str) -> Result<(), StoreError>;

    async fn db_info(&self, name: &str) -> Result<DatabaseInfo, StoreError>;

    // --- Documents -----------------------------------------------------------

    /// Write a document. `_id` is generated when absent; `_rev` must name the
    /// current revision when the document already exists.
    async fn put_doc(&self, db: &str, doc: Value) -> Result<DocumentResponse, StoreError>;

    /// The current body of a live document, with `_id` and `_rev`.
    async fn get_doc(&self, db: &str, id: &str) -> Result<Value, StoreError>;

    /// Replace the document with a tombstone. `rev` must be current.
    async fn delete_doc(
        &self,
        db: &str,
        id: &str,
        rev: Option<&str>,
    ) -> Result<DocumentResponse, StoreError>;

    // --- Queries -------------------------------------------------------------

    /// Live documents in id order, filtered and paged by `query`.
    async fn all_docs(&self, db: &str, query: &AllDocsQuery)
        -> Result<AllDocsResponse, StoreError>;

    /// Live documents matching a Mango selector, in id order.
    async fn find(&self, db: &str, request: &FindRequest) -> Result<FindResponse, StoreError>;
}
