//! Server- and database-level bodies.

use serde::{Deserialize, Serialize};

/// `{"ok": true}`, returned by database create and delete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// `GET /`: the server greeting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Welcome {
    pub couchdb: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<Vendor>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vendor {
    pub name: String,
}

/// `GET /{db}`: database metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseInfo {
    pub db_name: String,
    /// Number of live (non-deleted) documents.
    pub doc_count: u64,
    pub doc_del_count: u64,
    /// Opaque sequence marker, incremented on every write.
    pub update_seq: String,
}
