//! Mango query bodies for `POST /{db}/_find`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for `POST /{db}/_find`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FindRequest {
    /// A JSON object describing the documents to match.
    pub selector: Value,

    /// Maximum number of documents to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    /// Number of matching documents to skip before returning results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
}

impl FindRequest {
    pub fn new(selector: Value) -> Self {
        Self {
            selector,
            limit: None,
            skip: None,
        }
    }
}

/// Response body for `POST /{db}/_find`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FindResponse {
    pub docs: Vec<Value>,

    /// Opaque paging token. Absent on servers that do not support bookmarks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark: Option<String>,

    /// Set when the query could not use an index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}
