//! Document write responses.

use serde::{Deserialize, Serialize};

/// Body returned by every single-document write (insert, update, delete).
///
/// ```json
/// { "ok": true, "id": "orders-1", "rev": "1-967a00dff5e02add41819138abb3284d" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentResponse {
    #[serde(default = "default_ok")]
    pub ok: bool,
    pub id: String,
    pub rev: String,
}

fn default_ok() -> bool {
    true
}

impl DocumentResponse {
    pub fn new(id: impl Into<String>, rev: impl Into<String>) -> Self {
        Self {
            ok: true,
            id: id.into(),
            rev: rev.into(),
        }
    }
}
