//! Standard error response body.

use serde::{Deserialize, Serialize};

/// The JSON body CouchDB returns for all error responses.
///
/// ```json
/// { "error": "conflict", "reason": "Document update conflict." }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    /// Machine-readable error name.
    ///
    /// | `error` | HTTP status |
    /// |---------|------------|
    /// | `bad_request` | 400 |
    /// | `illegal_database_name` | 400 |
    /// | `unauthorized` | 401 |
    /// | `not_found` | 404 |
    /// | `conflict` | 409 |
    /// | `file_exists` | 412 |
    pub error: String,

    /// Human-readable explanation.
    #[serde(default)]
    pub reason: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            reason: reason.into(),
        }
    }
}

/// Well-known `error` values.
pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const ILLEGAL_DATABASE_NAME: &str = "illegal_database_name";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const NOT_FOUND: &str = "not_found";
    pub const CONFLICT: &str = "conflict";
    pub const FILE_EXISTS: &str = "file_exists";
}

/// Well-known `reason` values.
pub mod reasons {
    pub const NO_DB_FILE: &str = "Database does not exist.";
    pub const MISSING: &str = "missing";
    pub const DELETED: &str = "deleted";
    pub const UPDATE_CONFLICT: &str = "Document update conflict.";
    pub const DB_EXISTS: &str =
        "The database could not be created, the file already exists.";
    pub const BAD_CREDENTIALS: &str = "Name or password is incorrect.";
    pub const AUTH_REQUIRED: &str = "Authentication required.";
    pub const ILLEGAL_DB_NAME: &str = "Name must begin with a letter and contain only lowercase letters, digits and _$()+-/";
}
