//! Local error types and the normalized error shape attached to failure
//! messages.
//!
//! Three kinds of failure reach the failure output:
//!
//! | Source | Type | `code` |
//! |--------|------|--------|
//! | node deployed without a usable server | [`SetupError`] | `configuration` |
//! | input rejected before any remote call | [`ValidationError`] | `validation` |
//! | the remote call failed | [`ClientError`] | CouchDB `error`, or `connection` / `timeout` / `decode` / `request` |
//!
//! All of them are flattened into one [`ErrorInfo`] so downstream nodes can
//! inspect `msg.error` without caring which adapter produced it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::connection::ClientError;
use crate::status::Status;

/// Well-known `code` values for errors that do not come from the server.
pub mod codes {
    pub const VALIDATION: &str = "validation";
    pub const CONFIGURATION: &str = "configuration";
    pub const CONNECTION: &str = "connection";
    pub const TIMEOUT: &str = "timeout";
    pub const DECODE: &str = "decode";
    pub const REQUEST: &str = "request";
}

// ---------------------------------------------------------------------------
// ErrorInfo
// ---------------------------------------------------------------------------

/// The normalized error attached to a forwarded message as `msg.error`.
///
/// ```json
/// { "message": "Document update conflict.", "statusCode": 409,
///   "reason": "Document update conflict.", "code": "conflict" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    /// Human-readable description.
    pub message: String,

    /// HTTP status returned by the server, if a response was received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// The server's `reason` text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Machine-readable error name; see [`codes`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
            reason: None,
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// JSON form, as stored under `msg.error`.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("message".into(), Value::from(self.message.clone()));
        if let Some(status) = self.status_code {
            map.insert("statusCode".into(), Value::from(status));
        }
        if let Some(ref reason) = self.reason {
            map.insert("reason".into(), Value::from(reason.clone()));
        }
        if let Some(ref code) = self.code {
            map.insert("code".into(), Value::from(code.clone()));
        }
        Value::Object(map)
    }
}

impl From<&ValidationError> for ErrorInfo {
    fn from(e: &ValidationError) -> Self {
        Self::new(e.to_string()).with_code(codes::VALIDATION)
    }
}

impl From<&SetupError> for ErrorInfo {
    fn from(e: &SetupError) -> Self {
        Self::new(e.to_string()).with_code(codes::CONFIGURATION)
    }
}

impl From<&ClientError> for ErrorInfo {
    fn from(e: &ClientError) -> Self {
        match e {
            ClientError::Couch {
                status,
                error,
                reason,
            } => Self {
                message: e.to_string(),
                status_code: Some(*status),
                reason: (!reason.is_empty()).then(|| reason.clone()),
                code: Some(error.clone()),
            },
            ClientError::Http(inner) => {
                let code = if inner.is_timeout() {
                    codes::TIMEOUT
                } else if inner.is_connect() {
                    codes::CONNECTION
                } else if inner.is_decode() {
                    codes::DECODE
                } else {
                    codes::REQUEST
                };
                Self {
                    message: inner.to_string(),
                    status_code: inner.status().map(|s| s.as_u16()),
                    reason: None,
                    code: Some(code.into()),
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// Input rejected before any remote call was made.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Database not specified")]
    MissingDatabase,

    #[error("Database name not specified")]
    MissingDatabaseName,

    #[error("Document ID not specified")]
    MissingDocId,

    #[error("Document revision (_rev) not specified. Get the document first using the Get node")]
    MissingDocRev,

    #[error("Payload must be an object")]
    PayloadNotObject,

    #[error("Document must have _id field")]
    MissingId,

    #[error("Document must have _rev field (use Get node first)")]
    MissingRev,

    #[error("Selector must be a valid object")]
    InvalidSelector,

    #[error("Selector is not valid JSON: {0}")]
    SelectorSyntax(String),

    #[error("Delete operation requires confirmation")]
    NotConfirmed,
}

impl ValidationError {
    /// The status indicator shown when this error rejects an input.
    pub fn status(&self) -> Status {
        match self {
            ValidationError::MissingDatabase => Status::failure("no database"),
            ValidationError::MissingDatabaseName => Status::failure("no database name"),
            ValidationError::MissingDocId => Status::failure("no document id"),
            ValidationError::MissingDocRev => Status::failure("no revision"),
            ValidationError::PayloadNotObject => Status::failure("invalid payload"),
            ValidationError::MissingId => Status::failure("no _id"),
            ValidationError::MissingRev => Status::failure("no _rev"),
            ValidationError::InvalidSelector | ValidationError::SelectorSyntax(_) => {
                Status::failure("invalid selector")
            }
            ValidationError::NotConfirmed => Status::warning("not confirmed"),
        }
    }
}

// ---------------------------------------------------------------------------
// SetupError
// ---------------------------------------------------------------------------

/// A node could not obtain a connection at deploy time. Such a node refuses
/// every input.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The node has no server reference.
    #[error("CouchDB server not configured")]
    MissingServer,

    /// The node references a server id that is not deployed.
    #[error("CouchDB server {0:?} not found")]
    UnknownServer(String),

    /// The server's hostname/port do not form a valid URL.
    #[error("invalid CouchDB server address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The HTTP client could not be constructed (e.g. TLS backend failure).
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}
