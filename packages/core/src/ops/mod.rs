//! The nine operation adapters.
//!
//! Each adapter's struct is also its node configuration: it deserialises
//! from the host's node JSON (camelCase keys, blank fields read as unset).
//!
//! | Type name | Adapter | Remote call |
//! |-----------|---------|-------------|
//! | `couchdb-create-db` | [`CreateDb`] | `PUT /{db}` |
//! | `couchdb-delete-db` | [`DeleteDb`] | `DELETE /{db}` |
//! | `couchdb-insert` | [`Insert`] | `POST /{db}` |
//! | `couchdb-get` | [`Get`] | `GET /{db}/{id}` |
//! | `couchdb-update` | [`Update`] | `POST /{db}` |
//! | `couchdb-delete-doc` | [`DeleteDoc`] | `DELETE /{db}/{id}?rev=` |
//! | `couchdb-query` | [`Query`] | `POST /{db}/_find` |
//! | `couchdb-list-dbs` | [`ListDbs`] | `GET /_all_dbs` |
//! | `couchdb-list-docs` | [`ListDocs`] | `GET /{db}/_all_docs` |

pub mod database;
pub mod document;
pub mod list;
pub mod query;

pub use database::{CreateDb, DeleteDb};
pub use document::{DeleteDoc, Get, Insert, Update};
pub use list::{ListDbs, ListDocs};
pub use query::Query;

use serde::Serialize;
use serde_json::Value;

use crate::error::ValidationError;
use crate::message::Message;
use crate::resolve::resolve;

/// `database`: node config, then `msg.database`.
fn require_database(config: Option<&str>, msg: &Message) -> Result<String, ValidationError> {
    resolve(config.map(str::to_string), msg.text("database"))
        .ok_or(ValidationError::MissingDatabase)
}

/// Wire structs hold only strings, numbers and JSON values, so serialising
/// them cannot fail.
fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
