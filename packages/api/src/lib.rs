//! Request and response bodies for the CouchDB HTTP API.
//!
//! This crate encodes the subset of the CouchDB REST contract that the
//! couchflow adapters speak as Rust types. It is shared by the client in
//! `couchflow` and by the in-memory stand-in server in `couchflow-mock`, so
//! both sides of every test agree on the wire format.
//!
//! # Endpoints covered
//!
//! | Method | Path | Type |
//! |--------|------|------|
//! | GET | `/` | → [`Welcome`] |
//! | GET | `/_all_dbs` | → `Vec<String>` |
//! | PUT | `/{db}` | → [`OkResponse`] |
//! | DELETE | `/{db}` | → [`OkResponse`] |
//! | GET | `/{db}` | → [`DatabaseInfo`] |
//! | POST | `/{db}` | document → [`DocumentResponse`] |
//! | GET | `/{db}/{docid}` | → document |
//! | PUT | `/{db}/{docid}` | document → [`DocumentResponse`] |
//! | DELETE | `/{db}/{docid}?rev=` | → [`DocumentResponse`] |
//! | POST | `/{db}/_find` | [`FindRequest`] → [`FindResponse`] |
//! | GET | `/{db}/_all_docs` | [`AllDocsQuery`] → [`AllDocsResponse`] |
//!
//! Every non-2xx response carries an [`ErrorBody`].

pub mod all_docs;
pub mod database;
pub mod document;
pub mod error;
pub mod find;

pub use all_docs::{AllDocsQuery, AllDocsResponse, AllDocsRow, RowValue};
pub use database::{DatabaseInfo, OkResponse, Vendor, Welcome};
pub use document::DocumentResponse;
pub use error::{codes, reasons, ErrorBody};
pub use find::{FindRequest, FindResponse};
