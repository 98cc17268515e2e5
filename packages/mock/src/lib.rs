//! Public surface for the `couchflow-mock` crate.
//!
//! An in-memory server speaking the subset of the CouchDB HTTP API that the
//! couchflow adapters use. The router builder and storage types are exported
//! so other crates (the conformance suite) can run it in-process.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod storage;

pub use config::{Credentials, MockConfig};
pub use router::build_router;
pub use storage::{memory::MemoryStore, Store, StoreError};
