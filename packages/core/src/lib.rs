//! CouchDB adapter nodes for a message-driven flow host.
//!
//! Each node takes one input message, makes at most one call against a
//! CouchDB server, and emits the message on exactly one of two outputs:
//! success (0) or failure (1). Node settings take precedence over message
//! fields when both supply a value.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`server`] | Server config nodes ([`ServerConfig`]) and the [`ServerRegistry`] adapters resolve against |
//! | [`connection`] | [`Connection`]: the HTTP client for one server |
//! | [`node`] | The [`Operation`] contract and the [`Node`] that drives it |
//! | [`ops`] | The nine operation adapters |
//! | [`registry`] | [`NodeKind`] type names and the type-erased [`AnyNode`] |
//! | [`flow`] | [`Flow`]: deploy a whole exported flow and route messages by node id |
//! | [`message`] | [`Message`]: the JSON object that travels between nodes |
//! | [`error`] | Validation, setup and client errors, normalized into [`ErrorInfo`] |
//! | [`status`] | The node status indicator |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use couchflow::{Flow, Message};
//! use serde_json::json;
//!
//! let mut flow = Flow::from_json(r#"[
//!     { "id": "s1", "type": "couchdb-server", "hostname": "localhost" },
//!     { "id": "ins", "type": "couchdb-insert", "server": "s1", "database": "orders" }
//! ]"#)?;
//!
//! let outcome = flow
//!     .receive("ins", Message::with_payload(json!({ "item": "widget" })))
//!     .await?;
//! assert_eq!(outcome.output(), 0);
//! ```

pub mod connection;
pub mod error;
pub mod flow;
pub mod lenient;
pub mod message;
pub mod node;
pub mod ops;
pub mod registry;
pub mod resolve;
pub mod server;
pub mod status;

pub use connection::{ClientError, Connection};
pub use error::{ErrorInfo, SetupError, ValidationError};
pub use flow::{Flow, FlowError};
pub use message::Message;
pub use node::{Node, Operation, Outcome};
pub use registry::{AnyNode, NodeKind};
pub use server::{ServerConfig, ServerRegistry};
pub use status::{Fill, Shape, Status};
