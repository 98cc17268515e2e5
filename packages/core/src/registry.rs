//! Node type names and type-erased node dispatch.
//!
//! The host identifies nodes by a type string (`"couchdb-insert"`). This
//! module maps those strings to [`NodeKind`]s and builds the matching
//! [`Node`] from the host's node JSON.

use std::fmt;

use serde_json::Value;

use crate::flow::FlowError;
use crate::message::Message;
use crate::node::{Node, Outcome};
use crate::ops::{CreateDb, DeleteDb, DeleteDoc, Get, Insert, ListDbs, ListDocs, Query, Update};
use crate::server::ServerRegistry;
use crate::status::Status;

/// Prefix shared by every type name this crate registers.
pub const TYPE_PREFIX: &str = "couchdb-";

/// Every node type this crate registers with the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The shared server configuration node.
    Server,
    CreateDb,
    DeleteDb,
    Insert,
    Get,
    Update,
    DeleteDoc,
    Query,
    ListDbs,
    ListDocs,
}

impl NodeKind {
    pub const ALL: [NodeKind; 10] = [
        NodeKind::Server,
        NodeKind::CreateDb,
        NodeKind::DeleteDb,
        NodeKind::Insert,
        NodeKind::Get,
        NodeKind::Update,
        NodeKind::DeleteDoc,
        NodeKind::Query,
        NodeKind::ListDbs,
        NodeKind::ListDocs,
    ];

    pub fn type_name(self) -> &'static str {
        match self {
            NodeKind::Server => "couchdb-server",
            NodeKind::CreateDb => "couchdb-create-db",
            NodeKind::DeleteDb => "couchdb-delete-db",
            NodeKind::Insert => "couchdb-insert",
            NodeKind::Get => "couchdb-get",
            NodeKind::Update => "couchdb-update",
            NodeKind::DeleteDoc => "couchdb-delete-doc",
            NodeKind::Query => "couchdb-query",
            NodeKind::ListDbs => "couchdb-list-dbs",
            NodeKind::ListDocs => "couchdb-list-docs",
        }
    }

    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.type_name() == name)
    }

    /// `false` only for the server configuration node, which takes no input.
    pub fn is_operation(self) -> bool {
        self != NodeKind::Server
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

// ---------------------------------------------------------------------------
// AnyNode
// ---------------------------------------------------------------------------

/// A deployed operation node of any kind.
#[derive(Debug)]
pub enum AnyNode {
    CreateDb(Node<CreateDb>),
    DeleteDb(Node<DeleteDb>),
    Insert(Node<Insert>),
    Get(Node<Get>),
    Update(Node<Update>),
    DeleteDoc(Node<DeleteDoc>),
    Query(Node<Query>),
    ListDbs(Node<ListDbs>),
    ListDocs(Node<ListDocs>),
}

macro_rules! each_node {
    ($self:expr, $node:ident => $body:expr) => {
        match $self {
            AnyNode::CreateDb($node) => $body,
            AnyNode::DeleteDb($node) => $body,
            AnyNode::Insert($node) => $body,
            AnyNode::Get($node) => $body,
            AnyNode::Update($node) => $body,
            AnyNode::DeleteDoc($node) => $body,
            AnyNode::Query($node) => $body,
            AnyNode::ListDbs($node) => $body,
            AnyNode::ListDocs($node) => $body,
        }
    };
}

/// Deserialise the node config for `id` into an operation.
fn parse<O: serde::de::DeserializeOwned>(id: &str, config: &Value) -> Result<O, FlowError> {
    serde_json::from_value(config.clone()).map_err(|source| FlowError::InvalidConfig {
        id: id.to_string(),
        source,
    })
}

impl AnyNode {
    /// Build and deploy an operation node from its host JSON.
    pub fn build(
        id: &str,
        kind: NodeKind,
        config: &Value,
        servers: &ServerRegistry,
    ) -> Result<Self, FlowError> {
        let node = match kind {
            NodeKind::Server => {
                return Err(FlowError::NotAnOperation {
                    id: id.to_string(),
                })
            }
            NodeKind::CreateDb => AnyNode::CreateDb(Node::deploy(id, parse(id, config)?, servers)),
            NodeKind::DeleteDb => AnyNode::DeleteDb(Node::deploy(id, parse(id, config)?, servers)),
            NodeKind::Insert => AnyNode::Insert(Node::deploy(id, parse(id, config)?, servers)),
            NodeKind::Get => AnyNode::Get(Node::deploy(id, parse(id, config)?, servers)),
            NodeKind::Update => AnyNode::Update(Node::deploy(id, parse(id, config)?, servers)),
            NodeKind::DeleteDoc => {
                AnyNode::DeleteDoc(Node::deploy(id, parse(id, config)?, servers))
            }
            NodeKind::Query => AnyNode::Query(Node::deploy(id, parse(id, config)?, servers)),
            NodeKind::ListDbs => AnyNode::ListDbs(Node::deploy(id, parse(id, config)?, servers)),
            NodeKind::ListDocs => AnyNode::ListDocs(Node::deploy(id, parse(id, config)?, servers)),
        };
        Ok(node)
    }

    pub fn id(&self) -> &str {
        each_node!(self, n => n.id())
    }

    pub fn kind(&self) -> NodeKind {
        each_node!(self, n => n.kind())
    }

    pub fn is_ready(&self) -> bool {
        each_node!(self, n => n.is_ready())
    }

    pub fn status(&self) -> Option<&Status> {
        each_node!(self, n => n.status())
    }

    pub async fn receive(&mut self, msg: Message) -> Outcome {
        each_node!(self, n => n.receive(msg).await)
    }

    pub fn close(&mut self) {
        each_node!(self, n => n.close())
    }
}
