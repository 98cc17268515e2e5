//! A deployed flow: server config nodes plus the operation nodes that use them.
//!
//! [`Flow::from_json`] accepts the host's exported flow format, a JSON array
//! of node objects each carrying at least `id` and `type`. Server nodes are
//! registered first so operation nodes can resolve their `server` reference
//! regardless of array order. Nodes whose type does not start with
//! `couchdb-` belong to other packages and are skipped.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::message::Message;
use crate::node::Outcome;
use crate::registry::{AnyNode, NodeKind, TYPE_PREFIX};
use crate::server::{ServerConfig, ServerRegistry};

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("flow is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("flow must be a JSON array of nodes")]
    NotAnArray,

    #[error("node at index {0} has no id")]
    MissingId(usize),

    #[error("node {id} has unknown type {type_name:?}")]
    UnknownType { id: String, type_name: String },

    #[error("node {id} has invalid configuration: {source}")]
    InvalidConfig {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("node {id} is a configuration node and takes no input")]
    NotAnOperation { id: String },

    #[error("duplicate node id {0}")]
    DuplicateId(String),

    #[error("no node with id {0}")]
    UnknownNode(String),
}

/// Deployed server and operation nodes, addressable by id.
#[derive(Debug, Default)]
pub struct Flow {
    servers: ServerRegistry,
    nodes: HashMap<String, AnyNode>,
}

/// `(id, kind, node)` for one entry of the flow array, or `None` when the
/// entry belongs to another package.
fn classify(index: usize, node: &Value) -> Result<Option<(String, NodeKind)>, FlowError> {
    let type_name = node.get("type").and_then(Value::as_str).unwrap_or_default();
    if !type_name.starts_with(TYPE_PREFIX) {
        return Ok(None);
    }
    let id = node
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or(FlowError::MissingId(index))?
        .to_string();
    let kind = NodeKind::from_type_name(type_name).ok_or_else(|| FlowError::UnknownType {
        id: id.clone(),
        type_name: type_name.to_string(),
    })?;
    Ok(Some((id, kind)))
}

impl Flow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and deploy a flow from its exported JSON text.
    pub fn from_json(text: &str) -> Result<Self, FlowError> {
        let value: Value = serde_json::from_str(text).map_err(FlowError::Parse)?;
        Self::from_value(&value)
    }

    /// Deploy a flow from an already-parsed node array.
    pub fn from_value(value: &Value) -> Result<Self, FlowError> {
        let entries = value.as_array().ok_or(FlowError::NotAnArray)?;

        let mut classified = Vec::new();
        for (index, node) in entries.iter().enumerate() {
            if let Some((id, kind)) = classify(index, node)? {
                classified.push((id, kind, node));
            } else {
                debug!(index, "skipping foreign node");
            }
        }

        let mut flow = Flow::new();
        for (id, _, node) in classified.iter().filter(|(_, k, _)| !k.is_operation()) {
            if flow.servers.get(id).is_some() {
                return Err(FlowError::DuplicateId(id.clone()));
            }
            let config = ServerConfig::from_node(node).map_err(|source| {
                FlowError::InvalidConfig {
                    id: id.clone(),
                    source,
                }
            })?;
            flow.servers.insert(id.clone(), config);
        }
        for (id, kind, node) in classified.iter().filter(|(_, k, _)| k.is_operation()) {
            flow.add(AnyNode::build(id, *kind, node, &flow.servers)?)?;
        }

        info!(
            servers = flow.servers.len(),
            nodes = flow.nodes.len(),
            "flow deployed"
        );
        Ok(flow)
    }

    /// Register a server configuration for nodes added afterwards.
    pub fn add_server(&mut self, id: impl Into<String>, config: ServerConfig) {
        self.servers.insert(id, config);
    }

    /// Add an already-built operation node.
    pub fn add(&mut self, node: AnyNode) -> Result<(), FlowError> {
        let id = node.id().to_string();
        if self.nodes.contains_key(&id) || self.servers.get(&id).is_some() {
            return Err(FlowError::DuplicateId(id));
        }
        self.nodes.insert(id, node);
        Ok(())
    }

    /// Deliver one message to the operation node `id`.
    pub async fn receive(&mut self, id: &str, msg: Message) -> Result<Outcome, FlowError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| FlowError::UnknownNode(id.to_string()))?;
        Ok(node.receive(msg).await)
    }

    pub fn node(&self, id: &str) -> Option<&AnyNode> {
        self.nodes.get(id)
    }

    pub fn servers(&self) -> &ServerRegistry {
        &self.servers
    }

    /// Number of operation nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Close every operation node, clearing their status indicators.
    pub fn close(&mut self) {
        for node in self.nodes.values_mut() {
            node.close();
        }
    }
}
