//! Shared helpers for the couchflow end-to-end suite.
//!
//! Provides [`spawn_mock`], which binds a `TcpListener` on an ephemeral
//! port, serves an in-process `couchflow-mock` backed by a `MemoryStore`,
//! and returns a [`MockServer`] handle. The handle exposes the store (so
//! tests can seed data without going through HTTP), a request counter (so
//! tests can prove that no remote call was made), and helpers to deploy
//! adapter nodes against the server.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{extract::Request, middleware::Next};
use couchflow::{Node, Operation, ServerConfig, ServerRegistry};
use couchflow_mock::{build_router, MemoryStore, MockConfig, Store};
use serde_json::{json, Value};

/// Id under which the mock is registered as a server config node.
pub const SERVER_ID: &str = "couch";

/// A running in-process mock server.
pub struct MockServer {
    pub addr: SocketAddr,
    pub store: Arc<MemoryStore>,
    requests: Arc<AtomicUsize>,
    credentials: Option<(String, String)>,
}

impl MockServer {
    /// A server config pointing at this mock, with its credentials if any.
    pub fn config(&self) -> ServerConfig {
        let config = ServerConfig::new(self.addr.ip().to_string()).with_port(self.addr.port());
        match self.credentials {
            Some((ref user, ref password)) => config.with_credentials(user, password),
            None => config,
        }
    }

    /// A registry holding [`MockServer::config`] under [`SERVER_ID`].
    pub fn registry(&self) -> ServerRegistry {
        let mut servers = ServerRegistry::new();
        servers.insert(SERVER_ID, self.config());
        servers
    }

    /// The server config node as the host would export it.
    pub fn server_node(&self) -> Value {
        let mut node = json!({
            "id": SERVER_ID,
            "type": "couchdb-server",
            "hostname": self.addr.ip().to_string(),
            "port": self.addr.port().to_string(),
        });
        if let Some((ref user, ref password)) = self.credentials {
            node["username"] = json!(user);
            node["credentials"] = json!({ "password": password });
        }
        node
    }

    /// Deploy `op` against this server.
    pub fn deploy<O: Operation>(&self, id: &str, op: O) -> Node<O> {
        Node::deploy(id, op, &self.registry())
    }

    /// Number of HTTP requests the mock has received so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

/// Start an open mock server on an ephemeral port.
///
/// # Panics
///
/// Panics if the TCP listener cannot be bound.
pub async fn spawn_mock() -> MockServer {
    spawn_mock_with(MockConfig::default()).await
}

/// Start a mock server with the given config. `bind_addr` is ignored; the
/// server always binds an ephemeral loopback port.
pub async fn spawn_mock_with(config: MockConfig) -> MockServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("get local addr");

    let store = Arc::new(MemoryStore::new());
    let requests = Arc::new(AtomicUsize::new(0));
    let credentials = config
        .admin
        .as_ref()
        .map(|c| (c.username.clone(), c.password.clone()));

    let counter = Arc::clone(&requests);
    let router = build_router(Arc::clone(&store) as Arc<dyn Store>, config).layer(
        axum::middleware::from_fn(move |req: Request, next: Next| {
            counter.fetch_add(1, Ordering::SeqCst);
            next.run(req)
        }),
    );

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("conformance mock error");
    });

    MockServer {
        addr,
        store,
        requests,
        credentials,
    }
}
