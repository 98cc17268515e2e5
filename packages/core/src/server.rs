//! Server configuration and the registry that resolves server references.
//!
//! A [`ServerConfig`] is deployed once per flow and referenced by id from
//! every adapter that talks to that server. [`ServerRegistry::resolve`] is the
//! lookup adapters perform at deploy time; a missing entry leaves the adapter
//! unable to serve any input.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::connection::Connection;
use crate::error::SetupError;
use crate::lenient;

/// CouchDB's standard port.
pub const DEFAULT_PORT: u16 = 5984;

/// Default per-request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection parameters for one CouchDB server.
///
/// Deserialises from the host's server-node JSON:
///
/// ```json
/// { "hostname": "localhost", "port": "5984", "username": "admin",
///   "credentials": { "password": "secret" } }
/// ```
///
/// | Field | Default | Description |
/// |-------|---------|-------------|
/// | `hostname` | required | Host name or address; may carry an `http://`/`https://` prefix |
/// | `port` | `5984` | TCP port, number or numeric string |
/// | `username` | (none) | Basic-auth user; no auth header is sent when unset |
/// | `password` | (none) | Basic-auth password, normally from `credentials` |
/// | `tls` | `false` | Use `https` |
/// | `timeoutSecs` | `30` | Per-request timeout; `0` disables it |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    pub hostname: String,

    #[serde(default = "default_port", deserialize_with = "port")]
    pub port: u16,

    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub username: Option<String>,

    /// Never serialised back out.
    #[serde(default, skip_serializing, deserialize_with = "lenient::opt_string")]
    pub password: Option<String>,

    #[serde(default, deserialize_with = "lenient::flag")]
    pub tls: bool,

    #[serde(default = "default_timeout", deserialize_with = "timeout")]
    pub timeout_secs: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = lenient::opt_u64(deserializer)?.unwrap_or(u64::from(DEFAULT_PORT));
    u16::try_from(value)
        .map_err(|_| serde::de::Error::custom(format!("port {value} is out of range")))
}

fn timeout<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(lenient::opt_u64(deserializer)?.unwrap_or(DEFAULT_TIMEOUT_SECS))
}

/// Host-side wrapper: the config fields plus the secret `credentials` block
/// the host keeps out of the flow file.
#[derive(Deserialize)]
struct ServerNode {
    #[serde(flatten)]
    config: ServerConfig,
    #[serde(default)]
    credentials: Option<Credentials>,
}

#[derive(Deserialize)]
struct Credentials {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    password: Option<String>,
}

impl ServerConfig {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            tls: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Parse a server node definition, folding `credentials.password` into
    /// [`ServerConfig::password`].
    pub fn from_node(node: &Value) -> Result<Self, serde_json::Error> {
        let parsed = ServerNode::deserialize(node)?;
        let mut config = parsed.config;
        if let Some(password) = parsed.credentials.and_then(|c| c.password) {
            config.password = Some(password);
        }
        Ok(config)
    }

    /// The request timeout, or `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Root URL of the server, e.g. `http://localhost:5984/`.
    ///
    /// A scheme prefix on `hostname` overrides [`ServerConfig::tls`].
    pub fn base_url(&self) -> Result<reqwest::Url, SetupError> {
        let (scheme, host) = if let Some(rest) = self.hostname.strip_prefix("https://") {
            ("https", rest)
        } else if let Some(rest) = self.hostname.strip_prefix("http://") {
            ("http", rest)
        } else if self.tls {
            ("https", self.hostname.as_str())
        } else {
            ("http", self.hostname.as_str())
        };
        let host = host.trim_end_matches('/');
        let address = format!("{scheme}://{host}:{}/", self.port);

        let invalid = |reason: String| SetupError::InvalidAddress {
            address: address.clone(),
            reason,
        };
        if host.is_empty() {
            return Err(invalid("hostname is empty".into()));
        }
        let url = reqwest::Url::parse(&address).map_err(|e| invalid(e.to_string()))?;
        if url.path() != "/" || url.query().is_some() {
            return Err(invalid("hostname must not contain a path".into()));
        }
        Ok(url)
    }

    /// Build the connection handle adapters use for their remote calls.
    pub fn connect(&self) -> Result<Connection, SetupError> {
        Connection::new(self)
    }
}

// ---------------------------------------------------------------------------
// ServerRegistry
// ---------------------------------------------------------------------------

/// Deployed server configurations, keyed by node id.
#[derive(Debug, Clone, Default)]
pub struct ServerRegistry {
    servers: HashMap<String, ServerConfig>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the server with the given id.
    pub fn insert(&mut self, id: impl Into<String>, config: ServerConfig) {
        self.servers.insert(id.into(), config);
    }

    pub fn get(&self, id: &str) -> Option<&ServerConfig> {
        self.servers.get(id)
    }

    /// Resolve an adapter's server reference.
    pub fn resolve(&self, server: Option<&str>) -> Result<&ServerConfig, SetupError> {
        let id = server
            .filter(|s| !s.is_empty())
            .ok_or(SetupError::MissingServer)?;
        self.get(id)
            .ok_or_else(|| SetupError::UnknownServer(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}
