//! Mock server configuration, populated from environment variables.

use std::net::SocketAddr;

use thiserror::Error;

/// Runtime configuration for the mock server.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `COUCHFLOW_MOCK_BIND` | `127.0.0.1:5984` | TCP socket address to listen on |
/// | `COUCHFLOW_MOCK_ADMIN` | (absent = open) | `user:password` required via basic auth |
/// | `COUCHFLOW_MOCK_DATABASES` | (absent) | Comma-separated databases to create at startup |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockConfig {
    /// Socket address the server binds to.
    pub bind_addr: SocketAddr,

    /// Admin credentials. `None` leaves every endpoint open.
    pub admin: Option<Credentials>,

    /// Databases created before the server starts accepting requests.
    pub databases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("COUCHFLOW_MOCK_BIND must be a socket address like 127.0.0.1:5984, got {0:?}")]
    Bind(String),

    #[error("COUCHFLOW_MOCK_ADMIN must look like user:password")]
    Admin,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5984)),
            admin: None,
            databases: Vec::new(),
        }
    }
}

impl MockConfig {
    /// Populate config from environment variables, applying defaults where absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Populate config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(bind) = lookup("COUCHFLOW_MOCK_BIND") {
            config.bind_addr = bind.parse().map_err(|_| ConfigError::Bind(bind))?;
        }

        if let Some(admin) = lookup("COUCHFLOW_MOCK_ADMIN").filter(|a| !a.is_empty()) {
            let (username, password) = admin.split_once(':').ok_or(ConfigError::Admin)?;
            if username.is_empty() {
                return Err(ConfigError::Admin);
            }
            config.admin = Some(Credentials::new(username, password));
        }

        if let Some(list) = lookup("COUCHFLOW_MOCK_DATABASES") {
            config.databases = list
                .split(',')
                .map(str::trim)
                .filter(|db| !db.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(config)
    }
}
