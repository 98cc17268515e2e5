//! `couchflow-mock`: an in-memory CouchDB stand-in.
//!
//! # Quick start
//!
//! ```sh
//! # Open server on the default CouchDB port:
//! couchflow-mock
//!
//! # Require credentials and pre-create two databases:
//! COUCHFLOW_MOCK_ADMIN=admin:password COUCHFLOW_MOCK_DATABASES=orders,users couchflow-mock
//! ```
//!
//! # Environment variables
//!
//! See [`couchflow_mock::MockConfig`] for the full list.

use std::sync::Arc;

use couchflow_mock::{build_router, MemoryStore, MockConfig, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "couchflow_mock=info,tower_http=debug".into()),
        )
        .init();

    let config = MockConfig::from_env()?;

    let store = Arc::new(MemoryStore::new());
    for db in &config.databases {
        match store.create_db(db).await {
            Ok(()) => tracing::info!("seeded database {db}"),
            Err(e) => tracing::warn!("could not seed database {db}: {e}"),
        }
    }
    if config.admin.is_some() {
        tracing::info!("basic auth required for all endpoints except /");
    }

    let bind_addr = config.bind_addr;
    let app = build_router(store, config);

    tracing::info!("listening on {bind_addr}");
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
