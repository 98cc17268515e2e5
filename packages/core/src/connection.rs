//! The connection handle: one HTTP client bound to one CouchDB server.
//!
//! A [`Connection`] is built once from a resolved [`ServerConfig`] and
//! passed explicitly into every adapter's call path. It is read-only after
//! construction and cheap to clone, since [`reqwest::Client`] wraps an `Arc`
//! internally and pools connections.
//!
//! Every method issues exactly one HTTP request. There are no retries; the
//! only deadline is the client timeout taken from the server config.

use couchflow_api::{
    AllDocsQuery, AllDocsResponse, DocumentResponse, ErrorBody, FindRequest, FindResponse,
    OkResponse,
};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::SetupError;
use crate::server::ServerConfig;

// ---------------------------------------------------------------------------
// ClientError
// ---------------------------------------------------------------------------

/// Errors a remote call can return.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request could not be sent, timed out, or the body could not be
    /// decoded.
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("{}", couch_message(.error, .reason))]
    Couch {
        status: u16,
        error: String,
        reason: String,
    },
}

fn couch_message<'a>(error: &'a str, reason: &'a str) -> &'a str {
    if reason.is_empty() {
        error
    } else {
        reason
    }
}

impl ClientError {
    /// HTTP status of a server-side error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Couch { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// A handle to one CouchDB server.
#[derive(Debug, Clone)]
pub struct Connection {
    client: Client,
    base: Url,
    username: Option<String>,
    password: Option<String>,
}

impl Connection {
    /// Build a connection with a client configured from `config`.
    pub fn new(config: &ServerConfig) -> Result<Self, SetupError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(SetupError::Client)?;
        Self::with_client(client, config)
    }

    /// Build a connection around a pre-configured client.
    pub fn with_client(client: Client, config: &ServerConfig) -> Result<Self, SetupError> {
        Ok(Self {
            client,
            base: config.base_url()?,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    // --- Databases -----------------------------------------------------------

    /// `PUT /{db}`
    pub async fn create_db(&self, db: &str) -> Result<OkResponse, ClientError> {
        self.send(self.request(Method::PUT, &[db])).await
    }

    /// `DELETE /{db}`
    pub async fn destroy_db(&self, db: &str) -> Result<OkResponse, ClientError> {
        self.send(self.request(Method::DELETE, &[db])).await
    }

    /// `GET /_all_dbs`
    pub async fn list_dbs(&self) -> Result<Vec<String>, ClientError> {
        self.send(self.request(Method::GET, &["_all_dbs"])).await
    }

    // --- Documents -----------------------------------------------------------

    /// `POST /{db}`: create a document, or update it when the body carries
    /// `_id` and `_rev`.
    pub async fn insert(&self, db: &str, doc: &Value) -> Result<DocumentResponse, ClientError> {
        self.send(self.request(Method::POST, &[db]).json(doc)).await
    }

    /// `GET /{db}/{id}`
    pub async fn get(&self, db: &str, id: &str) -> Result<Value, ClientError> {
        self.send(self.request(Method::GET, &[db, id])).await
    }

    /// `DELETE /{db}/{id}?rev={rev}`
    pub async fn destroy(
        &self,
        db: &str,
        id: &str,
        rev: &str,
    ) -> Result<DocumentResponse, ClientError> {
        let request = self.request(Method::DELETE, &[db, id]).query(&[("rev", rev)]);
        self.send(request).await
    }

    /// `POST /{db}/_find`
    pub async fn find(&self, db: &str, query: &FindRequest) -> Result<FindResponse, ClientError> {
        self.send(self.request(Method::POST, &[db, "_find"]).json(query))
            .await
    }

    /// `GET /{db}/_all_docs`
    pub async fn list(
        &self,
        db: &str,
        query: &AllDocsQuery,
    ) -> Result<AllDocsResponse, ClientError> {
        let request = self
            .request(Method::GET, &[db, "_all_docs"])
            .query(&query.to_query_pairs());
        self.send(request).await
    }

    // --- Plumbing ------------------------------------------------------------

    /// URL for the given path segments, each percent-encoded. Segments that
    /// name CouchDB endpoints (`_all_dbs`, `_find`, ...) pass through
    /// unchanged because they contain only unreserved characters.
    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base.as_str().trim_end_matches('/').to_string();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.url(segments);
        debug!("couchdb: {method} {url}");
        let request = self.client.request(method, url);
        match self.username {
            Some(ref user) => request.basic_auth(user, self.password.as_deref()),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let bytes = response.bytes().await?;
        let body = serde_json::from_slice::<ErrorBody>(&bytes).unwrap_or_else(|_| {
            ErrorBody::new(
                status_name(status),
                String::from_utf8_lossy(&bytes).trim().to_string(),
            )
        });
        Err(ClientError::Couch {
            status: status.as_u16(),
            error: body.error,
            reason: body.reason,
        })
    }
}

/// `502 Bad Gateway` → `"bad_gateway"`, for error responses without a
/// CouchDB body.
fn status_name(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(|r| r.to_lowercase().replace(' ', "_"))
        .unwrap_or_else(|| "unknown_error".into())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Request, State},
        http::StatusCode,
        response::IntoResponse,
        Json, Router,
    };
    use serde_json::json;
    use tokio::net::TcpListener;

    /// What the mock server saw: method, raw path+query, Authorization header.
    type Seen = Arc<Mutex<Vec<(String, String, Option<String>)>>>;

    /// Spawn a loopback axum server and return its address as `host:port`.
    async fn spawn_mock_server(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr.to_string()
    }

    /// A server that records each request and answers with `reply`.
    async fn recording_server(status: StatusCode, reply: &'static str) -> (Connection, Seen) {
        let seen: Seen = Arc::default();
        let app = Router::new()
            .fallback(
                move |State(seen): State<Seen>, req: Request| async move {
                    let auth = req
                        .headers()
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    let target = req
                        .uri()
                        .path_and_query()
                        .map(|pq| pq.as_str().to_string())
                        .unwrap_or_default();
                    seen.lock()
                        .unwrap()
                        .push((req.method().to_string(), target, auth));
                    (
                        status,
                        [("content-type", "application/json")],
                        reply,
                    )
                        .into_response()
                },
            )
            .with_state(Arc::clone(&seen));
        let addr = spawn_mock_server(app).await;
        let (host, port) = addr.rsplit_once(':').unwrap();
        let config = ServerConfig::new(host)
            .with_port(port.parse().unwrap())
            .with_credentials("admin", "password");
        (Connection::new(&config).unwrap(), seen)
    }

    #[tokio::test]
    async fn path_segments_are_percent_encoded() {
        let (conn, seen) = recording_server(StatusCode::OK, r#"{"_id":"a/b","_rev":"1-x"}"#).await;

        conn.get("my$db", "a/b c").await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0, "GET");
        assert_eq!(seen[0].1, "/my%24db/a%2Fb%20c");
    }

    #[tokio::test]
    async fn basic_auth_header_is_sent() {
        let (conn, seen) = recording_server(StatusCode::OK, r#"["a","b"]"#).await;

        let dbs = conn.list_dbs().await.unwrap();

        assert_eq!(dbs, vec!["a", "b"]);
        let seen = seen.lock().unwrap();
        // base64("admin:password")
        assert_eq!(seen[0].2.as_deref(), Some("Basic YWRtaW46cGFzc3dvcmQ="));
    }

    #[tokio::test]
    async fn delete_sends_revision_as_query() {
        let (conn, seen) =
            recording_server(StatusCode::OK, r#"{"ok":true,"id":"d1","rev":"2-b"}"#).await;

        let resp = conn.destroy("orders", "d1", "1-a").await.unwrap();

        assert_eq!(resp.rev, "2-b");
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0, "DELETE");
        assert_eq!(seen[0].1, "/orders/d1?rev=1-a");
    }

    #[tokio::test]
    async fn all_docs_options_are_sent_as_query() {
        let (conn, seen) =
            recording_server(StatusCode::OK, r#"{"total_rows":0,"offset":0,"rows":[]}"#).await;
        let query = AllDocsQuery {
            limit: Some(5),
            startkey: Some(json!("a")),
            ..Default::default()
        };

        conn.list("orders", &query).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].1, "/orders/_all_docs?limit=5&startkey=%22a%22");
    }

    #[tokio::test]
    async fn couch_error_body_becomes_client_error() {
        let (conn, _) = recording_server(
            StatusCode::CONFLICT,
            r#"{"error":"conflict","reason":"Document update conflict."}"#,
        )
        .await;

        let err = conn.insert("orders", &json!({ "_id": "x" })).await.unwrap_err();

        assert_eq!(err.status(), Some(409));
        assert_eq!(err.to_string(), "Document update conflict.");
        assert!(matches!(err, ClientError::Couch { ref error, .. } if error == "conflict"));
    }

    #[tokio::test]
    async fn non_json_error_body_is_kept_as_reason() {
        let (conn, _) = recording_server(StatusCode::BAD_GATEWAY, "upstream down").await;

        let err = conn.create_db("orders").await.unwrap_err();

        match err {
            ClientError::Couch {
                status,
                error,
                reason,
            } => {
                assert_eq!(status, 502);
                assert_eq!(error, "bad_gateway");
                assert_eq!(reason, "upstream down");
            }
            other => panic!("expected Couch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_server_is_an_http_error() {
        // Bind then drop a listener so the port is very likely closed.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let conn = Connection::new(&ServerConfig::new("127.0.0.1").with_port(port)).unwrap();
        let err = conn.list_dbs().await.unwrap_err();

        assert!(matches!(err, ClientError::Http(ref e) if e.is_connect()));
    }

    #[tokio::test]
    async fn find_posts_selector_body() {
        async fn echo_find(Json(body): Json<Value>) -> Json<Value> {
            Json(json!({ "docs": [body["selector"].clone()] }))
        }
        let addr =
            spawn_mock_server(Router::new().route("/orders/_find", axum::routing::post(echo_find)))
                .await;
        let (host, port) = addr.rsplit_once(':').unwrap();
        let conn =
            Connection::new(&ServerConfig::new(host).with_port(port.parse().unwrap())).unwrap();

        let mut query = FindRequest::new(json!({ "name": "x" }));
        query.limit = Some(10);
        let resp = conn.find("orders", &query).await.unwrap();

        assert_eq!(resp.docs, vec![json!({ "name": "x" })]);
    }
}
