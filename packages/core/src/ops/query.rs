//! Mango query adapter.

use async_trait::async_trait;
use couchflow_api::{FindRequest, FindResponse};
use serde::Deserialize;
use serde_json::Value;

use crate::connection::{ClientError, Connection};
use crate::error::ValidationError;
use crate::lenient;
use crate::message::Message;
use crate::node::Operation;
use crate::registry::NodeKind;
use crate::resolve::resolve;
use crate::status::Status;

use super::{require_database, to_json};

/// Result cap applied when neither node nor message sets `limit`.
pub const DEFAULT_LIMIT: u64 = 100;

/// A resolved `_find` call.
#[derive(Debug, Clone)]
pub struct FindCall {
    pub database: String,
    pub query: FindRequest,
}

/// `couchdb-query`: find documents matching a selector.
///
/// The selector is the node's `selector` (JSON text) if set, else
/// `msg.selector`; either way it must be a JSON object. Matching documents
/// land in `msg.payload` and their number in `msg.count`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub server: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub database: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub selector: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub limit: Option<u64>,
}

impl Query {
    fn selector(&self, msg: &Message) -> Result<Value, ValidationError> {
        let configured = match self.selector {
            Some(ref text) => Some(
                serde_json::from_str::<Value>(text)
                    .map_err(|e| ValidationError::SelectorSyntax(e.to_string()))?,
            ),
            None => None,
        };
        match resolve(configured, msg.get("selector").cloned()) {
            Some(selector @ Value::Object(_)) => Ok(selector),
            _ => Err(ValidationError::InvalidSelector),
        }
    }
}

#[async_trait]
impl Operation for Query {
    type Request = FindCall;
    type Response = FindResponse;

    fn kind(&self) -> NodeKind {
        NodeKind::Query
    }

    fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    fn prepare(&self, msg: &Message) -> Result<FindCall, ValidationError> {
        let database = require_database(self.database.as_deref(), msg)?;
        let mut query = FindRequest::new(self.selector(msg)?);
        // Zero means unset, not an empty page.
        let nonzero = |limit: Option<u64>| limit.filter(|&l| l > 0);
        let limit = resolve(nonzero(self.limit), nonzero(msg.count("limit")));
        query.limit = Some(limit.unwrap_or(DEFAULT_LIMIT));
        query.skip = msg.count("skip");
        Ok(FindCall { database, query })
    }

    fn busy(&self, _call: &FindCall) -> Status {
        Status::busy("querying...")
    }

    async fn call(&self, conn: &Connection, call: &FindCall) -> Result<FindResponse, ClientError> {
        conn.find(&call.database, &call.query).await
    }

    fn complete(&self, msg: &mut Message, _call: FindCall, response: FindResponse) -> Status {
        let count = response.docs.len();
        msg.set("result", to_json(&response));
        msg.set("payload", Value::Array(response.docs));
        msg.set("count", count);
        Status::success(format!("Found: {count} docs"))
    }

    fn failure_label(&self) -> &'static str {
        "Query failed"
    }
}
