//! Listing adapters: databases on a server, documents in a database.

use async_trait::async_trait;
use couchflow_api::{AllDocsQuery, AllDocsResponse};
use serde::Deserialize;
use serde_json::Value;

use crate::connection::{ClientError, Connection};
use crate::error::ValidationError;
use crate::lenient;
use crate::message::Message;
use crate::node::Operation;
use crate::registry::NodeKind;
use crate::resolve::{configured_flag, resolve};
use crate::status::Status;

use super::{require_database, to_json};

// ---------------------------------------------------------------------------
// ListDbs
// ---------------------------------------------------------------------------

/// `couchdb-list-dbs`: list every database on the server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDbs {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub server: Option<String>,
}

#[async_trait]
impl Operation for ListDbs {
    type Request = ();
    type Response = Vec<String>;

    fn kind(&self) -> NodeKind {
        NodeKind::ListDbs
    }

    fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    fn prepare(&self, _msg: &Message) -> Result<(), ValidationError> {
        Ok(())
    }

    fn busy(&self, _request: &()) -> Status {
        Status::busy("listing...")
    }

    async fn call(&self, conn: &Connection, _request: &()) -> Result<Vec<String>, ClientError> {
        conn.list_dbs().await
    }

    fn complete(&self, msg: &mut Message, _request: (), databases: Vec<String>) -> Status {
        let count = databases.len();
        let databases = Value::from(databases);
        msg.set("payload", databases.clone());
        msg.set("databases", databases);
        msg.set("count", count);
        Status::success("success")
    }

    fn failure_label(&self) -> &'static str {
        "Failed to list databases"
    }
}

// ---------------------------------------------------------------------------
// ListDocs
// ---------------------------------------------------------------------------

/// A resolved `_all_docs` call.
#[derive(Debug, Clone)]
pub struct ListCall {
    pub database: String,
    pub query: AllDocsQuery,
}

/// `couchdb-list-docs`: page through a database's documents.
///
/// Options come from the node (`limit`, `includeDocs`, `descending`) and the
/// message (`limit`, `skip`, `startkey`, `endkey`, `includeDocs` or
/// `include_docs`, `descending`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocs {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub server: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub database: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub limit: Option<u64>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub include_docs: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub descending: bool,
}

/// A key bound from the message: any JSON value except `null`.
fn key_bound(msg: &Message, key: &str) -> Option<Value> {
    msg.get(key).filter(|v| !v.is_null()).cloned()
}

#[async_trait]
impl Operation for ListDocs {
    type Request = ListCall;
    type Response = AllDocsResponse;

    fn kind(&self) -> NodeKind {
        NodeKind::ListDocs
    }

    fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    fn prepare(&self, msg: &Message) -> Result<ListCall, ValidationError> {
        let database = require_database(self.database.as_deref(), msg)?;
        let include_docs = msg.flag("includeDocs").or_else(|| msg.flag("include_docs"));
        let query = AllDocsQuery {
            limit: resolve(self.limit, msg.count("limit")),
            skip: msg.count("skip"),
            startkey: key_bound(msg, "startkey"),
            endkey: key_bound(msg, "endkey"),
            include_docs: resolve(configured_flag(self.include_docs), include_docs),
            descending: resolve(configured_flag(self.descending), msg.flag("descending")),
        };
        Ok(ListCall { database, query })
    }

    fn busy(&self, _call: &ListCall) -> Status {
        Status::busy("listing...")
    }

    async fn call(
        &self,
        conn: &Connection,
        call: &ListCall,
    ) -> Result<AllDocsResponse, ClientError> {
        conn.list(&call.database, &call.query).await
    }

    fn complete(&self, msg: &mut Message, call: ListCall, response: AllDocsResponse) -> Status {
        if call.query.include_docs == Some(true) {
            let docs: Vec<Value> = response
                .rows
                .iter()
                .map(|row| row.doc.clone().unwrap_or(Value::Null))
                .collect();
            msg.set("docs", docs);
        }
        msg.set("rows", to_json(&response.rows));
        msg.set("totalRows", response.total_rows);
        msg.set("offset", response.offset);
        msg.set("payload", to_json(&response));
        Status::success("success")
    }

    fn failure_label(&self) -> &'static str {
        "Failed to list documents"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use couchflow_api::{AllDocsRow, RowValue};
    use serde_json::json;

    fn list() -> ListDocs {
        ListDocs {
            database: Some("orders".into()),
            ..Default::default()
        }
    }

    #[test]
    fn message_options_are_forwarded() {
        let msg = Message::from_value(json!({
            "limit": "3",
            "skip": 1,
            "startkey": "a",
            "endkey": "m",
            "include_docs": true,
            "descending": false,
        }))
        .unwrap();
        let call = list().prepare(&msg).unwrap();
        assert_eq!(
            call.query,
            AllDocsQuery {
                limit: Some(3),
                skip: Some(1),
                startkey: Some(json!("a")),
                endkey: Some(json!("m")),
                include_docs: Some(true),
                descending: Some(false),
            }
        );
    }

    #[test]
    fn unset_options_are_not_sent() {
        let call = list().prepare(&Message::new()).unwrap();
        assert_eq!(call.query, AllDocsQuery::default());
    }

    #[test]
    fn configured_flags_turn_options_on() {
        let op = ListDocs {
            include_docs: true,
            descending: true,
            limit: Some(50),
            ..list()
        };
        let call = op.prepare(&Message::new().with("limit", 5)).unwrap();
        assert_eq!(call.query.include_docs, Some(true));
        assert_eq!(call.query.descending, Some(true));
        assert_eq!(call.query.limit, Some(50));
    }

    #[test]
    fn docs_mirror_rows_when_included() {
        let op = list();
        let call = op
            .prepare(&Message::new().with("includeDocs", true))
            .unwrap();
        let response = AllDocsResponse {
            total_rows: 2,
            offset: 0,
            rows: vec![
                AllDocsRow {
                    id: "a".into(),
                    key: json!("a"),
                    value: RowValue { rev: "1-a".into() },
                    doc: Some(json!({ "_id": "a", "_rev": "1-a" })),
                },
                AllDocsRow {
                    id: "b".into(),
                    key: json!("b"),
                    value: RowValue { rev: "1-b".into() },
                    doc: Some(json!({ "_id": "b", "_rev": "1-b" })),
                },
            ],
        };
        let mut msg = Message::new();
        op.complete(&mut msg, call, response);

        let rows = msg.get("rows").and_then(Value::as_array).unwrap();
        let expected: Vec<Value> = rows.iter().map(|r| r["doc"].clone()).collect();
        assert_eq!(msg.get("docs"), Some(&Value::from(expected)));
        assert_eq!(msg.get("totalRows"), Some(&json!(2)));
        assert_eq!(msg.get("offset"), Some(&json!(0)));
    }

    #[test]
    fn docs_absent_without_include_docs() {
        let op = list();
        let call = op.prepare(&Message::new()).unwrap();
        let response = AllDocsResponse {
            total_rows: 0,
            offset: 0,
            rows: vec![],
        };
        let mut msg = Message::new();
        op.complete(&mut msg, call, response);
        assert!(msg.get("docs").is_none());
        assert_eq!(msg.get("rows"), Some(&json!([])));
    }

    #[test]
    fn list_dbs_sets_databases_and_count() {
        let mut msg = Message::new();
        ListDbs::default().complete(&mut msg, (), vec!["a".into(), "b".into()]);
        assert_eq!(msg.get("databases"), Some(&json!(["a", "b"])));
        assert_eq!(msg.payload(), Some(&json!(["a", "b"])));
        assert_eq!(msg.get("count"), Some(&json!(2)));
    }
}
