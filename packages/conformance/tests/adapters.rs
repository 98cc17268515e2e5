//! End-to-end tests for the couchflow adapters.
//!
//! Each test spawns an ephemeral in-process mock CouchDB (real TCP, real
//! HTTP) via [`couchflow_conformance::spawn_mock`], deploys adapter nodes
//! against it, and drives them with messages the way a flow host would.
//!
//! # Coverage
//!
//! | Test | Property |
//! |------|----------|
//! | `insert_then_get_round_trips` | get returns the inserted doc and rev |
//! | `update_then_delete_doc` | revision chain through update and delete |
//! | `stale_revision_reports_conflict` | remote error normalisation |
//! | `get_missing_document_fails` | 404 normalisation |
//! | `query_with_one_match` | `payload.len() == count == 1` |
//! | `query_limit_and_skip` | paging forwarded to `_find` |
//! | `list_dbs_reports_names_and_count` | `databases == ["a", "b"]` |
//! | `list_docs_include_docs_mirrors_rows` | `docs == rows[*].doc` |
//! | `create_and_delete_database` | database lifecycle |
//! | `delete_db_requires_confirmation` | refusal, no remote call |
//! | `validation_failures_make_no_call` | missing inputs, no remote call |
//! | `document_nodes_without_database_make_no_call` | get, update, delete-doc need a database |
//! | `node_without_server_refuses_input` | configuration failure |
//! | `unreachable_server_is_a_connection_failure` | transport normalisation |
//! | `credentials_are_sent_as_basic_auth` | basic auth against an admin mock |
//! | `flow_routes_messages_by_node_id` | flow deployment from host JSON |

use couchflow::ops::{
    CreateDb, DeleteDb, DeleteDoc, Get, Insert, ListDbs, ListDocs, Query, Update,
};
use couchflow::{Flow, Message, Node, Outcome, ServerConfig, ServerRegistry};
use couchflow_conformance::{spawn_mock, spawn_mock_with, MockServer, SERVER_ID};
use couchflow_mock::{Credentials, MockConfig, Store};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const DB: &str = "orders";

fn server() -> Option<String> {
    Some(SERVER_ID.to_string())
}

fn db() -> Option<String> {
    Some(DB.to_string())
}

async fn mock_with_db() -> MockServer {
    let mock = spawn_mock().await;
    mock.store.create_db(DB).await.unwrap();
    mock
}

/// Unwrap a success outcome, failing the test with the error otherwise.
fn success(outcome: Outcome) -> Message {
    match outcome {
        Outcome::Success(msg) => msg,
        Outcome::Failure(msg) => panic!("expected success, got {:?}", msg.get("error")),
    }
}

/// Unwrap a failure outcome and return its normalized error.
fn failure(outcome: Outcome) -> Value {
    match outcome {
        Outcome::Failure(msg) => msg.get("error").cloned().expect("failure carries error"),
        Outcome::Success(msg) => panic!("expected failure, got {msg:?}"),
    }
}

fn insert_node(mock: &MockServer) -> Node<Insert> {
    mock.deploy(
        "insert",
        Insert {
            server: server(),
            database: db(),
        },
    )
}

fn get_node(mock: &MockServer) -> Node<Get> {
    mock.deploy(
        "get",
        Get {
            server: server(),
            database: db(),
            ..Default::default()
        },
    )
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[tokio::test]
async fn insert_then_get_round_trips() {
    let mock = mock_with_db().await;
    let mut insert = insert_node(&mock);
    let mut get = get_node(&mock);

    let inserted = success(
        insert
            .receive(Message::with_payload(json!({ "item": "widget", "qty": 3 })))
            .await,
    );
    let id = inserted.text("docId").unwrap();
    let rev = inserted.text("docRev").unwrap();
    assert_eq!(inserted.get("result").unwrap()["ok"], json!(true));
    assert_eq!(insert.status().unwrap().text, format!("Inserted: {id}"));

    let fetched = success(get.receive(Message::new().with("docId", id.as_str())).await);
    let doc = fetched.payload().unwrap();
    assert_eq!(doc["_rev"], json!(rev));
    assert_eq!(doc["item"], json!("widget"));
    assert_eq!(fetched.text("docRev").as_deref(), Some(rev.as_str()));
}

#[tokio::test]
async fn update_then_delete_doc() {
    let mock = mock_with_db().await;
    let mut insert = insert_node(&mock);
    let mut update = mock.deploy(
        "update",
        Update {
            server: server(),
            database: db(),
        },
    );
    let mut delete = mock.deploy(
        "delete",
        DeleteDoc {
            server: server(),
            database: db(),
            ..Default::default()
        },
    );

    let inserted = success(
        insert
            .receive(Message::with_payload(json!({ "_id": "o-1", "qty": 1 })))
            .await,
    );
    let rev1 = inserted.text("docRev").unwrap();

    let updated = success(
        update
            .receive(Message::with_payload(
                json!({ "_id": "o-1", "_rev": rev1, "qty": 2 }),
            ))
            .await,
    );
    let rev2 = updated.text("docRev").unwrap();
    assert!(rev2.starts_with("2-"));
    assert_eq!(mock.store.get_doc(DB, "o-1").await.unwrap()["qty"], json!(2));

    let deleted = success(
        delete
            .receive(
                Message::new()
                    .with("docId", "o-1")
                    .with("docRev", rev2.as_str()),
            )
            .await,
    );
    assert!(deleted.text("docRev").unwrap().starts_with("3-"));
    assert_eq!(delete.status().unwrap().text, "Deleted: o-1");
    assert!(mock.store.get_doc(DB, "o-1").await.is_err());
}

#[tokio::test]
async fn stale_revision_reports_conflict() {
    let mock = mock_with_db().await;
    let written = mock
        .store
        .put_doc(DB, json!({ "_id": "o-1" }))
        .await
        .unwrap();
    mock.store
        .put_doc(DB, json!({ "_id": "o-1", "_rev": &written.rev, "v": 2 }))
        .await
        .unwrap();

    let mut update = mock.deploy(
        "update",
        Update {
            server: server(),
            database: db(),
        },
    );
    let msg = Message::with_payload(json!({ "_id": "o-1", "_rev": &written.rev }));
    let error = failure(update.receive(msg).await);

    assert_eq!(
        error,
        json!({
            "message": "Document update conflict.",
            "statusCode": 409,
            "reason": "Document update conflict.",
            "code": "conflict",
        })
    );
    assert_eq!(update.status().unwrap().text, "failed");
}

#[tokio::test]
async fn get_missing_document_fails() {
    let mock = mock_with_db().await;
    let mut get = get_node(&mock);

    let error = failure(get.receive(Message::new().with("docId", "nope")).await);
    assert_eq!(error["statusCode"], json!(404));
    assert_eq!(error["code"], json!("not_found"));
    assert_eq!(error["reason"], json!("missing"));
}

// ---------------------------------------------------------------------------
// Queries and listings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn query_with_one_match() {
    let mock = mock_with_db().await;
    mock.store.put_doc(DB, json!({ "name": "x" })).await.unwrap();
    mock.store.put_doc(DB, json!({ "name": "y" })).await.unwrap();

    let mut query = mock.deploy(
        "query",
        Query {
            server: server(),
            database: db(),
            ..Default::default()
        },
    );
    let msg = Message::new().with("selector", json!({ "name": "x" }));
    let found = success(query.receive(msg).await);

    assert_eq!(found.payload().unwrap().as_array().unwrap().len(), 1);
    assert_eq!(found.get("count"), Some(&json!(1)));
    assert_eq!(found.payload().unwrap()[0]["name"], json!("x"));
    assert_eq!(query.status().unwrap().text, "Found: 1 docs");
}

#[tokio::test]
async fn query_limit_and_skip() {
    let mock = mock_with_db().await;
    for n in 0..5 {
        mock.store
            .put_doc(DB, json!({ "_id": format!("d{n}"), "n": n }))
            .await
            .unwrap();
    }

    let mut query = mock.deploy(
        "query",
        Query {
            server: server(),
            database: db(),
            selector: Some(r#"{"n": {"$gte": 1}}"#.into()),
            limit: Some(2),
        },
    );
    let found = success(query.receive(Message::new().with("skip", 1)).await);
    let ids: Vec<_> = found
        .payload()
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["_id"].clone())
        .collect();
    assert_eq!(ids, [json!("d2"), json!("d3")]);
}

#[tokio::test]
async fn list_dbs_reports_names_and_count() {
    let mock = spawn_mock().await;
    mock.store.create_db("b").await.unwrap();
    mock.store.create_db("a").await.unwrap();

    let mut list = mock.deploy("list", ListDbs { server: server() });
    let listed = success(list.receive(Message::new()).await);

    assert_eq!(listed.get("databases"), Some(&json!(["a", "b"])));
    assert_eq!(listed.payload(), Some(&json!(["a", "b"])));
    assert_eq!(listed.get("count"), Some(&json!(2)));
}

#[tokio::test]
async fn list_docs_include_docs_mirrors_rows() {
    let mock = mock_with_db().await;
    for id in ["c", "a", "b"] {
        mock.store
            .put_doc(DB, json!({ "_id": id, "v": id }))
            .await
            .unwrap();
    }

    let mut list = mock.deploy(
        "list",
        ListDocs {
            server: server(),
            database: db(),
            ..Default::default()
        },
    );
    let msg = Message::new()
        .with("include_docs", true)
        .with("startkey", "b");
    let listed = success(list.receive(msg).await);

    let rows = listed.get("rows").unwrap().as_array().unwrap();
    let row_docs: Vec<Value> = rows.iter().map(|r| r["doc"].clone()).collect();
    assert_eq!(listed.get("docs"), Some(&Value::from(row_docs)));
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["id"], json!("b"));
    assert_eq!(listed.get("totalRows"), Some(&json!(3)));
    assert_eq!(listed.get("offset"), Some(&json!(1)));

    // Without include_docs there is no `docs` field.
    let plain = success(list.receive(Message::new().with("descending", true)).await);
    assert!(plain.get("docs").is_none());
    assert_eq!(plain.get("rows").unwrap()[0]["id"], json!("c"));
}

// ---------------------------------------------------------------------------
// Databases
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_and_delete_database() {
    let mock = spawn_mock().await;
    let mut create = mock.deploy(
        "create",
        CreateDb {
            server: server(),
            dbname: None,
        },
    );
    let mut delete = mock.deploy(
        "drop",
        DeleteDb {
            server: server(),
            dbname: None,
            confirm_delete: false,
        },
    );

    let created = success(create.receive(Message::with_payload("invoices")).await);
    assert_eq!(created.get("dbname"), Some(&json!("invoices")));
    assert_eq!(created.get("result"), Some(&json!({ "ok": true })));
    assert_eq!(mock.store.list_dbs().await.unwrap(), vec!["invoices"]);

    let error = failure(create.receive(Message::with_payload("invoices")).await);
    assert_eq!(error["statusCode"], json!(412));
    assert_eq!(error["code"], json!("file_exists"));

    let msg = Message::new()
        .with("dbname", "invoices")
        .with("confirmDelete", true);
    success(delete.receive(msg).await);
    assert!(mock.store.list_dbs().await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_db_requires_confirmation() {
    let mock = mock_with_db().await;
    let mut delete = mock.deploy(
        "drop",
        DeleteDb {
            server: server(),
            dbname: db(),
            confirm_delete: false,
        },
    );

    let error = failure(delete.receive(Message::new()).await);
    assert_eq!(error["code"], json!("validation"));
    assert_eq!(error["message"], json!("Delete operation requires confirmation"));
    assert_eq!(delete.status().unwrap().text, "not confirmed");
    assert_eq!(mock.requests(), 0);
    assert_eq!(mock.store.list_dbs().await.unwrap(), vec![DB]);
}

// ---------------------------------------------------------------------------
// Validation and configuration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn validation_failures_make_no_call() {
    let mock = spawn_mock().await;

    let mut insert = mock.deploy(
        "insert",
        Insert {
            server: server(),
            database: None,
        },
    );
    let error = failure(insert.receive(Message::with_payload(json!({ "a": 1 }))).await);
    assert_eq!(error["message"], json!("Database not specified"));

    let mut update = mock.deploy(
        "update",
        Update {
            server: server(),
            database: db(),
        },
    );
    let error = failure(update.receive(Message::with_payload(json!({ "_rev": "1-a" }))).await);
    assert_eq!(error["message"], json!("Document must have _id field"));
    let error = failure(update.receive(Message::with_payload(json!({ "_id": "x" }))).await);
    assert_eq!(
        error["message"],
        json!("Document must have _rev field (use Get node first)")
    );

    let mut delete = mock.deploy(
        "delete",
        DeleteDoc {
            server: server(),
            database: db(),
            ..Default::default()
        },
    );
    let error = failure(delete.receive(Message::new().with("docId", "x")).await);
    assert_eq!(error["code"], json!("validation"));
    assert!(error["message"]
        .as_str()
        .unwrap()
        .starts_with("Document revision (_rev) not specified"));

    let mut query = mock.deploy(
        "query",
        Query {
            server: server(),
            database: db(),
            ..Default::default()
        },
    );
    let error = failure(query.receive(Message::new().with("selector", "x")).await);
    assert_eq!(error["message"], json!("Selector must be a valid object"));

    assert_eq!(mock.requests(), 0);
}

#[tokio::test]
async fn document_nodes_without_database_make_no_call() {
    let mock = spawn_mock().await;

    let mut get = mock.deploy(
        "get",
        Get {
            server: server(),
            ..Default::default()
        },
    );
    let error = failure(get.receive(Message::new().with("docId", "x")).await);
    assert_eq!(error["message"], json!("Database not specified"));
    assert_eq!(error["code"], json!("validation"));

    let mut update = mock.deploy(
        "update",
        Update {
            server: server(),
            database: None,
        },
    );
    let doc = json!({ "_id": "x", "_rev": "1-a", "n": 1 });
    let error = failure(update.receive(Message::with_payload(doc)).await);
    assert_eq!(error["message"], json!("Database not specified"));

    let mut delete = mock.deploy(
        "delete",
        DeleteDoc {
            server: server(),
            ..Default::default()
        },
    );
    let msg = Message::new().with("docId", "x").with("docRev", "1-a");
    let error = failure(delete.receive(msg).await);
    assert_eq!(error["message"], json!("Database not specified"));

    assert_eq!(mock.requests(), 0);
}

#[tokio::test]
async fn node_without_server_refuses_input() {
    let mut get = Node::deploy(
        "get",
        Get {
            server: Some("absent".into()),
            database: db(),
            ..Default::default()
        },
        &ServerRegistry::new(),
    );
    assert!(!get.is_ready());

    let error = failure(get.receive(Message::new().with("docId", "x")).await);
    assert_eq!(error["code"], json!("configuration"));
    assert_eq!(get.status().unwrap().text, "not configured");
}

#[tokio::test]
async fn unreachable_server_is_a_connection_failure() {
    // Bind and immediately drop a listener to find a closed port.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let mut servers = ServerRegistry::new();
    servers.insert(SERVER_ID, ServerConfig::new("127.0.0.1").with_port(port));
    let mut list = Node::deploy("list", ListDbs { server: server() }, &servers);

    let error = failure(list.receive(Message::new()).await);
    assert_eq!(error["code"], json!("connection"));
    assert!(error.get("statusCode").is_none());
}

#[tokio::test]
async fn credentials_are_sent_as_basic_auth() {
    let mock = spawn_mock_with(MockConfig {
        admin: Some(Credentials::new("admin", "password")),
        ..MockConfig::default()
    })
    .await;
    mock.store.create_db("a").await.unwrap();

    let mut list = mock.deploy("list", ListDbs { server: server() });
    let listed = success(list.receive(Message::new()).await);
    assert_eq!(listed.get("count"), Some(&json!(1)));

    let mut servers = ServerRegistry::new();
    servers.insert(SERVER_ID, mock.config().with_credentials("admin", "wrong"));
    let mut denied = Node::deploy("denied", ListDbs { server: server() }, &servers);
    let error = failure(denied.receive(Message::new()).await);
    assert_eq!(error["statusCode"], json!(401));
    assert_eq!(error["code"], json!("unauthorized"));
}

// ---------------------------------------------------------------------------
// Flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn flow_routes_messages_by_node_id() {
    let mock = mock_with_db().await;
    let flow_json = json!([
        { "id": "ins", "type": "couchdb-insert", "server": SERVER_ID, "database": DB },
        mock.server_node(),
        { "id": "cnt", "type": "couchdb-query", "server": SERVER_ID, "database": DB,
          "selector": "{\"kind\": \"note\"}", "limit": "" },
        { "id": "dbg", "type": "debug" },
    ]);
    let mut flow = Flow::from_json(&flow_json.to_string()).unwrap();
    assert_eq!(flow.len(), 2);

    for _ in 0..3 {
        let outcome = flow
            .receive("ins", Message::with_payload(json!({ "kind": "note" })))
            .await
            .unwrap();
        assert_eq!(outcome.output(), 0);
    }
    let found = success(flow.receive("cnt", Message::new()).await.unwrap());
    assert_eq!(found.get("count"), Some(&json!(3)));

    assert!(flow.receive("dbg", Message::new()).await.is_err());

    flow.close();
    assert!(flow.node("ins").unwrap().status().is_none());
}
