//! Database lifecycle adapters: create and delete.

use async_trait::async_trait;
use couchflow_api::OkResponse;
use serde::Deserialize;

use crate::connection::{ClientError, Connection};
use crate::error::ValidationError;
use crate::lenient;
use crate::message::Message;
use crate::node::Operation;
use crate::registry::NodeKind;
use crate::resolve::resolve;
use crate::status::Status;

use super::to_json;

/// Database name: node `dbname`, then `msg.dbname`, then a string `msg.payload`.
fn db_name(config: Option<&str>, msg: &Message) -> Result<String, ValidationError> {
    resolve(config.map(str::to_string), msg.text("dbname"))
        .or_else(|| msg.text("payload"))
        .ok_or(ValidationError::MissingDatabaseName)
}

fn write_result(msg: &mut Message, db: String, response: &OkResponse) {
    msg.set("result", to_json(response));
    msg.set("dbname", db);
}

// ---------------------------------------------------------------------------
// CreateDb
// ---------------------------------------------------------------------------

/// `couchdb-create-db`: create a database.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDb {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub server: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub dbname: Option<String>,
}

#[async_trait]
impl Operation for CreateDb {
    type Request = String;
    type Response = OkResponse;

    fn kind(&self) -> NodeKind {
        NodeKind::CreateDb
    }

    fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    fn prepare(&self, msg: &Message) -> Result<String, ValidationError> {
        db_name(self.dbname.as_deref(), msg)
    }

    fn busy(&self, _db: &String) -> Status {
        Status::busy("creating...")
    }

    async fn call(&self, conn: &Connection, db: &String) -> Result<OkResponse, ClientError> {
        conn.create_db(db).await
    }

    fn complete(&self, msg: &mut Message, db: String, response: OkResponse) -> Status {
        write_result(msg, db, &response);
        Status::success("created")
    }

    fn failure_label(&self) -> &'static str {
        "Create database failed"
    }
}

// ---------------------------------------------------------------------------
// DeleteDb
// ---------------------------------------------------------------------------

/// `couchdb-delete-db`: delete a database.
///
/// Destructive, so it is opt-in: the node's `confirmDelete` box or a truthy
/// `msg.confirmDelete` must be set, otherwise the input is refused.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteDb {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub server: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub dbname: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub confirm_delete: bool,
}

#[async_trait]
impl Operation for DeleteDb {
    type Request = String;
    type Response = OkResponse;

    fn kind(&self) -> NodeKind {
        NodeKind::DeleteDb
    }

    fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    fn prepare(&self, msg: &Message) -> Result<String, ValidationError> {
        let db = db_name(self.dbname.as_deref(), msg)?;
        if !self.confirm_delete && !msg.truthy("confirmDelete") {
            return Err(ValidationError::NotConfirmed);
        }
        Ok(db)
    }

    fn busy(&self, _db: &String) -> Status {
        Status::busy("deleting...")
    }

    async fn call(&self, conn: &Connection, db: &String) -> Result<OkResponse, ClientError> {
        conn.destroy_db(db).await
    }

    fn complete(&self, msg: &mut Message, db: String, response: OkResponse) -> Status {
        write_result(msg, db, &response);
        Status::success("deleted")
    }

    fn failure_label(&self) -> &'static str {
        "Delete database failed"
    }
}
