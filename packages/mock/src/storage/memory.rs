//! In-memory storage implementation.
//!
//! All data is held in RAM behind a [`RwLock`] and is lost when the process
//! exits. Databases and documents live in [`BTreeMap`]s, so `_all_dbs`,
//! `_all_docs` and `_find` come out in key order without sorting.
//!
//! Only the current revision of each document is kept. Deleting a document
//! leaves a tombstone so a later read reports `deleted` rather than
//! `missing`, and so revision generations keep counting if it is recreated.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use couchflow_api::{
    AllDocsQuery, AllDocsResponse, AllDocsRow, DatabaseInfo, DocumentResponse, FindRequest,
    FindResponse, RowValue,
};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::mango::{collate, Selector};
use super::{is_valid_db_name, Store, StoreError};

/// `_find` page size when the request sets no `limit`.
pub const DEFAULT_FIND_LIMIT: u64 = 25;

const NO_INDEX_WARNING: &str = "No matching index found, create an index to optimize query time.";

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Revision {
    generation: u64,
    rev: String,
    deleted: bool,
    body: Map<String, Value>,
}

impl Revision {
    fn next(previous: Option<&Revision>, deleted: bool, body: Map<String, Value>) -> Self {
        let generation = previous.map_or(0, |r| r.generation) + 1;
        Self {
            generation,
            rev: format!("{generation}-{}", Uuid::new_v4().simple()),
            deleted,
            body,
        }
    }

    /// The document as CouchDB returns it: `_id` and `_rev` first.
    fn to_doc(&self, id: &str) -> Value {
        let mut doc = Map::with_capacity(self.body.len() + 2);
        doc.insert("_id".into(), Value::from(id));
        doc.insert("_rev".into(), Value::from(self.rev.as_str()));
        doc.extend(self.body.iter().map(|(k, v)| (k.clone(), v.clone())));
        Value::Object(doc)
    }
}

#[derive(Debug, Default)]
struct Database {
    docs: BTreeMap<String, Revision>,
    update_seq: u64,
}

impl Database {
    fn live(&self) -> impl DoubleEndedIterator<Item = (&String, &Revision)> + '_ {
        self.docs.iter().filter(|(_, r)| !r.deleted)
    }

    /// Store a new revision of `id`, checking `rev` against the current one.
    fn write(
        &mut self,
        id: String,
        rev: Option<&str>,
        deleted: bool,
        body: Map<String, Value>,
    ) -> Result<DocumentResponse, StoreError> {
        let current = self.docs.get(&id);
        match (current, rev) {
            (None, Some(_)) => return Err(StoreError::Conflict),
            (Some(r), None) if !r.deleted => return Err(StoreError::Conflict),
            (Some(r), Some(given)) if r.rev != given => return Err(StoreError::Conflict),
            _ => {}
        }
        let next = Revision::next(current, deleted, body);
        let response = DocumentResponse::new(id.as_str(), next.rev.as_str());
        self.docs.insert(id, next);
        self.update_seq += 1;
        Ok(response)
    }
}

#[derive(Debug, Default)]
struct Inner {
    dbs: BTreeMap<String, Database>,
}

impl Inner {
    fn db(&self, name: &str) -> Result<&Database, StoreError> {
        self.dbs.get(name).ok_or(StoreError::NoDatabase)
    }

    fn db_mut(&mut self, name: &str) -> Result<&mut Database, StoreError> {
        self.dbs.get_mut(name).ok_or(StoreError::NoDatabase)
    }
}

// ---------------------------------------------------------------------------
// Document parsing
// ---------------------------------------------------------------------------

/// Split an incoming document into `(id, rev, deleted, body)`.
fn split_doc(doc: Value) -> Result<(String, Option<String>, bool, Map<String, Value>), StoreError> {
    let Value::Object(mut body) = doc else {
        return Err(StoreError::BadRequest(
            "Document must be a JSON object".into(),
        ));
    };

    let id = match body.remove("_id") {
        None => Uuid::new_v4().simple().to_string(),
        Some(Value::String(id)) if !id.is_empty() => id,
        Some(_) => return Err(StoreError::BadRequest("Document id must be a string".into())),
    };
    if id.starts_with('_') && !is_reserved_prefix(&id) {
        return Err(StoreError::BadRequest(
            "Only reserved document ids may start with underscore.".into(),
        ));
    }

    let rev = match body.remove("_rev") {
        None => None,
        Some(Value::String(rev)) => Some(rev),
        Some(_) => return Err(StoreError::BadRequest("Invalid rev format".into())),
    };

    let deleted = match body.remove("_deleted") {
        None => false,
        Some(Value::Bool(deleted)) => deleted,
        Some(_) => return Err(StoreError::BadRequest("_deleted must be a boolean".into())),
    };

    if let Some(special) = body.keys().find(|k| k.starts_with('_')) {
        return Err(StoreError::BadRequest(format!(
            "Bad special document member: {special}"
        )));
    }

    Ok((id, rev, deleted, body))
}

/// Design and local documents are the only ids allowed a leading underscore.
fn is_reserved_prefix(id: &str) -> bool {
    ["_design/", "_local/"]
        .iter()
        .any(|prefix| id.len() > prefix.len() && id.starts_with(prefix))
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Thread-safe, in-memory implementation of [`Store`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Store impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Store for MemoryStore {
    // --- Databases -----------------------------------------------------------

    async fn list_dbs(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.read().dbs.keys().cloned().collect())
    }

    async fn create_db(&self, name: &str) -> Result<(), StoreError> {
        if !is_valid_db_name(name) {
            return Err(StoreError::IllegalDatabaseName(name.to_string()));
        }
        let mut inner = self.write();
        if inner.dbs.contains_key(name) {
            return Err(StoreError::DatabaseExists);
        }
        inner.dbs.insert(name.to_string(), Database::default());
        Ok(())
    }

    async fn delete_db(&self, name: &str) -> Result<(), StoreError> {
        self.write()
            .dbs
            .remove(name)
            .map(|_| ())
            .ok_or(StoreError::NoDatabase)
    }

    async fn db_info(&self, name: &str) -> Result<DatabaseInfo, StoreError> {
        let inner = self.read();
        let db = inner.db(name)?;
        let live = db.live().count() as u64;
        Ok(DatabaseInfo {
            db_name: name.to_string(),
            doc_count: live,
            doc_del_count: db.docs.len() as u64 - live,
            update_seq: db.update_seq.to_string(),
        })
    }

    // --- Documents -----------------------------------------------------------

    async fn put_doc(&self, db: &str, doc: Value) -> Result<DocumentResponse, StoreError> {
        let mut inner = self.write();
        let db = inner.db_mut(db)?;
        let (id, rev, deleted, body) = split_doc(doc)?;
        db.write(id, rev.as_deref(), deleted, body)
    }

    async fn get_doc(&self, db: &str, id: &str) -> Result<Value, StoreError> {
        let inner = self.read();
        match inner.db(db)?.docs.get(id) {
            None => Err(StoreError::Missing),
            Some(r) if r.deleted => Err(StoreError::Deleted),
            Some(r) => Ok(r.to_doc(id)),
        }
    }

    async fn delete_doc(
        &self,
        db: &str,
        id: &str,
        rev: Option<&str>,
    ) -> Result<DocumentResponse, StoreError> {
        let mut inner = self.write();
        let db = inner.db_mut(db)?;
        match db.docs.get(id) {
            None => return Err(StoreError::Missing),
            Some(r) if r.deleted => return Err(StoreError::Deleted),
            Some(_) if rev.is_none() => return Err(StoreError::Conflict),
            Some(_) => {}
        }
        db.write(id.to_string(), rev, true, Map::new())
    }

    // --- Queries -------------------------------------------------------------

    async fn all_docs(
        &self,
        db: &str,
        query: &AllDocsQuery,
    ) -> Result<AllDocsResponse, StoreError> {
        let inner = self.read();
        let db = inner.db(db)?;
        let descending = query.descending.unwrap_or(false);

        let ordered: Vec<(&String, &Revision)> = if descending {
            db.live().rev().collect()
        } else {
            db.live().collect()
        };
        let total_rows = ordered.len() as u64;

        // In descending order the start key is the upper bound.
        let before_start = |id: &str| {
            query.startkey.as_ref().is_some_and(|key| {
                let o = collate(&Value::from(id), key);
                if descending { o.is_gt() } else { o.is_lt() }
            })
        };
        let past_end = |id: &str| {
            query.endkey.as_ref().is_some_and(|key| {
                let o = collate(&Value::from(id), key);
                if descending { o.is_lt() } else { o.is_gt() }
            })
        };

        let skipped = ordered.iter().take_while(|(id, _)| before_start(id)).count();
        let skip = query.skip.unwrap_or(0) as usize;
        let limit = query.limit.map_or(usize::MAX, |l| l as usize);
        let include_docs = query.include_docs.unwrap_or(false);

        let rows = ordered
            .into_iter()
            .skip(skipped)
            .take_while(|(id, _)| !past_end(id))
            .skip(skip)
            .take(limit)
            .map(|(id, r)| AllDocsRow {
                id: id.clone(),
                key: Value::from(id.as_str()),
                value: RowValue { rev: r.rev.clone() },
                doc: include_docs.then(|| r.to_doc(id)),
            })
            .collect();

        Ok(AllDocsResponse {
            total_rows,
            offset: (skipped.saturating_add(skip) as u64).min(total_rows),
            rows,
        })
    }

    async fn find(&self, db: &str, request: &FindRequest) -> Result<FindResponse, StoreError> {
        let selector = Selector::parse(&request.selector).map_err(StoreError::BadRequest)?;
        let inner = self.read();
        let db = inner.db(db)?;

        let skip = request.skip.unwrap_or(0) as usize;
        let limit = request.limit.unwrap_or(DEFAULT_FIND_LIMIT) as usize;
        let docs = db
            .live()
            .map(|(id, r)| r.to_doc(id))
            .filter(|doc| selector.matches(doc))
            .skip(skip)
            .take(limit)
            .collect();

        Ok(FindResponse {
            docs,
            bookmark: None,
            warning: Some(NO_INDEX_WARNING.to_string()),
        })
    }
}
