//! Document listing via `GET /{db}/_all_docs`.
//!
//! CouchDB takes the listing options as query-string parameters, with the
//! key bounds (`startkey`, `endkey`) JSON-encoded. [`AllDocsQuery`] is the
//! typed form; [`AllDocsQuery::to_query_pairs`] produces the wire form and
//! [`AllDocsQuery::from_query_pairs`] parses it back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Options for `GET /{db}/_all_docs`. Every field is optional; an unset field
/// is not sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllDocsQuery {
    pub limit: Option<u64>,
    pub skip: Option<u64>,
    /// Lowest key to return (inclusive).
    pub startkey: Option<Value>,
    /// Highest key to return (inclusive).
    pub endkey: Option<Value>,
    /// Embed each document body in its row as `doc`.
    pub include_docs: Option<bool>,
    pub descending: Option<bool>,
}

impl AllDocsQuery {
    /// Encode into query-string pairs in a stable order.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(skip) = self.skip {
            pairs.push(("skip", skip.to_string()));
        }
        if let Some(ref key) = self.startkey {
            pairs.push(("startkey", key.to_string()));
        }
        if let Some(ref key) = self.endkey {
            pairs.push(("endkey", key.to_string()));
        }
        if let Some(include) = self.include_docs {
            pairs.push(("include_docs", include.to_string()));
        }
        if let Some(descending) = self.descending {
            pairs.push(("descending", descending.to_string()));
        }
        pairs
    }

    /// Parse query-string pairs. Unknown keys are ignored; a malformed value
    /// is reported as `Err(param_name)`.
    pub fn from_query_pairs<'a, I>(pairs: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            match key {
                "limit" => query.limit = Some(value.parse().map_err(|_| key.to_string())?),
                "skip" => query.skip = Some(value.parse().map_err(|_| key.to_string())?),
                "startkey" | "start_key" => {
                    query.startkey =
                        Some(serde_json::from_str(value).map_err(|_| key.to_string())?)
                }
                "endkey" | "end_key" => {
                    query.endkey = Some(serde_json::from_str(value).map_err(|_| key.to_string())?)
                }
                "include_docs" => {
                    query.include_docs = Some(value.parse().map_err(|_| key.to_string())?)
                }
                "descending" => {
                    query.descending = Some(value.parse().map_err(|_| key.to_string())?)
                }
                _ => {}
            }
        }
        Ok(query)
    }
}

/// Response body for `GET /{db}/_all_docs`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllDocsResponse {
    /// Number of live documents in the database, ignoring paging.
    pub total_rows: u64,
    /// Index of the first returned row.
    #[serde(default)]
    pub offset: u64,
    pub rows: Vec<AllDocsRow>,
}

/// One row of an [`AllDocsResponse`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllDocsRow {
    pub id: String,
    pub key: Value,
    pub value: RowValue,
    /// Present only when the listing was requested with `include_docs=true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowValue {
    pub rev: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_bounds_are_json_encoded() {
        let query = AllDocsQuery {
            startkey: Some(json!("a")),
            endkey: Some(json!("b\u{fff0}")),
            include_docs: Some(true),
            ..Default::default()
        };
        let pairs = query.to_query_pairs();
        assert_eq!(pairs[0], ("startkey", "\"a\"".to_string()));
        assert_eq!(pairs[2], ("include_docs", "true".to_string()));

        let parsed =
            AllDocsQuery::from_query_pairs(pairs.iter().map(|(k, v)| (*k, v.as_str()))).unwrap();
        assert_eq!(parsed, query);
    }

    #[test]
    fn malformed_limit_names_the_parameter() {
        let err = AllDocsQuery::from_query_pairs([("limit", "ten")]).unwrap_err();
        assert_eq!(err, "limit");
    }

    #[test]
    fn bare_string_key_is_rejected() {
        assert!(AllDocsQuery::from_query_pairs([("startkey", "abc")]).is_err());
    }
}
