//! Forgiving deserialisers for host-supplied node configuration.
//!
//! Flow editors store most form fields as text, so a port may arrive as
//! `5984` or `"5984"` and an unset field as `""`. These helpers normalise
//! such values for use with `#[serde(deserialize_with = ...)]`.

use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

use crate::message::{as_text, is_truthy};

/// Optional text: empty strings and `null` become `None`; numbers are
/// rendered in decimal.
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(as_text))
}

/// Optional count given as a number or numeric string. Empty means unset.
pub fn opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expected a non-negative integer, got {n}"))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("expected a non-negative integer, got {s:?}"))),
        Some(other) => Err(de::Error::custom(format!(
            "expected a non-negative integer, got {other}"
        ))),
    }
}

/// A checkbox value: JSON booleans, `"true"`/`"false"`, or any other value
/// by host truthiness.
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None => false,
        Some(Value::String(s)) => s.trim() == "true",
        Some(v) => is_truthy(&v),
    })
}
