//! A subset of CouchDB's Mango selector language, evaluated in memory.
//!
//! Supported:
//!
//! | Kind | Operators |
//! |------|-----------|
//! | Combination | `$and`, `$or`, `$nor`, `$not` |
//! | Condition | `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`, `$nin`, `$exists`, `$size`, `$not` |
//!
//! Field names may be dotted (`"address.city"`) or nested
//! (`{"address": {"city": "Oslo"}}`). A bare value means `$eq`. Values
//! compare using CouchDB's collation order: `null < false < true < numbers <
//! strings < arrays < objects`.

use std::cmp::Ordering;

use serde_json::{Map, Value};

/// A parsed selector.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    And(Vec<Selector>),
    Or(Vec<Selector>),
    Nor(Vec<Selector>),
    Not(Box<Selector>),
    Field {
        path: Vec<String>,
        conditions: Vec<Condition>,
    },
}

/// One operator applied to a field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
    Size(u64),
    Not(Vec<Condition>),
}

impl Selector {
    /// Parse a selector object. The error is CouchDB's `reason` text.
    pub fn parse(selector: &Value) -> Result<Self, String> {
        let object = selector
            .as_object()
            .ok_or_else(|| "Selector must be a JSON object".to_string())?;
        parse_object(object, &[])
    }

    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Selector::And(all) => all.iter().all(|s| s.matches(doc)),
            Selector::Or(any) => any.iter().any(|s| s.matches(doc)),
            Selector::Nor(none) => !none.iter().any(|s| s.matches(doc)),
            Selector::Not(inner) => !inner.matches(doc),
            Selector::Field { path, conditions } => {
                let field = lookup(doc, path);
                conditions.iter().all(|c| c.holds(field))
            }
        }
    }
}

impl Condition {
    fn holds(&self, field: Option<&Value>) -> bool {
        let compare = |expected: &Value, ok: fn(Ordering) -> bool| {
            field.is_some_and(|v| ok(collate(v, expected)))
        };
        match self {
            Condition::Eq(v) => compare(v, Ordering::is_eq),
            Condition::Ne(v) => compare(v, Ordering::is_ne),
            Condition::Gt(v) => compare(v, Ordering::is_gt),
            Condition::Gte(v) => compare(v, Ordering::is_ge),
            Condition::Lt(v) => compare(v, Ordering::is_lt),
            Condition::Lte(v) => compare(v, Ordering::is_le),
            Condition::In(list) => {
                field.is_some_and(|v| list.iter().any(|x| collate(v, x).is_eq()))
            }
            Condition::Nin(list) => {
                field.is_some_and(|v| !list.iter().any(|x| collate(v, x).is_eq()))
            }
            Condition::Exists(wanted) => field.is_some() == *wanted,
            Condition::Size(n) => field
                .and_then(Value::as_array)
                .is_some_and(|a| a.len() as u64 == *n),
            Condition::Not(inner) => !inner.iter().all(|c| c.holds(field)),
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn parse_object(object: &Map<String, Value>, prefix: &[String]) -> Result<Selector, String> {
    let mut parts = Vec::with_capacity(object.len());
    for (key, value) in object {
        if key.starts_with('$') {
            parts.push(parse_combination(key, value)?);
        } else {
            let mut path = prefix.to_vec();
            path.extend(key.split('.').map(str::to_string));
            parts.push(parse_field(path, value)?);
        }
    }
    Ok(match parts.len() {
        1 => parts.remove(0),
        _ => Selector::And(parts),
    })
}

fn parse_combination(op: &str, value: &Value) -> Result<Selector, String> {
    let list = |value: &Value| -> Result<Vec<Selector>, String> {
        value
            .as_array()
            .ok_or_else(|| format!("Bad argument for operator {op}: expected an array"))?
            .iter()
            .map(Selector::parse)
            .collect()
    };
    match op {
        "$and" => Ok(Selector::And(list(value)?)),
        "$or" => Ok(Selector::Or(list(value)?)),
        "$nor" => Ok(Selector::Nor(list(value)?)),
        "$not" => Ok(Selector::Not(Box::new(Selector::parse(value)?))),
        _ => Err(format!("Invalid operator: {op}")),
    }
}

fn parse_field(path: Vec<String>, value: &Value) -> Result<Selector, String> {
    let Some(object) = value.as_object().filter(|o| !o.is_empty()) else {
        return Ok(Selector::Field {
            path,
            conditions: vec![Condition::Eq(value.clone())],
        });
    };

    let operators = object.keys().filter(|k| k.starts_with('$')).count();
    if operators == 0 {
        return parse_object(object, &path);
    }
    if operators != object.len() {
        return Err(format!(
            "Cannot mix operators and field names under {}",
            path.join(".")
        ));
    }
    Ok(Selector::Field {
        path,
        conditions: parse_conditions(object)?,
    })
}

fn parse_conditions(object: &Map<String, Value>) -> Result<Vec<Condition>, String> {
    object
        .iter()
        .map(|(op, arg)| parse_condition(op, arg))
        .collect()
}

fn parse_condition(op: &str, arg: &Value) -> Result<Condition, String> {
    let bad = |expected: &str| format!("Bad argument for operator {op}: expected {expected}");
    Ok(match op {
        "$eq" => Condition::Eq(arg.clone()),
        "$ne" => Condition::Ne(arg.clone()),
        "$gt" => Condition::Gt(arg.clone()),
        "$gte" => Condition::Gte(arg.clone()),
        "$lt" => Condition::Lt(arg.clone()),
        "$lte" => Condition::Lte(arg.clone()),
        "$in" => Condition::In(arg.as_array().ok_or_else(|| bad("an array"))?.clone()),
        "$nin" => Condition::Nin(arg.as_array().ok_or_else(|| bad("an array"))?.clone()),
        "$exists" => Condition::Exists(arg.as_bool().ok_or_else(|| bad("a boolean"))?),
        "$size" => Condition::Size(arg.as_u64().ok_or_else(|| bad("a non-negative integer"))?),
        "$not" => Condition::Not(parse_conditions(
            arg.as_object().ok_or_else(|| bad("an object"))?,
        )?),
        _ => return Err(format!("Invalid operator: {op}")),
    })
}

// ---------------------------------------------------------------------------
// Evaluation helpers
// ---------------------------------------------------------------------------

fn lookup<'a>(doc: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(doc, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

/// CouchDB view collation, with plain code-point order for strings.
pub fn collate(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y)
            .map(|(x, y)| collate(x, y))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(x), Value::Object(y)) => x
            .iter()
            .zip(y)
            .map(|((kx, vx), (ky, vy))| kx.cmp(ky).then_with(|| collate(vx, vy)))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
