//! Query string parsing into nested parameters.
//!
//! Bracketed names build structure: `ids[]=1&ids[]=2` gives a list, `f[x]=3` a map.
//! A plain name repeated in the query collects its values into a list, so no value
//! is ever dropped.
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Parses a raw, still percent-encoded query string.
pub(crate) fn parse(query: &str) -> Result<Map<String, Value>> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
        .map_err(|error| Error::invalid_argument(format!("invalid query string: {error}")))?;

    let mut params = Map::new();
    for (name, value) in pairs {
        let (base, path) = split_name(&name);
        if base.is_empty() {
            continue;
        }
        let slot = params.entry(base.to_owned()).or_insert(Value::Null);
        match path {
            Some(path) => insert_path(slot, &path, value),
            None => push_value(slot, value),
        }
    }
    Ok(params)
}

/// Splits `a[b][]` into `a` and `["b", ""]`.
///
/// A name with unbalanced brackets is used verbatim.
fn split_name(name: &str) -> (&str, Option<Vec<&str>>) {
    let Some(open) = name.find('[') else {
        return (name, None);
    };
    let (base, mut rest) = name.split_at(open);
    let mut path = Vec::new();
    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else {
            return (name, None);
        };
        path.push(&inner[..close]);
        rest = &inner[close + 1..];
    }
    if !rest.is_empty() {
        return (name, None);
    }
    (base, Some(path))
}

fn push_value(slot: &mut Value, value: String) {
    match slot {
        Value::Null => *slot = Value::String(value),
        Value::Array(items) => items.push(Value::String(value)),
        Value::String(_) => {
            let first = slot.take();
            *slot = Value::Array(vec![first, Value::String(value)]);
        }
        _ => *slot = Value::String(value),
    }
}

fn insert_path(slot: &mut Value, path: &[&str], value: String) {
    let Some((segment, rest)) = path.split_first() else {
        *slot = Value::String(value);
        return;
    };

    let child = if segment.is_empty() {
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        let Value::Array(items) = slot else {
            return;
        };
        items.push(Value::Null);
        let last = items.len() - 1;
        &mut items[last]
    } else {
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(map) = slot else {
            return;
        };
        map.entry(segment.to_string()).or_insert(Value::Null)
    };
    insert_path(child, rest, value);
}
