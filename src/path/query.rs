//! Query-string composition for GET descriptors.
//!
//! Keys come out sorted, so the same parameters always produce the same cache key.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{Map, Value};

/// Characters escaped in a URI component (everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`).
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(_) | Value::Bool(_) => Some(value.to_string()),
        // Objects (and nested arrays) travel as JSON text.
        other => Some(other.to_string()),
    }
}

/// Encodes `params` as `k=v&k2[]=a&k2[]=b` (no leading `?`). Null values are skipped.
pub fn encode_query(params: &Map<String, Value>) -> String {
    let mut pairs = Vec::new();
    let mut keys: Vec<&String> = params.keys().collect();
    keys.sort();

    for key in keys {
        let value = &params[key];
        let key = encode_component(key);
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(v) = scalar(item) {
                        pairs.push(format!("{key}[]={}", encode_component(&v)));
                    }
                }
            }
            other => {
                if let Some(v) = scalar(other) {
                    pairs.push(format!("{key}={}", encode_component(&v)));
                }
            }
        }
    }
    pairs.join("&")
}

/// The path with any query string removed.
pub fn strip_query(path: &str) -> &str {
    path.split_once('?').map(|(p, _)| p).unwrap_or(path)
}
