//! Option-bag parsing.
//!
//! Options arrive as composed JSON maps from schema nodes and option bags. `Scope`
//! accumulates them in stack order; keys it does not know are ignored so callers can
//! keep adapter-specific options in the same bag.

use crate::error::{CacheError, Result};
use crate::model::Strategy;
use crate::resolve::stack::StoreRef;
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub(crate) struct Scope {
    pub store: Option<StoreRef>,
    pub partial: Option<String>,
    /// Fallback projections in the order they were applied.
    pub fragments: Vec<String>,
    pub cache_strategy: Option<Strategy>,
    pub collection_strategy: Option<Strategy>,
    pub param_map: HashMap<String, String>,
    pub error_on_invalid: Option<bool>,
    pub id_attribute: Option<String>,
}

impl Scope {
    /// Drops what a new non-item node re-declares.
    pub fn reset(&mut self) {
        self.store = None;
        self.partial = None;
        self.fragments.clear();
    }

    pub fn apply(&mut self, options: &Map<String, Value>) -> Result<()> {
        for (key, value) in options {
            match key.as_str() {
                "store" => {
                    self.store = match value {
                        Value::Null => None,
                        Value::String(name) => Some(StoreRef::Name(name.clone())),
                        _ => return Err(invalid(key, "a store type name")),
                    }
                }
                "partial" => self.partial = Some(string(key, value)?),
                "fragments" => match value {
                    Value::String(s) => self.fragments.push(s.clone()),
                    Value::Array(items) => {
                        for item in items {
                            self.fragments.push(string(key, item)?);
                        }
                    }
                    _ => return Err(invalid(key, "a string or an array of strings")),
                },
                "cacheStrategy" => self.cache_strategy = Some(strategy(key, value)?),
                "collectionStrategy" => self.collection_strategy = Some(strategy(key, value)?),
                "paramMap" => {
                    let Value::Object(map) = value else {
                        return Err(invalid(key, "an object of parameter names"));
                    };
                    for (from, to) in map {
                        self.param_map.insert(from.clone(), string(key, to)?);
                    }
                }
                "errorOnInvalid" => match value {
                    Value::Bool(flag) => self.error_on_invalid = Some(*flag),
                    _ => return Err(invalid(key, "a boolean")),
                },
                "idAttribute" => self.id_attribute = Some(string(key, value)?),
                _ => {}
            }
        }
        Ok(())
    }
}

fn invalid(key: &str, expected: &'static str) -> CacheError {
    CacheError::InvalidOption {
        key: key.to_string(),
        expected,
    }
}

fn string(key: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(key, "a string"))
}

fn strategy(key: &str, value: &Value) -> Result<Strategy> {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| invalid(key, "`merge` or `replace`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn apply(scope: &mut Scope, options: Value) -> Result<()> {
        scope.apply(options.as_object().unwrap())
    }

    #[test]
    fn test_fragments_accumulate_until_reset() {
        let mut scope = Scope::default();
        apply(&mut scope, json!({"fragments": "summary", "partial": "card"})).unwrap();
        apply(&mut scope, json!({"fragments": ["detail", "full"]})).unwrap();
        assert_eq!(scope.fragments, vec!["summary", "detail", "full"]);

        scope.reset();
        assert!(scope.fragments.is_empty());
        assert!(scope.partial.is_none());
    }

    #[test]
    fn test_wrong_types_are_rejected() {
        let mut scope = Scope::default();
        let err = apply(&mut scope, json!({"cacheStrategy": "upsert"})).unwrap_err();
        assert!(matches!(err, CacheError::InvalidOption { key, .. } if key == "cacheStrategy"));
        assert!(apply(&mut scope, json!({"errorOnInvalid": "yes"})).is_err());
        assert!(apply(&mut scope, json!({"paramMap": ["id"]})).is_err());
        assert!(apply(&mut scope, json!({"store": 3})).is_err());
    }

    #[test]
    fn test_reset_keeps_strategies_and_aliases() {
        let mut scope = Scope::default();
        apply(
            &mut scope,
            json!({"cacheStrategy": "merge", "paramMap": {"id": "userId"}, "store": "user", "custom": 1}),
        )
        .unwrap();
        scope.reset();
        assert_eq!(scope.cache_strategy, Some(Strategy::Merge));
        assert_eq!(scope.param_map.get("id").map(String::as_str), Some("userId"));
        assert!(scope.store.is_none());
    }
}
