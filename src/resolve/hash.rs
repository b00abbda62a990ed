//! # Composable Hash
//!
//! A bag of plain key/value pairs plus zero or more hooks. Composing the bag against
//! an *invoker* (typically the caller's props as JSON) copies the values and runs the
//! hooks in registration order, each hook seeing the accumulated result and the
//! invoker. This lets option, parameter and query bags derive values from caller
//! state at resolution time instead of at construction time.
//!
//! ## Weak bags
//!
//! A bag marked [`weak`](ComposableHash::weak) yields to its target when extended into
//! it: its values only fill keys the target lacks, and its hooks run after the
//! target's own hooks, again only filling absent keys. Schema-level defaults use this
//! so they never clobber more specific configuration.

use crate::error::{CacheError, Result};
use serde_json::{Map, Value};
use std::fmt::Debug;
use std::sync::Arc;

/// A hook receives the accumulated result and the invoker.
pub type Hook = Arc<dyn Fn(&mut Map<String, Value>, &mut Value) + Send + Sync>;

#[derive(Clone, Default)]
pub struct ComposableHash {
    values: Map<String, Value>,
    hooks: Vec<Hook>,
    deferred: Vec<Hook>,
    weak: bool,
    malformed: Option<String>,
}

impl Debug for ComposableHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposableHash")
            .field("values", &self.values)
            .field("hooks", &self.hooks.len())
            .field("deferred", &self.deferred.len())
            .field("weak", &self.weak)
            .finish()
    }
}

impl From<Map<String, Value>> for ComposableHash {
    fn from(values: Map<String, Value>) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }
}

/// Objects become the bag's values and `null` an empty bag. Any other value is
/// kept as a malformed marker and rejected when the bag is composed.
impl From<Value> for ComposableHash {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(values) => values.into(),
            Value::Null => Self::default(),
            other => Self {
                malformed: Some(other.to_string()),
                ..Self::default()
            },
        }
    }
}

impl ComposableHash {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Adds a hook that runs on every `compose`.
    pub fn hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Map<String, Value>, &mut Value) + Send + Sync + 'static,
    {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Marks this bag as weak: extending it into another bag never overrides.
    pub fn weak(mut self) -> Self {
        self.weak = true;
        self
    }

    pub fn is_weak(&self) -> bool {
        self.weak
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.hooks.is_empty() && self.deferred.is_empty()
    }

    /// Extends this bag with `other`, honouring `other`'s weak flag.
    pub fn extend(&mut self, other: &ComposableHash) {
        if other.weak {
            self.extend_weak(other);
            return;
        }
        self.values
            .extend(other.values.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.hooks.extend(other.hooks.iter().cloned());
        self.deferred.extend(other.deferred.iter().cloned());
        if self.malformed.is_none() {
            self.malformed = other.malformed.clone();
        }
    }

    /// Fills only absent keys from `other` and defers its hooks.
    pub fn extend_weak(&mut self, other: &ComposableHash) {
        for (key, value) in &other.values {
            self.values
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        self.deferred.extend(other.hooks.iter().cloned());
        self.deferred.extend(other.deferred.iter().cloned());
        if self.malformed.is_none() {
            self.malformed = other.malformed.clone();
        }
    }

    /// Evaluates the bag against `invoker`.
    pub fn compose(&self, invoker: &mut Value) -> Result<Map<String, Value>> {
        if let Some(malformed) = &self.malformed {
            return Err(CacheError::MalformedStack(format!(
                "expected a key/value bag, got {malformed}"
            )));
        }
        let mut result = self.values.clone();
        for hook in &self.hooks {
            hook(&mut result, invoker);
        }
        for hook in &self.deferred {
            let mut scratch = result.clone();
            hook(&mut scratch, invoker);
            for (key, value) in scratch {
                result.entry(key).or_insert(value);
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hooks_run_in_order_with_invoker() {
        let bag = ComposableHash::new()
            .set("page", 1)
            .hook(|out, props| {
                if let Some(page) = props.get("page") {
                    out.insert("page".into(), page.clone());
                }
            })
            .hook(|out, _| {
                let page = out.get("page").and_then(Value::as_i64).unwrap_or(0);
                out.insert("next".into(), json!(page + 1));
            });

        let mut props = json!({"page": 4});
        let composed = bag.compose(&mut props).unwrap();
        assert_eq!(Value::Object(composed), json!({"page": 4, "next": 5}));
    }

    #[test]
    fn test_hooks_may_update_invoker() {
        let bag = ComposableHash::new().hook(|_, props| {
            props["seen"] = json!(true);
        });
        let mut props = json!({});
        bag.compose(&mut props).unwrap();
        assert_eq!(props, json!({"seen": true}));
    }

    #[test]
    fn test_weak_extend_yields_to_target() {
        let defaults = ComposableHash::new()
            .set("partial", "summary")
            .set("cacheStrategy", "merge")
            .hook(|out, _| {
                out.insert("partial".into(), json!("from-default-hook"));
                out.insert("idAttribute".into(), json!("uuid"));
            })
            .weak();
        let mut specific = ComposableHash::new().set("partial", "card");
        specific.extend(&defaults);

        let composed = specific.compose(&mut Value::Null).unwrap();
        assert_eq!(
            Value::Object(composed),
            json!({"partial": "card", "cacheStrategy": "merge", "idAttribute": "uuid"})
        );
    }

    #[test]
    fn test_strong_extend_overrides() {
        let mut base = ComposableHash::new().set("a", 1);
        base.extend(&ComposableHash::new().set("a", 2).set("b", 3));
        let composed = base.compose(&mut Value::Null).unwrap();
        assert_eq!(Value::Object(composed), json!({"a": 2, "b": 3}));
    }

    #[test]
    fn test_non_object_bag_is_malformed() {
        let bag = ComposableHash::from(json!([1, 2]));
        assert!(matches!(
            bag.compose(&mut Value::Null),
            Err(CacheError::MalformedStack(_))
        ));
        assert!(ComposableHash::from(Value::Null).compose(&mut Value::Null).unwrap().is_empty());
    }
}
