//! # Descriptor Resolver
//!
//! Folds a [`StackItem`] list into a [`Descriptor`] in two passes.
//!
//! **Pass 1** walks the stack in order and accumulates scope: each non-item schema
//! node resets the store/partial/fragment scope before applying its own options, so
//! only the closest enclosing non-item node's configuration survives. Parameter,
//! query and payload bags accumulate across the whole stack.
//!
//! **Pass 2** walks the stack again and builds the address. It has to run after
//! pass 1 because an item's id may come from a parameter bag that appears after the
//! node that needs it.
//!
//! | Stack | `base_path` | `collection_path` | `id` |
//! |---|---|---|---|
//! | `users` | `/users` | `/users` | - |
//! | `users`, `:userId` | `/users/7` | `/users` | `7` |
//! | `users`, `:userId`, modifier `avatar` | `/users/7` (path `/users/7/avatar`) | `/users` | `7` |

use crate::error::{CacheError, Result};
use crate::lifecycle::{ResolverConfig, StoreMap};
use crate::model::descriptor::default_collection_strategy;
use crate::model::{Action, Classify, Descriptor, Strategy, CHANGE_EVENT};
use crate::path::{encode_query, fill, param_string};
use crate::resolve::options::Scope;
use crate::resolve::stack::{StackItem, StoreRef};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct Resolver {
    store_map: Arc<StoreMap>,
    config: ResolverConfig,
}

/// Address pieces collected by pass 2.
#[derive(Default)]
struct Address {
    segments: Vec<String>,
    modifiers: Vec<String>,
    collection_len: Option<usize>,
    path_params: Map<String, Value>,
    last_param_key: Option<String>,
    errors: Vec<String>,
}

impl Address {
    fn push(&mut self, segment: &str) {
        let segment = segment.trim_matches('/');
        if !segment.is_empty() {
            self.segments.push(segment.to_string());
        }
    }

    fn join(&self, root: &str, len: usize) -> Option<String> {
        (len > 0).then(|| format!("{root}/{}", self.segments[..len].join("/")))
    }
}

impl Resolver {
    pub fn new(store_map: Arc<StoreMap>, config: ResolverConfig) -> Self {
        Self { store_map, config }
    }

    pub fn store_map(&self) -> &Arc<StoreMap> {
        &self.store_map
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves a fresh descriptor for `action`.
    pub fn descriptor(
        &self,
        action: Action,
        invoker: &mut Value,
        stack: &[StackItem],
    ) -> Result<Descriptor> {
        let mut descriptor = Descriptor::new(action);
        self.resolve(invoker, &mut descriptor, stack)?;
        Ok(descriptor)
    }

    /// Resolves `stack` into `descriptor` in place.
    ///
    /// Path errors leave `descriptor.valid == false`; they are returned as
    /// [`CacheError::UnresolvedPath`] only when the active `errorOnInvalid` policy is
    /// on (by default for every action except [`Action::Inspect`]).
    pub fn resolve(
        &self,
        invoker: &mut Value,
        descriptor: &mut Descriptor,
        stack: &[StackItem],
    ) -> Result<()> {
        let scope = self.accumulate(invoker, descriptor, stack)?;
        let address = self.template(descriptor, &scope, stack);
        self.finish(descriptor, &scope, address)
    }

    fn accumulate(
        &self,
        invoker: &mut Value,
        descriptor: &mut Descriptor,
        stack: &[StackItem],
    ) -> Result<Scope> {
        let mut scope = Scope::default();
        let mut store_map = None;

        for item in stack {
            match item {
                StackItem::Node(node) => {
                    if node.classify != Classify::Item {
                        scope.reset();
                    }
                    descriptor.classify = node.classify;
                    if let Some(store) = &node.definition.store {
                        scope.store = Some(StoreRef::Instance(store.clone()));
                    }
                    scope.apply(&node.definition.options.compose(invoker)?)?;
                    if node.classify == Classify::Schema {
                        if let Some(adapter) = &node.definition.adapter {
                            descriptor.adapter = Some(adapter.clone());
                        }
                        if let Some(map) = &node.definition.store_map {
                            store_map = Some(map.clone());
                        }
                    }
                }
                StackItem::Options(bag) => scope.apply(&bag.compose(invoker)?)?,
                StackItem::Params(bag) => descriptor.params.extend(bag.compose(invoker)?),
                StackItem::Query(bag) => descriptor.query_params.extend(bag.compose(invoker)?),
                StackItem::Payload(Value::Object(fields)) => {
                    descriptor
                        .payload
                        .extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
                StackItem::Payload(Value::Null) => {}
                StackItem::Payload(other) => {
                    return Err(CacheError::MalformedStack(format!(
                        "payload must be an object, got {other}"
                    )))
                }
                StackItem::Path { .. } => {}
            }
        }

        let active = store_map.as_ref().unwrap_or(&self.store_map);
        let store = match &scope.store {
            Some(StoreRef::Instance(store)) => {
                active.add(store.clone())?;
                Some(store.clone())
            }
            Some(StoreRef::Name(name)) => Some(active.get_or_create(Some(name))),
            None => None,
        };
        descriptor.type_name = store.as_ref().map(|s| s.type_name().to_string());
        descriptor.store = store;
        descriptor.default_partial = self.config.default_partial.clone();
        descriptor.partial = scope
            .partial
            .clone()
            .unwrap_or_else(|| self.config.default_partial.clone());
        descriptor.cache_strategy = scope.cache_strategy.unwrap_or(Strategy::Replace);
        descriptor.collection_strategy = scope
            .collection_strategy
            .unwrap_or_else(|| default_collection_strategy(descriptor.action));
        descriptor.id_attribute = scope.id_attribute.clone().unwrap_or_else(|| "id".to_string());
        Ok(scope)
    }

    fn template(&self, descriptor: &Descriptor, scope: &Scope, stack: &[StackItem]) -> Address {
        let mut address = Address::default();
        for item in stack {
            match item {
                StackItem::Node(node) => {
                    if let Some(template) = node.template() {
                        let filled = fill(&template, &descriptor.params, &scope.param_map);
                        address.path_params.extend(filled.params_used);
                        address.errors.extend(filled.errors);
                        if filled.last_param_key.is_some() {
                            address.last_param_key = filled.last_param_key;
                        }
                        address.push(&filled.uri);
                    }
                    if node.classify == Classify::Collection {
                        address.collection_len = Some(address.segments.len());
                    }
                }
                StackItem::Path { path, modifier: true } => {
                    let path = path.trim_matches('/');
                    if !path.is_empty() {
                        address.modifiers.push(path.to_string());
                    }
                }
                StackItem::Path { path, modifier: false } => {
                    address.push(path);
                    address.collection_len = Some(address.segments.len());
                }
                _ => {}
            }
        }
        address
    }

    fn finish(&self, descriptor: &mut Descriptor, scope: &Scope, address: Address) -> Result<()> {
        let root = self.config.root();
        let query = match descriptor.action {
            Action::Get if !descriptor.query_params.is_empty() => {
                let encoded = encode_query(&descriptor.query_params);
                if encoded.is_empty() {
                    String::new()
                } else {
                    format!("?{encoded}")
                }
            }
            _ => String::new(),
        };

        if let Some(base) = address.join(root, address.segments.len()) {
            let modifiers: String = address.modifiers.iter().map(|m| format!("/{m}")).collect();
            descriptor.path = Some(format!("{base}{modifiers}{query}"));
            descriptor.base_path = Some(format!("{base}{query}"));
        }
        descriptor.collection_path = address
            .collection_len
            .and_then(|len| address.join(root, len));

        let id_name = scope
            .param_map
            .get("id")
            .cloned()
            .or(address.last_param_key)
            .unwrap_or_else(|| "id".to_string());
        descriptor.id = match descriptor.classify {
            Classify::Item => descriptor.params.get(&id_name).and_then(param_string),
            _ => None,
        };
        descriptor.event = descriptor
            .id
            .clone()
            .or_else(|| descriptor.base_path.clone())
            .unwrap_or_else(|| CHANGE_EVENT.to_string());
        descriptor.fragments = scope.fragments.iter().rev().cloned().collect();
        descriptor.path_params = address.path_params;
        let mut errors = address.errors;
        if descriptor.classify == Classify::Item && descriptor.id.is_none() && errors.is_empty() {
            errors.push(id_name);
        }
        descriptor.valid = errors.is_empty();

        if !descriptor.valid {
            let fatal = scope
                .error_on_invalid
                .or(self.config.error_on_invalid)
                .unwrap_or(descriptor.action != Action::Inspect);
            let path = descriptor.path.clone().unwrap_or_default();
            let params = serde_json::to_string(&descriptor.params).unwrap_or_default();
            if fatal {
                return Err(CacheError::UnresolvedPath { path, params });
            }
            warn!(action = %descriptor.action, %path, missing = ?errors, "Unresolved path");
        }

        debug!(
            action = %descriptor.action,
            classify = ?descriptor.classify,
            entity_type = descriptor.type_name.as_deref().unwrap_or("-"),
            path = descriptor.path.as_deref().unwrap_or("-"),
            valid = descriptor.valid,
            "Resolved"
        );
        Ok(())
    }
}
