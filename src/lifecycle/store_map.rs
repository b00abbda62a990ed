//! # Store Registry
//!
//! `StoreMap` keeps at most one [`Store`] per entity type. Stores are created on first
//! reference by type name, so schema nodes can name a store (`"user"`) long before
//! anything has been cached for it.
//!
//! There is no process-wide default map: the application builds one and hands it to
//! the [`Resolver`](crate::resolve::Resolver) and anything else that needs it.

use crate::error::{CacheError, Result};
use crate::store::{InvalidateOptions, Store};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Which registered stores a bulk operation applies to.
#[derive(Debug, Clone)]
pub enum StoreSelector {
    All,
    Store(Arc<Store>),
    Type(String),
    Many(Vec<StoreSelector>),
}

impl StoreSelector {
    fn matches(&self, type_name: &str, store: &Arc<Store>) -> bool {
        match self {
            Self::All => true,
            Self::Store(s) => Arc::ptr_eq(s, store),
            Self::Type(t) => t == type_name,
            Self::Many(selectors) => selectors.iter().any(|s| s.matches(type_name, store)),
        }
    }
}

impl From<&str> for StoreSelector {
    fn from(type_name: &str) -> Self {
        Self::Type(type_name.to_string())
    }
}

impl From<Arc<Store>> for StoreSelector {
    fn from(store: Arc<Store>) -> Self {
        Self::Store(store)
    }
}

#[derive(Debug, Default)]
pub struct StoreMap {
    stores: RwLock<HashMap<String, Arc<Store>>>,
}

impl StoreMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `store` under its type. Re-adding the same instance is a no-op.
    pub fn add(&self, store: Arc<Store>) -> Result<()> {
        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        match stores.get(store.type_name()) {
            Some(existing) if Arc::ptr_eq(existing, &store) => Ok(()),
            Some(_) => Err(CacheError::DuplicateStore(store.type_name().to_string())),
            None => {
                debug!(entity_type = %store.type_name(), "Store registered");
                stores.insert(store.type_name().to_string(), store);
                Ok(())
            }
        }
    }

    pub fn get(&self, type_name: &str) -> Option<Arc<Store>> {
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
        stores.get(type_name).cloned()
    }

    /// Returns the store for `type_name`, creating it if needed. `None` creates an
    /// anonymous store under a generated, unused type name.
    pub fn get_or_create(&self, type_name: Option<&str>) -> Arc<Store> {
        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        let type_name = match type_name {
            Some(name) => name.to_string(),
            None => loop {
                let candidate = format!("anonymous-{}", Uuid::new_v4().simple());
                if !stores.contains_key(&candidate) {
                    break candidate;
                }
            },
        };
        stores
            .entry(type_name)
            .or_insert_with_key(|name| {
                debug!(entity_type = %name, "Store created");
                Arc::new(Store::new(name.clone()))
            })
            .clone()
    }

    fn select(&self, selector: &StoreSelector) -> Vec<Arc<Store>> {
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
        stores
            .iter()
            .filter(|(name, store)| selector.matches(name, store))
            .map(|(_, store)| store.clone())
            .collect()
    }

    /// Resets every registered store.
    pub fn reset(&self) {
        let stores = self.select(&StoreSelector::All);
        info!(count = stores.len(), "Resetting stores");
        for store in stores {
            store.reset();
        }
    }

    /// Invalidates everything in each selected store.
    pub fn invalidate(&self, selector: &StoreSelector, options: &InvalidateOptions) {
        for store in self.select(selector) {
            store.invalidate(None, options);
        }
    }

    pub fn types(&self) -> Vec<String> {
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
        let mut types: Vec<String> = stores.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.stores.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Descriptor;
    use crate::store::NotifyOptions;
    use serde_json::json;

    #[test]
    fn test_add_is_idempotent_for_same_instance() {
        let map = StoreMap::new();
        let store = Arc::new(Store::new("user"));
        map.add(store.clone()).unwrap();
        map.add(store.clone()).unwrap();
        assert_eq!(map.len(), 1);

        let err = map.add(Arc::new(Store::new("user"))).unwrap_err();
        assert!(matches!(err, CacheError::DuplicateStore(t) if t == "user"));
    }

    #[test]
    fn test_get_or_create_reuses_store() {
        let map = StoreMap::new();
        let a = map.get_or_create(Some("user"));
        let b = map.get_or_create(Some("user"));
        assert!(Arc::ptr_eq(&a, &b));
        assert!(map.get("post").is_none());
    }

    #[test]
    fn test_anonymous_stores_are_distinct() {
        let map = StoreMap::new();
        let a = map.get_or_create(None);
        let b = map.get_or_create(None);
        assert_ne!(a.type_name(), b.type_name());
        assert!(a.type_name().starts_with("anonymous-"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_selective_invalidate() {
        let map = StoreMap::new();
        let users = map.get_or_create(Some("user"));
        let posts = map.get_or_create(Some("post"));
        let user = Descriptor::item("1", "/users/1");
        let post = Descriptor::item("1", "/posts/1");
        users
            .update_resource(&user, Some(json!({"id": 1})), None, &NotifyOptions::default())
            .unwrap();
        posts
            .update_resource(&post, Some(json!({"id": 1})), None, &NotifyOptions::default())
            .unwrap();

        map.invalidate(&"user".into(), &InvalidateOptions::default());
        assert!(!users.fetch_resource(&user).unwrap().is_fresh());
        assert!(posts.fetch_resource(&post).unwrap().is_fresh());

        map.invalidate(&StoreSelector::All, &InvalidateOptions::default());
        assert!(!posts.fetch_resource(&post).unwrap().is_fresh());
    }

    #[test]
    fn test_reset_clears_all_stores() {
        let map = StoreMap::new();
        let users = map.get_or_create(Some("user"));
        let user = Descriptor::item("1", "/users/1");
        users
            .update_resource(&user, Some(json!({"id": 1})), None, &NotifyOptions::default())
            .unwrap();
        map.reset();
        assert!(users.fetch_resource(&user).unwrap().data.is_none());
        assert_eq!(map.types(), vec!["user"]);
    }
}
