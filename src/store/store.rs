//! # Store
//!
//! One `Store` exists per entity type. It owns a [`FragmentCache`] exclusively and
//! turns every cache mutation into change events:
//!
//! - one `"change"` event per touched query path (`query` set),
//! - one `"change"` event per touched fragment id (`fragment` set),
//! - one scoped `"change:<id>"` event when the originating descriptor had an id,
//!   whether or not anything changed.
//!
//! The cache lock is released before any event is emitted.

use crate::error::Result;
use crate::model::{Descriptor, FetchResult, Status, Touch, Touched, CHANGE_EVENT};
use crate::store::events::{ChangeEvent, EventChannel, NotifyOptions, StoreAction, Subscription};
use crate::store::fragment::{CacheStats, FragmentCache, InvalidateOptions};
use serde_json::Value;
use std::fmt::Debug;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

pub struct Store {
    type_name: String,
    cache: RwLock<FragmentCache>,
    events: EventChannel,
}

impl Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

impl Store {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            cache: RwLock::new(FragmentCache::new()),
            events: EventChannel::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    fn read(&self) -> RwLockReadGuard<'_, FragmentCache> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FragmentCache> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the cache with an empty one. Subscribers stay registered.
    pub fn reset(&self) {
        let previous = std::mem::take(&mut *self.write());
        info!(entity_type = %self.type_name, dropped = ?previous.stats(), "Reset");
    }

    pub fn fetch_resource(&self, descriptor: &Descriptor) -> Result<FetchResult> {
        let result = self.read().fetch(descriptor);
        match &result {
            Ok(found) => debug!(
                entity_type = %self.type_name,
                target = %descriptor.label(),
                status = %found.status,
                "Fetch"
            ),
            Err(e) => warn!(entity_type = %self.type_name, error = %e, "Fetch failed"),
        }
        result
    }

    pub fn touch_resource(
        &self,
        descriptor: &Descriptor,
        patch: &Touch,
        options: &NotifyOptions,
    ) -> Result<()> {
        let touched = self.write().touch(descriptor, patch)?;
        debug!(entity_type = %self.type_name, target = %descriptor.label(), ?patch, "Touched");
        self.notify(Some(descriptor), StoreAction::Touch, touched, options);
        Ok(())
    }

    pub fn update_resource(
        &self,
        descriptor: &Descriptor,
        data: Option<Value>,
        status: Option<Status>,
        options: &NotifyOptions,
    ) -> Result<()> {
        let touched = self.write().update(descriptor, data, status).inspect_err(|e| {
            warn!(entity_type = %self.type_name, target = %descriptor.label(), error = %e, "Update rejected")
        })?;
        info!(
            entity_type = %self.type_name,
            target = %descriptor.label(),
            fragments = touched.fragments.len(),
            queries = touched.queries.len(),
            "Updated"
        );
        self.notify(Some(descriptor), StoreAction::Update, touched, options);
        Ok(())
    }

    pub fn destroy_resource(&self, descriptor: &Descriptor, options: &NotifyOptions) -> Result<()> {
        let touched = self.write().destroy(descriptor)?;
        info!(
            entity_type = %self.type_name,
            target = %descriptor.label(),
            queries = touched.queries.len(),
            "Destroyed"
        );
        self.notify(Some(descriptor), StoreAction::Destroy, touched, options);
        Ok(())
    }

    /// Marks entries stale. With no descriptor, everything in the store is invalidated.
    pub fn invalidate(&self, descriptor: Option<&Descriptor>, options: &InvalidateOptions) {
        let touched = self.write().invalidate(descriptor, options);
        info!(
            entity_type = %self.type_name,
            target = %descriptor.map_or_else(|| "*".to_string(), Descriptor::label),
            clear = options.clear,
            fragments = touched.fragments.len(),
            queries = touched.queries.len(),
            "Invalidated"
        );
        self.notify(descriptor, StoreAction::Invalidate, touched, &options.notify);
    }

    fn event(&self, name: String, action: StoreAction, options: &NotifyOptions) -> ChangeEvent {
        ChangeEvent {
            name,
            type_name: self.type_name.clone(),
            action,
            fragment: None,
            query: None,
            id: None,
            extra: options.extra.clone(),
        }
    }

    fn notify(
        &self,
        descriptor: Option<&Descriptor>,
        action: StoreAction,
        touched: Touched,
        options: &NotifyOptions,
    ) {
        if options.no_notify {
            return;
        }
        for query in touched.queries {
            let mut event = self.event(CHANGE_EVENT.to_string(), action, options);
            event.query = Some(query);
            self.events.emit(event);
        }
        for fragment in touched.fragments {
            let mut event = self.event(CHANGE_EVENT.to_string(), action, options);
            event.fragment = Some(fragment);
            self.events.emit(event);
        }
        if let Some(id) = descriptor.and_then(|d| d.id.as_ref()) {
            let mut event = self.event(format!("{CHANGE_EVENT}:{id}"), action, options);
            event.id = Some(id.clone());
            self.events.emit(event);
        }
    }

    pub fn subscribe<F>(&self, name: &str, callback: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(name, callback)
    }

    pub fn once<F>(&self, name: &str, callback: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.events.once(name, callback)
    }

    pub fn watch(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.watch()
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.events.listener_count(name)
    }

    pub fn stats(&self) -> CacheStats {
        self.read().stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn recorder(store: &Store, name: &str) -> (Arc<Mutex<Vec<ChangeEvent>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let subscription = store.subscribe(name, move |e| sink.lock().unwrap().push(e.clone()));
        (seen, subscription)
    }

    #[test]
    fn test_update_emits_query_fragment_and_scoped_events() {
        let store = Store::new("user");
        let (changes, _s1) = recorder(&store, "change");
        let (scoped, _s2) = recorder(&store, "change:1");

        let descriptor = Descriptor::item("1", "/users/1");
        store
            .update_resource(&descriptor, Some(json!({"id": 1})), None, &NotifyOptions::default())
            .unwrap();

        let changes = changes.lock().unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].query.as_deref(), Some("/users/1"));
        assert_eq!(changes[1].fragment.as_deref(), Some("1"));
        assert!(changes.iter().all(|e| e.action == StoreAction::Update && e.type_name == "user"));

        let scoped = scoped.lock().unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].id.as_deref(), Some("1"));
    }

    #[test]
    fn test_no_notify_suppresses_events() {
        let store = Store::new("user");
        let (changes, _s) = recorder(&store, "change");
        store
            .update_resource(
                &Descriptor::item("1", "/users/1"),
                Some(json!({"id": 1})),
                None,
                &NotifyOptions::silent(),
            )
            .unwrap();
        assert!(changes.lock().unwrap().is_empty());
        assert!(store.fetch_resource(&Descriptor::item("1", "/users/1")).unwrap().data.is_some());
    }

    #[test]
    fn test_scoped_event_fires_even_without_changes() {
        let store = Store::new("user");
        let (changes, _s1) = recorder(&store, "change");
        let (scoped, _s2) = recorder(&store, "change:1");
        let descriptor = Descriptor::item("1", "/users/1");

        let pending = Touch::status(Status::Pending);
        store.touch_resource(&descriptor, &pending, &NotifyOptions::default()).unwrap();
        store.touch_resource(&descriptor, &pending, &NotifyOptions::default()).unwrap();
        assert_eq!(scoped.lock().unwrap().len(), 2);
        assert_eq!(changes.lock().unwrap().len(), 1);

        store.invalidate(Some(&Descriptor::item("1", "/users/1")), &InvalidateOptions::default());
        store.invalidate(Some(&Descriptor::item("1", "/users/1")), &InvalidateOptions::default());
        assert_eq!(scoped.lock().unwrap().len(), 4);

        store.touch_resource(&descriptor, &pending, &NotifyOptions::silent()).unwrap();
        assert_eq!(scoped.lock().unwrap().len(), 4);
    }

    #[test]
    fn test_passthrough_options_reach_events() {
        let store = Store::new("user");
        let (changes, _s) = recorder(&store, "change");
        let mut options = InvalidateOptions::default();
        options.notify.extra.insert("reason".into(), json!("logout"));
        store
            .update_resource(&Descriptor::collection("/users"), Some(json!([{"id": 1}])), None, &NotifyOptions::default())
            .unwrap();
        changes.lock().unwrap().clear();

        store.invalidate(None, &options);
        let changes = changes.lock().unwrap();
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|e| e.action == StoreAction::Invalidate));
        assert!(changes.iter().all(|e| e.extra.get("reason") == Some(&json!("logout"))));
    }

    #[test]
    fn test_reset_keeps_subscribers_and_empties_cache() {
        let store = Store::new("user");
        let (changes, _s) = recorder(&store, "change");
        let descriptor = Descriptor::item("1", "/users/1");
        store
            .update_resource(&descriptor, Some(json!({"id": 1})), None, &NotifyOptions::default())
            .unwrap();
        store.reset();

        assert_eq!(store.fetch_resource(&descriptor).unwrap(), FetchResult::default());
        assert_eq!(store.listener_count("change"), 1);

        store
            .update_resource(&descriptor, Some(json!({"id": 1})), None, &NotifyOptions::default())
            .unwrap();
        assert_eq!(changes.lock().unwrap().len(), 4);
    }

    #[test]
    fn test_subscriber_can_read_during_notification() {
        let store = Arc::new(Store::new("user"));
        let reader = Arc::downgrade(&store);
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let _s = store.subscribe("change:1", move |_| {
            if let Some(store) = reader.upgrade() {
                let result = store.fetch_resource(&Descriptor::item("1", "/users/1")).unwrap();
                *sink.lock().unwrap() = result.data;
            }
        });

        store
            .update_resource(
                &Descriptor::item("1", "/users/1"),
                Some(json!({"id": 1, "name": "Ada"})),
                None,
                &NotifyOptions::default(),
            )
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(json!({"id": 1, "name": "Ada"})));
    }
}
