//! # Change Events
//!
//! Publish/subscribe plumbing for a store. Subscribers register a callback under an
//! event name (`"change"` or the scoped `"change:<id>"`) and get back a
//! [`Subscription`] that removes the callback when disposed.
//!
//! Callbacks run synchronously on the thread that performed the mutation, after the
//! cache lock is released, so a callback may read the store again. A panicking
//! callback propagates to the caller; the mutation that triggered it has already
//! been applied.
//!
//! Async consumers can use [`EventChannel::watch`] instead, which hands out a
//! `tokio::sync::broadcast` receiver carrying every emitted event.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::broadcast;

/// Capacity of the broadcast channel behind [`EventChannel::watch`].
const WATCH_CAPACITY: usize = 256;

/// The cache operation that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreAction {
    Invalidate,
    Touch,
    Update,
    Destroy,
}

impl Display for StoreAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalidate => write!(f, "invalidate"),
            Self::Touch => write!(f, "touch"),
            Self::Update => write!(f, "update"),
            Self::Destroy => write!(f, "destroy"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEvent {
    /// Name the event was emitted under.
    #[serde(skip)]
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub action: StoreAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fragment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Caller-supplied fields passed through from the mutation options.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Options accepted by every notifying store mutation.
#[derive(Debug, Clone, Default)]
pub struct NotifyOptions {
    /// Suppress all events for this mutation.
    pub no_notify: bool,
    /// Extra fields copied into every emitted event.
    pub extra: Map<String, Value>,
}

impl NotifyOptions {
    pub fn silent() -> Self {
        Self {
            no_notify: true,
            ..Self::default()
        }
    }
}

type Callback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

struct Listener {
    id: u64,
    once: bool,
    callback: Callback,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: HashMap<String, Vec<Listener>>,
}

/// Handle returned by `subscribe`/`once`; call [`Subscription::dispose`] to unsubscribe.
#[must_use = "dropping a Subscription keeps the callback registered; call dispose() to remove it"]
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    name: String,
    id: u64,
}

impl Subscription {
    pub fn dispose(&self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(listeners) = registry.listeners.get_mut(&self.name) {
                listeners.retain(|l| l.id != self.id);
            }
        }
    }
}

pub struct EventChannel {
    registry: Arc<Mutex<Registry>>,
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl EventChannel {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(WATCH_CAPACITY);
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            sender,
        }
    }

    fn register(&self, name: &str, once: bool, callback: Callback) -> Subscription {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.next_id += 1;
        let id = registry.next_id;
        registry
            .listeners
            .entry(name.to_string())
            .or_default()
            .push(Listener { id, once, callback });
        Subscription {
            registry: Arc::downgrade(&self.registry),
            name: name.to_string(),
            id,
        }
    }

    pub fn subscribe<F>(&self, name: &str, callback: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.register(name, false, Arc::new(callback))
    }

    /// Like `subscribe`, but the callback is removed after its first event.
    pub fn once<F>(&self, name: &str, callback: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.register(name, true, Arc::new(callback))
    }

    pub fn watch(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    pub fn listener_count(&self, name: &str) -> usize {
        let registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.listeners.get(name).map_or(0, Vec::len)
    }

    pub fn emit(&self, event: ChangeEvent) {
        let callbacks: Vec<Callback> = {
            let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
            match registry.listeners.get_mut(&event.name) {
                Some(listeners) => {
                    let callbacks = listeners.iter().map(|l| l.callback.clone()).collect();
                    listeners.retain(|l| !l.once);
                    callbacks
                }
                None => Vec::new(),
            }
        };

        for callback in callbacks {
            callback(&event);
        }
        // No receivers is not an error.
        let _ = self.sender.send(event);
    }
}
