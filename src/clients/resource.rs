//! # Resource
//!
//! A `Resource` binds one resolved [`Descriptor`] to its store and adapter:
//!
//! - [`Resource::read`] returns the cached view, re-fetching only after the store
//!   has reported a change since the last read.
//! - [`Resource::sync`] performs the request through the adapter and folds the
//!   reply back into the store (`pending` while in flight, `error` on failure).
//!
//! The memo lives in an explicit field guarded by a mutex; a store subscription
//! flips its dirty flag, and dropping the resource disposes that subscription.

use crate::clients::adapter::AdapterReply;
use crate::error::{CacheError, Result};
use crate::model::{Action, Descriptor, FetchResult, Status, Touch, CHANGE_EVENT};
use crate::store::{NotifyOptions, Store, Subscription};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, instrument, warn};

#[derive(Debug, Default)]
struct Memo {
    cached: Option<FetchResult>,
    dirty: bool,
}

pub struct Resource {
    descriptor: Descriptor,
    store: Arc<Store>,
    memo: Arc<Mutex<Memo>>,
    subscription: Subscription,
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl Resource {
    /// Fails with [`CacheError::NotAddressable`] when the descriptor has no store.
    pub fn new(descriptor: Descriptor) -> Result<Self> {
        let store = descriptor
            .store
            .clone()
            .ok_or_else(|| CacheError::NotAddressable(format!("{} has no store", descriptor.label())))?;
        let memo = Arc::new(Mutex::new(Memo::default()));
        let weak = Arc::downgrade(&memo);
        let subscription = store.subscribe(CHANGE_EVENT, move |_| {
            if let Some(memo) = weak.upgrade() {
                memo.lock().unwrap_or_else(PoisonError::into_inner).dirty = true;
            }
        });
        Ok(Self {
            descriptor,
            store,
            memo,
            subscription,
        })
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Whether the next `read` will hit the store.
    pub fn is_dirty(&self) -> bool {
        let memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
        memo.dirty || memo.cached.is_none()
    }

    pub fn read(&self) -> Result<FetchResult> {
        let mut memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = memo.cached.as_ref().filter(|_| !memo.dirty) {
            return Ok(cached.clone());
        }
        let fresh = self.store.fetch_resource(&self.descriptor)?;
        memo.cached = Some(fresh.clone());
        memo.dirty = false;
        Ok(fresh)
    }

    /// Performs the descriptor's request and writes the outcome to the store.
    ///
    /// `get`, `create` and `update` store the reply data; `delete` destroys the
    /// addressed entry. Adapter failures mark the entry `error` and are returned.
    #[instrument(skip_all, fields(action = %self.descriptor.action, target = %self.descriptor.label()))]
    pub async fn sync(&self, options: &Map<String, Value>) -> Result<AdapterReply> {
        if self.descriptor.action == Action::Inspect {
            return Err(CacheError::NotAddressable(
                "inspect descriptors are not synced".to_string(),
            ));
        }
        let adapter = self.descriptor.adapter.clone().ok_or_else(|| {
            CacheError::NotAddressable(format!("{} has no adapter", self.descriptor.label()))
        })?;
        let notify = NotifyOptions::default();

        self.store
            .touch_resource(&self.descriptor, &Touch::status(Status::Pending), &notify)?;
        debug!("Sending request");

        match adapter.invoke(&self.descriptor, options).await {
            Ok(reply) => {
                match self.descriptor.action {
                    Action::Delete => self.store.destroy_resource(&self.descriptor, &notify)?,
                    _ => self
                        .store
                        .update_resource(&self.descriptor, reply.data.clone(), None, &notify)?,
                }
                Ok(reply)
            }
            Err(e) => {
                warn!(error = %e, "Adapter failed");
                self.store
                    .touch_resource(&self.descriptor, &Touch::status(Status::Error), &notify)?;
                Err(e)
            }
        }
    }
}

impl Drop for Resource {
    fn drop(&mut self) {
        self.subscription.dispose();
    }
}
