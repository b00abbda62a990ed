//! # Store Layer
//!
//! - [`FragmentCache`]: the normalized per-type cache of fragments and queries.
//! - [`Store`]: wraps one cache with a change-event channel.
//! - [`EventChannel`]: `subscribe`/`once`/`watch` plumbing used by the store.

pub mod events;
pub mod fragment;
#[allow(clippy::module_inception)]
pub mod store;

pub use events::{ChangeEvent, EventChannel, NotifyOptions, StoreAction, Subscription};
pub use fragment::{CacheStats, FragmentCache, InvalidateOptions};
pub use store::Store;
