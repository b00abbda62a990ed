//! # Lifecycle
//!
//! Everything an application wires up once at startup:
//!
//! - [`StoreMap`]: the registry of per-type stores, passed explicitly to the resolver.
//! - [`ResolverConfig`]: address root, default projection and `errorOnInvalid` policy.
//! - [`setup_tracing`]: structured logging setup.
//!
//! ```rust
//! use resource_cache::lifecycle::{ResolverConfig, StoreMap};
//! use resource_cache::resolve::Resolver;
//! use std::sync::Arc;
//!
//! let stores = Arc::new(StoreMap::new());
//! let resolver = Resolver::new(stores.clone(), ResolverConfig::default().with_root("/api"));
//! # let _ = resolver;
//! ```

pub mod config;
pub mod store_map;
pub mod tracing;

pub use config::ResolverConfig;
pub use store_map::{StoreMap, StoreSelector};
pub use self::tracing::setup_tracing;
