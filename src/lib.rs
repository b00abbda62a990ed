//! # Resource Cache
//!
//! > **A normalized, in-memory cache for addressable API resources.**
//!
//! This crate sits between a declarative resource-addressing layer and a transport.
//! A request is described by a *stack* of schema nodes and caller contributions; the
//! crate resolves that stack into a [`Descriptor`](model::Descriptor), stores and
//! merges entity snapshots per projection, keeps collection membership lists
//! consistent, and tells subscribers when something they read has changed.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Why normalize?
//!
//! Every entity is stored once per projection (a *partial*), keyed by id. Collections
//! and singleton lookups (*queries*) only hold ids, so an update to `user#7` through
//! any address is immediately visible through every list that contains it.
//!
//! ### Why two passes?
//!
//! An item's id can come from a parameter bag anywhere in the stack, even after the
//! node that needs it. Scope (store, projection, strategies) is resolved in stack
//! order first; the address is templated afterwards, once every parameter is known.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. Addressing ([`path`], [`resolve`])
//! - **Role**: Turns stacks into descriptors: `:token` templating, query strings, option scoping.
//! - **Key items**: [`Resolver`](resolve::Resolver), [`StackItem`](resolve::StackItem), [`ComposableHash`](resolve::ComposableHash).
//!
//! ### 2. Caching ([`store`])
//! - **Role**: Fragments and queries with merge/replace semantics, invalidation and destroy.
//! - **Key items**: [`FragmentCache`](store::FragmentCache), [`Store`](store::Store).
//!
//! ### 3. Wiring ([`lifecycle`])
//! - **Role**: The per-type store registry, resolver configuration and logging setup.
//! - **Key items**: [`StoreMap`](lifecycle::StoreMap), [`ResolverConfig`](lifecycle::ResolverConfig).
//!
//! ### 4. Transport seam ([`clients`], [`mock`])
//! - **Role**: The async [`Adapter`](clients::Adapter) trait and the [`Resource`](clients::Resource)
//!   binding that syncs a descriptor through it. [`mock::MockAdapter`] for tests.
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### 1. Errors
//! Everything fallible returns [`Result`] with a [`CacheError`]. Reads are always safe:
//! fetching an unpopulated or invalid address yields a stale, empty result.
//!
//! ### 2. Concurrency
//! Each store guards its cache with one lock. Every mutation completes before any
//! event is emitted, and the lock is released first, so subscribers can read back.
//!
//! ### 3. Observability
//! `tracing` everywhere with structured fields. See [`lifecycle::tracing`].
//!
//! ### Running Tests
//!
//! ```bash
//! RUST_LOG=debug cargo test
//! ```

pub mod clients;
pub mod error;
pub mod lifecycle;
pub mod mock;
pub mod model;
pub mod path;
pub mod resolve;
pub mod store;

pub use error::{CacheError, Result};
