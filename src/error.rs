//! # Cache Errors
//!
//! This module defines the error type shared by descriptor resolution, the fragment
//! cache, the store registry and the adapter layer. Configuration and consistency
//! errors are programmer errors and are never retried; path errors are only fatal
//! when the active `errorOnInvalid` policy says so.

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors that can occur while resolving descriptors or mutating a cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Malformed stack: {0}")]
    MalformedStack(String),
    #[error("Invalid option `{key}`: expected {expected}")]
    InvalidOption { key: String, expected: &'static str },
    #[error("A different store is already registered for type `{0}`")]
    DuplicateStore(String),
    #[error("Unresolved path `{path}` with params {params}")]
    UnresolvedPath { path: String, params: String },
    #[error("Invalid descriptor cannot key a cache write: {0}")]
    InvalidDescriptor(String),
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Cannot resolve an id for item: {0}")]
    MissingId(String),
    #[error("Query references id `{id}` with no fragment in `{partial}`")]
    MissingFragment { id: String, partial: String },
    #[error("Descriptor is not addressable: {0}")]
    NotAddressable(String),
    #[error("Adapter error: {0}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}

impl CacheError {
    /// Wraps any transport failure raised by an adapter.
    pub fn adapter(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Adapter(e.into())
    }
}
