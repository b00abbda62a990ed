//! # Mock Adapter & Testing Guide
//!
//! `MockAdapter` implements [`Adapter`] entirely in memory. Queue the replies you
//! want with the fluent expectation API, hand the adapter to a schema root, and
//! assert on what the cache did with them.
//!
//! ## When to use the mock vs a real adapter
//!
//! | Feature | MockAdapter | Real adapter |
//! |---------|-------------|--------------|
//! | **Speed** | Instant (in-memory) | Network bound |
//! | **Determinism** | 100% deterministic | Subject to the server |
//! | **Error Injection** | Easy (`return_err`) | Hard |
//!
//! ## Example
//!
//! ```rust
//! use resource_cache::clients::Resource;
//! use resource_cache::lifecycle::{ResolverConfig, StoreMap};
//! use resource_cache::mock::MockAdapter;
//! use resource_cache::model::Action;
//! use resource_cache::resolve::{Resolver, SchemaNode, StackItem};
//! use serde_json::{json, Map, Value};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = Arc::new(MockAdapter::new());
//!     mock.expect_invoke("/users/1").return_ok(Some(json!({"id": 1, "name": "Ada"})));
//!
//!     let resolver = Resolver::new(Arc::new(StoreMap::new()), ResolverConfig::default());
//!     let stack = vec![
//!         StackItem::node(SchemaNode::schema("api").with_adapter(mock.clone())),
//!         StackItem::node(SchemaNode::collection("users", "users").with_store("user")),
//!         StackItem::node(SchemaNode::item("user", "userId")),
//!         StackItem::params(json!({"userId": 1})),
//!     ];
//!     let descriptor = resolver.descriptor(Action::Get, &mut Value::Null, &stack).unwrap();
//!
//!     let resource = Resource::new(descriptor).unwrap();
//!     resource.sync(&Map::new()).await.unwrap();
//!     assert_eq!(resource.read().unwrap().data, Some(json!({"id": 1, "name": "Ada"})));
//!
//!     mock.verify();
//! }
//! ```

use crate::clients::{Adapter, AdapterReply};
use crate::error::{CacheError, Result};
use crate::model::{Action, Descriptor};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

struct Expectation {
    path: String,
    response: std::result::Result<AdapterReply, String>,
}

/// One recorded call to [`MockAdapter::invoke`](Adapter::invoke).
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub action: Action,
    pub path: Option<String>,
    pub payload: Map<String, Value>,
    pub options: Map<String, Value>,
}

/// An adapter with expectation tracking for fluent testing.
#[derive(Default)]
pub struct MockAdapter {
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    calls: Mutex<Vec<Invocation>>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects the next `invoke` to address `path` (the descriptor's full path).
    pub fn expect_invoke(&self, path: impl Into<String>) -> InvokeExpectationBuilder {
        InvokeExpectationBuilder {
            path: path.into(),
            expectations: self.expectations.clone(),
        }
    }

    /// Every invocation so far, in order.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap_or_else(PoisonError::into_inner);
        if !exps.is_empty() {
            panic!("Not all expectations were met. {} remaining", exps.len());
        }
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    async fn invoke(&self, descriptor: &Descriptor, options: &Map<String, Value>) -> Result<AdapterReply> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Invocation {
                action: descriptor.action,
                path: descriptor.path.clone(),
                payload: descriptor.payload.clone(),
                options: options.clone(),
            });

        let expectation = self
            .expectations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let path = descriptor.path.as_deref().unwrap_or_default();
        match expectation {
            Some(Expectation { path: expected, response }) if expected == path => {
                response.map_err(CacheError::adapter)
            }
            Some(Expectation { path: expected, .. }) => Err(CacheError::adapter(format!(
                "expected invoke of `{expected}`, got `{path}`"
            ))),
            None => Err(CacheError::adapter(format!("unexpected invoke of `{path}`"))),
        }
    }
}

/// Builder for `invoke` expectations.
pub struct InvokeExpectationBuilder {
    path: String,
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
}

impl InvokeExpectationBuilder {
    fn push(self, response: std::result::Result<AdapterReply, String>) {
        let mut exps = self.expectations.lock().unwrap_or_else(PoisonError::into_inner);
        exps.push_back(Expectation {
            path: self.path,
            response,
        });
    }

    /// Sets the expectation to return `data`.
    pub fn return_ok(self, data: Option<Value>) {
        self.push(Ok(AdapterReply::new(data)));
    }

    /// Sets the expectation to return a full reply.
    pub fn return_reply(self, reply: AdapterReply) {
        self.push(Ok(reply));
    }

    /// Sets the expectation to fail with a transport error.
    pub fn return_err(self, message: impl Into<String>) {
        self.push(Err(message.into()));
    }
}
