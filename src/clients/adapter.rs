//! # Adapter Trait
//!
//! The transport seam. An adapter performs the I/O a [`Descriptor`] describes and
//! hands back the decoded data plus the raw response; the cache itself never talks
//! to the network. [`Resource::sync`](super::Resource::sync) is the one caller that
//! folds adapter replies back into a store.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use resource_cache::clients::{Adapter, AdapterReply};
//! use resource_cache::model::Descriptor;
//! use serde_json::{json, Map, Value};
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Adapter for Echo {
//!     async fn invoke(
//!         &self,
//!         descriptor: &Descriptor,
//!         _options: &Map<String, Value>,
//!     ) -> resource_cache::Result<AdapterReply> {
//!         Ok(AdapterReply::new(Some(Value::Object(descriptor.payload.clone()))))
//!     }
//! }
//! ```

use crate::error::Result;
use crate::model::Descriptor;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Decoded data and the raw transport response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterReply {
    pub data: Option<Value>,
    pub response: Value,
}

impl AdapterReply {
    pub fn new(data: Option<Value>) -> Self {
        Self {
            data,
            response: Value::Null,
        }
    }

    pub fn with_response(mut self, response: Value) -> Self {
        self.response = response;
        self
    }
}

#[async_trait]
pub trait Adapter: Send + Sync {
    /// Performs the request described by `descriptor`.
    async fn invoke(&self, descriptor: &Descriptor, options: &Map<String, Value>) -> Result<AdapterReply>;
}
