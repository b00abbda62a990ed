//! # Resolution Stack
//!
//! A stack is an ordered list of contributions that together describe one request:
//! schema nodes from the root down to the leaf, literal path segments, and bags of
//! options, path parameters, query parameters and payload fields. The
//! [`Resolver`](super::Resolver) folds a stack into a [`Descriptor`](crate::model::Descriptor).
//!
//! ```rust
//! use resource_cache::model::Classify;
//! use resource_cache::resolve::{SchemaNode, StackItem};
//! use serde_json::json;
//!
//! let users = SchemaNode::collection("users", "users").with_store("user");
//! let user = SchemaNode::item("user", "userId");
//! let stack = vec![
//!     StackItem::node(users),
//!     StackItem::node(user),
//!     StackItem::params(json!({"userId": 7})),
//! ];
//! # assert_eq!(stack.len(), 3);
//! # let _ = Classify::Item;
//! ```

use crate::clients::Adapter;
use crate::lifecycle::StoreMap;
use crate::model::Classify;
use crate::resolve::hash::ComposableHash;
use crate::store::Store;
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;

/// A store named by type (created on demand) or given directly.
#[derive(Debug, Clone)]
pub enum StoreRef {
    Name(String),
    Instance(Arc<Store>),
}

/// Declared configuration of a schema node.
///
/// Cache options (`partial`, `fragments`, `store`, `cacheStrategy`,
/// `collectionStrategy`, `paramMap`, `errorOnInvalid`, `idAttribute`) live in
/// `options` so they can be composed against the invoker like any other bag.
#[derive(Clone, Default)]
pub struct NodeDefinition {
    /// Literal path fragment, may contain `:tokens`.
    pub path: Option<String>,
    /// Parameter that addresses this node when it has no literal path.
    pub param_id: Option<String>,
    pub store: Option<Arc<Store>>,
    pub adapter: Option<Arc<dyn Adapter>>,
    pub store_map: Option<Arc<StoreMap>>,
    pub options: ComposableHash,
}

impl Debug for NodeDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeDefinition")
            .field("path", &self.path)
            .field("param_id", &self.param_id)
            .field("store", &self.store.as_ref().map(|s| s.type_name().to_string()))
            .field("adapter", &self.adapter.is_some())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub classify: Classify,
    pub identifier: String,
    pub definition: NodeDefinition,
}

impl SchemaNode {
    pub fn new(classify: Classify, identifier: impl Into<String>) -> Self {
        Self {
            classify,
            identifier: identifier.into(),
            definition: NodeDefinition::default(),
        }
    }

    /// The root of a schema tree. Usually carries the adapter.
    pub fn schema(identifier: impl Into<String>) -> Self {
        Self::new(Classify::Schema, identifier)
    }

    pub fn namespace(identifier: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(Classify::Namespace, identifier).with_path(path)
    }

    pub fn resource(identifier: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(Classify::Resource, identifier).with_path(path)
    }

    pub fn collection(identifier: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(Classify::Collection, identifier).with_path(path)
    }

    /// A collection member addressed by `param_id`.
    pub fn item(identifier: impl Into<String>, param_id: impl Into<String>) -> Self {
        let mut node = Self::new(Classify::Item, identifier);
        node.definition.param_id = Some(param_id.into());
        node
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.definition.path = Some(path.into());
        self
    }

    pub fn with_option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.definition.options = std::mem::take(&mut self.definition.options).set(key, value);
        self
    }

    /// Strongly extends the node's options with `options`.
    pub fn with_options(mut self, options: impl Into<ComposableHash>) -> Self {
        self.definition.options.extend(&options.into());
        self
    }

    /// Weakly extends the node's options: existing keys win.
    pub fn with_defaults(mut self, defaults: &ComposableHash) -> Self {
        self.definition.options.extend_weak(defaults);
        self
    }

    /// Names the store for this node's entity type.
    pub fn with_store(self, type_name: &str) -> Self {
        self.with_option("store", type_name)
    }

    pub fn with_store_instance(mut self, store: Arc<Store>) -> Self {
        self.definition.store = Some(store);
        self
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.definition.adapter = Some(adapter);
        self
    }

    pub fn with_store_map(mut self, store_map: Arc<StoreMap>) -> Self {
        self.definition.store_map = Some(store_map);
        self
    }

    /// The path template this node contributes, if any.
    pub(crate) fn template(&self) -> Option<String> {
        self.definition
            .path
            .clone()
            .or_else(|| self.definition.param_id.as_ref().map(|p| format!(":{p}")))
    }
}

#[derive(Debug, Clone)]
pub enum StackItem {
    Node(Arc<SchemaNode>),
    /// A literal path. Modifiers are appended after the address and never count
    /// as addressing segments.
    Path { path: String, modifier: bool },
    Options(ComposableHash),
    Params(ComposableHash),
    Query(ComposableHash),
    Payload(Value),
}

impl StackItem {
    pub fn node(node: SchemaNode) -> Self {
        Self::Node(Arc::new(node))
    }

    pub fn path(path: impl Into<String>) -> Self {
        Self::Path {
            path: path.into(),
            modifier: false,
        }
    }

    pub fn modifier(path: impl Into<String>) -> Self {
        Self::Path {
            path: path.into(),
            modifier: true,
        }
    }

    pub fn options(bag: impl Into<ComposableHash>) -> Self {
        Self::Options(bag.into())
    }

    pub fn params(bag: impl Into<ComposableHash>) -> Self {
        Self::Params(bag.into())
    }

    pub fn query(bag: impl Into<ComposableHash>) -> Self {
        Self::Query(bag.into())
    }

    pub fn payload(payload: Value) -> Self {
        Self::Payload(payload)
    }
}

impl From<SchemaNode> for StackItem {
    fn from(node: SchemaNode) -> Self {
        Self::node(node)
    }
}

impl From<Arc<SchemaNode>> for StackItem {
    fn from(node: Arc<SchemaNode>) -> Self {
        Self::Node(node)
    }
}
