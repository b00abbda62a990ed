//! # Resource Descriptor
//!
//! A `Descriptor` is the resolved, addressable description of one logical request:
//! where it lives (`base_path`, `path`, `collection_path`), which entity it names
//! (`id`), how it is addressed in the cache (`classify`, `partial`) and how new data
//! combines with cached data (`cache_strategy`, `collection_strategy`).
//!
//! Descriptors are produced by the [`Resolver`](crate::resolve::Resolver) and are
//! treated as immutable values afterwards. They are cheap to clone: the store and
//! adapter are shared through `Arc`.

use crate::clients::Adapter;
use crate::store::Store;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Debug, Display};
use std::str::FromStr;
use std::sync::Arc;

/// Name of the canonical (full) projection.
pub const DEFAULT_PARTIAL: &str = "default";

/// Event key used when a descriptor has neither id nor address.
pub const CHANGE_EVENT: &str = "change";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Get,
    Create,
    Update,
    Delete,
    Inspect,
}

/// Structural role of a descriptor; decides the cache addressing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classify {
    Schema,
    Namespace,
    Resource,
    Collection,
    Item,
}

/// How incoming data combines with what is already cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Merge,
    Replace,
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "merge" => Ok(Self::Merge),
            "replace" => Ok(Self::Replace),
            other => Err(format!("unknown strategy `{other}`")),
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "get"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Inspect => write!(f, "inspect"),
        }
    }
}

#[derive(Clone)]
pub struct Descriptor {
    pub action: Action,
    pub classify: Classify,
    pub store: Option<Arc<Store>>,
    pub type_name: Option<String>,
    pub id: Option<String>,
    pub base_path: Option<String>,
    pub path: Option<String>,
    pub collection_path: Option<String>,
    pub event: String,
    pub partial: String,
    /// Projections consulted on a partial read, most specific first.
    pub fragments: Vec<String>,
    pub default_partial: String,
    pub cache_strategy: Strategy,
    pub collection_strategy: Strategy,
    /// Payload attribute holding an item's id.
    pub id_attribute: String,
    pub params: Map<String, Value>,
    pub path_params: Map<String, Value>,
    pub query_params: Map<String, Value>,
    pub payload: Map<String, Value>,
    pub adapter: Option<Arc<dyn Adapter>>,
    pub valid: bool,
}

impl Descriptor {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            classify: Classify::Resource,
            store: None,
            type_name: None,
            id: None,
            base_path: None,
            path: None,
            collection_path: None,
            event: CHANGE_EVENT.to_string(),
            partial: DEFAULT_PARTIAL.to_string(),
            fragments: Vec::new(),
            default_partial: DEFAULT_PARTIAL.to_string(),
            cache_strategy: Strategy::Replace,
            collection_strategy: default_collection_strategy(action),
            id_attribute: "id".to_string(),
            params: Map::new(),
            path_params: Map::new(),
            query_params: Map::new(),
            payload: Map::new(),
            adapter: None,
            valid: true,
        }
    }

    /// An item address for `id` under `base_path`.
    pub fn item(id: impl Into<String>, base_path: impl Into<String>) -> Self {
        let id = id.into();
        let mut descriptor = Self::new(Action::Get).with_classify(Classify::Item);
        descriptor.event = id.clone();
        descriptor.id = Some(id);
        descriptor.with_base_path(base_path)
    }

    /// A collection address at `base_path`.
    pub fn collection(base_path: impl Into<String>) -> Self {
        Self::new(Action::Get)
            .with_classify(Classify::Collection)
            .with_base_path(base_path)
    }

    /// A singleton resource address at `base_path`.
    pub fn resource(base_path: impl Into<String>) -> Self {
        Self::new(Action::Get)
            .with_classify(Classify::Resource)
            .with_base_path(base_path)
    }

    pub fn with_classify(mut self, classify: Classify) -> Self {
        self.classify = classify;
        self
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        let base_path = base_path.into();
        if self.id.is_none() {
            self.event = base_path.clone();
        }
        self.path = Some(base_path.clone());
        self.base_path = Some(base_path);
        self
    }

    pub fn with_partial(mut self, partial: impl Into<String>) -> Self {
        self.partial = partial.into();
        self
    }

    pub fn with_fragments<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fragments = fragments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cache_strategy(mut self, strategy: Strategy) -> Self {
        self.cache_strategy = strategy;
        self
    }

    pub fn with_collection_strategy(mut self, strategy: Strategy) -> Self {
        self.collection_strategy = strategy;
        self
    }

    pub fn with_store(mut self, store: Arc<Store>) -> Self {
        self.type_name = Some(store.type_name().to_string());
        self.store = Some(store);
        self
    }

    /// A short label for logs and errors.
    pub fn label(&self) -> String {
        match (&self.id, &self.base_path) {
            (Some(id), _) => format!("{}#{id}", self.type_name.as_deref().unwrap_or("?")),
            (None, Some(path)) => path.clone(),
            (None, None) => CHANGE_EVENT.to_string(),
        }
    }
}

pub(crate) fn default_collection_strategy(action: Action) -> Strategy {
    match action {
        Action::Create => Strategy::Merge,
        _ => Strategy::Replace,
    }
}

impl Debug for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("action", &self.action)
            .field("classify", &self.classify)
            .field("type_name", &self.type_name)
            .field("id", &self.id)
            .field("base_path", &self.base_path)
            .field("path", &self.path)
            .field("collection_path", &self.collection_path)
            .field("event", &self.event)
            .field("partial", &self.partial)
            .field("fragments", &self.fragments)
            .field("cache_strategy", &self.cache_strategy)
            .field("collection_strategy", &self.collection_strategy)
            .field("params", &self.params)
            .field("query_params", &self.query_params)
            .field("valid", &self.valid)
            .finish_non_exhaustive()
    }
}
