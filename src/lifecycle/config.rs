//! Resolver configuration.
//!
//! Defaults suit an API served from the same origin. Override from the environment:
//!
//! ```bash
//! RESOURCE_CACHE_ROOT=https://api.example.com
//! RESOURCE_CACHE_DEFAULT_PARTIAL=full
//! RESOURCE_CACHE_ERROR_ON_INVALID=false
//! ```

use crate::model::DEFAULT_PARTIAL;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolverConfig {
    /// Host/namespace root prefixed to every resolved address.
    pub root: String,
    /// Name of the canonical projection.
    pub default_partial: String,
    /// Overrides the default `errorOnInvalid` policy for every action.
    pub error_on_invalid: Option<bool>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            root: String::new(),
            default_partial: DEFAULT_PARTIAL.to_string(),
            error_on_invalid: None,
        }
    }
}

impl ResolverConfig {
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(root) = std::env::var("RESOURCE_CACHE_ROOT") {
            config.root = root;
        }
        if let Ok(partial) = std::env::var("RESOURCE_CACHE_DEFAULT_PARTIAL") {
            config.default_partial = partial;
        }
        if let Ok(flag) = std::env::var("RESOURCE_CACHE_ERROR_ON_INVALID") {
            match flag.parse() {
                Ok(flag) => config.error_on_invalid = Some(flag),
                Err(_) => warn!(value = %flag, "Ignoring RESOURCE_CACHE_ERROR_ON_INVALID"),
            }
        }
        config
    }

    /// Root without a trailing slash.
    pub(crate) fn root(&self) -> &str {
        self.root.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_partial_config() {
        let config: ResolverConfig =
            serde_json::from_str(r#"{"root": "https://api.example.com/"}"#).unwrap();
        assert_eq!(config.root(), "https://api.example.com");
        assert_eq!(config.default_partial, DEFAULT_PARTIAL);
        assert_eq!(config.error_on_invalid, None);
    }
}
