//! URI building blocks: `:param` template filling and query-string encoding.

pub mod query;
pub mod template;

pub use query::{encode_component, encode_query, strip_query};
pub use template::{fill, param_string, Filled};
