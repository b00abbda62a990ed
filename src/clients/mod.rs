//! Transport seam ([`Adapter`]) and the [`Resource`] binding that syncs a descriptor through it.

pub mod adapter;
pub mod resource;

pub use adapter::{Adapter, AdapterReply};
pub use resource::Resource;
