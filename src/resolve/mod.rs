//! # Descriptor Resolution
//!
//! Turns a stack of schema nodes and caller contributions into a
//! [`Descriptor`](crate::model::Descriptor):
//!
//! - [`ComposableHash`]: key/value bags with hooks evaluated against the invoker
//! - [`StackItem`] and [`SchemaNode`]: what a stack is made of
//! - [`Resolver`]: the two-pass fold itself

pub mod hash;
mod options;
pub mod resolver;
pub mod stack;

pub use hash::{ComposableHash, Hook};
pub use resolver::Resolver;
pub use stack::{NodeDefinition, SchemaNode, StackItem, StoreRef};
