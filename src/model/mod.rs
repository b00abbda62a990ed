//! Plain data types shared by the resolver and the cache: descriptors, entries and change sets.

pub mod descriptor;
pub mod entry;

pub use descriptor::*;
pub use entry::*;
