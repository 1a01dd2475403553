//! Memory resources and heap accounting.

pub mod resource;

pub use resource::{HeapUsage, MemoryResource, SystemMemoryResource};
