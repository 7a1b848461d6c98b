//! # Component Registry
//!
//! Read-mostly lookup from platform identifier to its adapter and declared
//! capabilities, consulted by the task router on every dispatch.

pub mod capability_registry;

pub use capability_registry::{CapabilityDescriptor, CapabilityRegistry};
