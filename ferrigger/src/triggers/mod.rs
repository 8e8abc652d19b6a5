//! Trigger definitions and the global trigger registry.
//!
//! A trigger is a named [`Mapping`](crate::engine::Mapping) for one
//! operating system. Built-in triggers live under [`vendors`]; more can be
//! registered at run time or loaded from YAML.

mod definition;
mod registry;
pub mod vendors;

pub use definition::TriggerDefinition;
pub use registry::TriggerRegistry;
