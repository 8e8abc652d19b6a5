//! Datafiles and mapping files.
//!
//! A trigger datafile carries the run-time knobs of a trigger (timeouts,
//! recovery method, static overrides). A mapping file describes a whole
//! trigger in YAML so new triggers can be added without code.

mod datafile;
mod mapping;

pub use datafile::{RecoveryMethod, StaticOverrides, Timeout, TriggerDatafile};
pub use mapping::{FeatureFile, MappingFile, TriggerFile};
