//! # Ferrigger
//!
//! Async trigger engine for disruptive testing of network devices.
//!
//! A trigger learns the state of a device, picks the entities that satisfy
//! its requirements, changes their configuration, verifies that the learned
//! state moved the way it should, then restores the configuration and
//! checks the device came back.
//!
//! ## Features
//!
//! - Requirement paths with regex keys and named captures joined across
//!   requirements (`["info", "(?P<interface>.*)", "enabled", true]`)
//! - Immutable snapshots with exclusions and structural diff
//! - Polled learn/verify/recover steps under a datafile time budget
//! - Recovery guard that is restored on every path after a change
//! - Built-in IOS-XE interface triggers, YAML-defined triggers
//! - Ops assembly from parsed show commands
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ferrigger::{SimulatedDevice, TriggerDatafile, TriggerRegistry, TriggerRunner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ferrigger::Error> {
//!     let device = SimulatedDevice::new().with_feature(
//!         "interface",
//!         serde_json::json!({"info": {"GigabitEthernet1/0/1.10": {"enabled": true, "oper_status": "up"}}}),
//!     );
//!     let trigger = TriggerRegistry::lookup("iosxe", "TriggerUnconfigConfigEthernetSubInterface")?;
//!
//!     let mut runner = TriggerRunner::new(device.clone(), device.clone(), device);
//!     let report = runner.run(&trigger, &TriggerDatafile::default()).await?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod ops;
pub mod path;
pub mod sim;
pub mod snapshot;
pub mod triggers;

// Re-export main types for convenience
pub use config::{RecoveryMethod, Timeout, TriggerDatafile};
pub use engine::{
    ConfigChange, Mapping, Mutator, Outcome, Reason, Recoverer, State, StateLearner,
    TrafficMonitor, TriggerReport, TriggerRunner,
};
pub use error::Error;
pub use path::{CaptureBindings, RequirementSet, Step};
pub use sim::SimulatedDevice;
pub use snapshot::{Snapshot, SnapshotStore, Value};
pub use triggers::{TriggerDefinition, TriggerRegistry};
