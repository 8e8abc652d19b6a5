//! Trigger orchestration.
//!
//! The engine drives one trigger through
//! `INIT -> LEARN_BEFORE -> (SKIP | PROCEED) -> APPLY_CHANGE -> LEARN_AFTER
//! -> VERIFY -> (PASS | FAIL) -> RECOVER -> DONE`. The device is reached only
//! through three collaborators:
//!
//! - [`StateLearner`] learns a feature into a [`Snapshot`],
//! - [`Mutator`] applies a rendered [`ConfigChange`],
//! - [`Recoverer`] saves and restores the device configuration.
//!
//! An optional [`TrafficMonitor`] is consulted after recovery.

mod mapping;
mod poll;
mod recovery;
mod report;
mod runner;
mod state;

pub use mapping::{
    ConfigChange, ConfigInfo, ConfigKwargs, FeatureFailure, FeatureRequirements, Mapping, NumValues,
};
pub use poll::Poller;
pub use recovery::RecoveryPoint;
pub use report::{Outcome, Reason, RecoveryStatus, SkipCondition, TriggerReport};
pub use runner::TriggerRunner;
pub use state::{State, StateMachine, StepRecord};

use std::future::Future;

use async_trait::async_trait;

use crate::config::RecoveryMethod;
use crate::error::Result;
use crate::snapshot::Snapshot;

/// Learns the current state of one feature.
pub trait StateLearner: Send {
    /// Learn `feature`.
    ///
    /// Return [`SnapshotError::MissingData`](crate::error::SnapshotError::MissingData)
    /// when the device has no data for the feature at all; the engine
    /// treats that as an empty snapshot. Any other error is a learn failure
    /// and is retried.
    fn learn(&mut self, feature: &str) -> impl Future<Output = Result<Snapshot>> + Send;
}

/// Applies configuration changes.
pub trait Mutator: Send {
    /// Apply one change.
    fn apply(&mut self, change: &ConfigChange) -> impl Future<Output = Result<()>> + Send;
}

/// Saves and restores the device configuration.
pub trait Recoverer: Send {
    /// Save the current configuration.
    fn save(&mut self, method: RecoveryMethod) -> impl Future<Output = Result<()>> + Send;

    /// Restore the last saved configuration.
    fn restore(&mut self, method: RecoveryMethod) -> impl Future<Output = Result<()>> + Send;
}

/// Reports whether traffic is flowing again after recovery.
#[async_trait]
pub trait TrafficMonitor: Send + Sync {
    /// Check if all traffic streams are back to their reference rate.
    async fn traffic_resumed(&self) -> Result<bool>;
}
