//! In-memory device for running triggers without hardware.
//!
//! [`SimulatedDevice`] keeps one state tree per feature and implements all
//! three engine collaborators. Clones share the same state, so one device
//! can be handed to a [`TriggerRunner`](crate::engine::TriggerRunner) as
//! learner, mutator and recoverer at once.
//!
//! ```rust
//! use ferrigger::sim::SimulatedDevice;
//! use serde_json::json;
//!
//! let device = SimulatedDevice::new()
//!     .with_feature("interface", json!({"info": {"GigabitEthernet1/0/1": {"enabled": true}}}))
//!     .on_apply(|change, features| {
//!         let name = change.mandatory["name"].as_str().unwrap_or_default().to_string();
//!         if let Some(intf) = features
//!             .get_mut("interface")
//!             .and_then(|tree| tree.as_map_mut())
//!             .and_then(|tree| tree.get_mut("info"))
//!             .and_then(|info| info.as_map_mut())
//!             .and_then(|info| info.get_mut(&name))
//!             .and_then(|intf| intf.as_map_mut())
//!         {
//!             intf.insert("enabled".into(), false.into());
//!         }
//!         Ok(())
//!     });
//! assert!(device.feature("interface").is_some());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use indexmap::IndexMap;
use log::debug;

use crate::config::RecoveryMethod;
use crate::engine::{ConfigChange, Mutator, Recoverer, StateLearner, TrafficMonitor};
use crate::error::{Result, SnapshotError, TriggerError};
use crate::snapshot::{Snapshot, Value};

/// Feature trees of a simulated device, keyed by feature name.
pub type Features = IndexMap<String, Value>;

/// Hook run when a change is applied.
pub type ApplyFn = dyn Fn(&ConfigChange, &mut Features) -> Result<()> + Send + Sync;

/// Hook run after a restore.
pub type RestoreFn = dyn Fn(&mut Features) + Send + Sync;

#[derive(Default)]
struct DeviceState {
    features: Features,
    saved: Option<Features>,
    applied: Vec<ConfigChange>,
    on_apply: Option<Arc<ApplyFn>>,
    after_restore: Option<Arc<RestoreFn>>,
    fail_save: bool,
    failing_learns: u32,
    failing_applies: u32,
    failing_restores: u32,
    saves: u32,
    restores: u32,
    learns: u32,
}

/// A device whose state lives in memory.
#[derive(Clone, Default)]
pub struct SimulatedDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl SimulatedDevice {
    /// Create a device with no features.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add or replace a feature tree.
    pub fn with_feature(self, feature: impl Into<String>, tree: serde_json::Value) -> Self {
        self.set_feature(feature, tree);
        self
    }

    /// Add or replace a feature tree.
    pub fn set_feature(&self, feature: impl Into<String>, tree: serde_json::Value) {
        self.lock().features.insert(feature.into(), Value::from(tree));
    }

    /// Remove a feature; learning it then reports missing data.
    pub fn remove_feature(&self, feature: &str) {
        self.lock().features.shift_remove(feature);
    }

    /// Current tree of a feature.
    pub fn feature(&self, feature: &str) -> Option<Value> {
        self.lock().features.get(feature).cloned()
    }

    /// Set the hook that changes device state when a change is applied.
    pub fn on_apply<F>(self, hook: F) -> Self
    where
        F: Fn(&ConfigChange, &mut Features) -> Result<()> + Send + Sync + 'static,
    {
        self.lock().on_apply = Some(Arc::new(hook));
        self
    }

    /// Set a hook that runs after every successful restore.
    pub fn after_restore<F>(self, hook: F) -> Self
    where
        F: Fn(&mut Features) + Send + Sync + 'static,
    {
        self.lock().after_restore = Some(Arc::new(hook));
        self
    }

    /// Make every save fail.
    pub fn with_failing_save(self) -> Self {
        self.lock().fail_save = true;
        self
    }

    /// Make the next `n` learns fail.
    pub fn with_failing_learns(self, n: u32) -> Self {
        self.lock().failing_learns = n;
        self
    }

    /// Make the next `n` applies fail.
    pub fn with_failing_applies(self, n: u32) -> Self {
        self.lock().failing_applies = n;
        self
    }

    /// Make the next `n` restores fail.
    pub fn with_failing_restores(self, n: u32) -> Self {
        self.lock().failing_restores = n;
        self
    }

    /// Changes applied so far.
    pub fn applied(&self) -> Vec<ConfigChange> {
        self.lock().applied.clone()
    }

    /// Number of successful saves.
    pub fn saves(&self) -> u32 {
        self.lock().saves
    }

    /// Number of successful restores.
    pub fn restores(&self) -> u32 {
        self.lock().restores
    }

    /// Number of learn calls, failed ones included.
    pub fn learns(&self) -> u32 {
        self.lock().learns
    }
}

impl fmt::Debug for SimulatedDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("SimulatedDevice")
            .field("features", &state.features.keys().collect::<Vec<_>>())
            .field("saves", &state.saves)
            .field("restores", &state.restores)
            .field("applied", &state.applied.len())
            .finish()
    }
}

impl StateLearner for SimulatedDevice {
    async fn learn(&mut self, feature: &str) -> Result<Snapshot> {
        let mut state = self.lock();
        state.learns += 1;
        if state.failing_learns > 0 {
            state.failing_learns -= 1;
            return Err(TriggerError::Learn {
                feature: feature.to_string(),
                message: "simulated learn failure".to_string(),
            }
            .into());
        }
        match state.features.get(feature) {
            Some(tree) => Snapshot::from_value(feature, tree.clone()),
            None => Err(SnapshotError::MissingData {
                feature: feature.to_string(),
                path: String::new(),
            }
            .into()),
        }
    }
}

impl Mutator for SimulatedDevice {
    async fn apply(&mut self, change: &ConfigChange) -> Result<()> {
        let mut state = self.lock();
        if state.failing_applies > 0 {
            state.failing_applies -= 1;
            return Err(TriggerError::Mutation {
                message: format!("simulated failure applying {} change", change.feature),
            }
            .into());
        }
        if let Some(hook) = state.on_apply.clone() {
            hook(change, &mut state.features)?;
        }
        debug!("Simulated device applied {} change for {}", change.feature, change.bindings);
        state.applied.push(change.clone());
        Ok(())
    }
}

impl Recoverer for SimulatedDevice {
    async fn save(&mut self, method: RecoveryMethod) -> Result<()> {
        let mut state = self.lock();
        if state.fail_save {
            return Err(TriggerError::Recovery {
                message: format!("simulated {:?} save failure", method),
            }
            .into());
        }
        let saved = state.features.clone();
        state.saved = Some(saved);
        state.saves += 1;
        Ok(())
    }

    async fn restore(&mut self, method: RecoveryMethod) -> Result<()> {
        let mut state = self.lock();
        if state.failing_restores > 0 {
            state.failing_restores -= 1;
            return Err(TriggerError::Recovery {
                message: format!("simulated {:?} restore failure", method),
            }
            .into());
        }
        let Some(saved) = state.saved.clone() else {
            return Err(TriggerError::Recovery {
                message: "nothing saved".to_string(),
            }
            .into());
        };
        state.features = saved;
        if let Some(hook) = state.after_restore.clone() {
            hook(&mut state.features);
        }
        state.restores += 1;
        Ok(())
    }
}

/// Traffic that resumes after a number of checks.
#[derive(Debug)]
pub struct SimulatedTraffic {
    checks: AtomicU32,
    resume_after: u32,
    broken: AtomicBool,
}

impl SimulatedTraffic {
    /// Traffic that is back on the first check.
    pub fn flowing() -> Self {
        Self::resuming_after(0)
    }

    /// Traffic that is back after `n` failed checks.
    pub fn resuming_after(n: u32) -> Self {
        Self {
            checks: AtomicU32::new(0),
            resume_after: n,
            broken: AtomicBool::new(false),
        }
    }

    /// Traffic that never comes back.
    pub fn stopped() -> Self {
        let traffic = Self::flowing();
        traffic.broken.store(true, Ordering::SeqCst);
        traffic
    }

    /// Number of checks so far.
    pub fn checks(&self) -> u32 {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrafficMonitor for SimulatedTraffic {
    async fn traffic_resumed(&self) -> Result<bool> {
        let seen = self.checks.fetch_add(1, Ordering::SeqCst);
        Ok(!self.broken.load(Ordering::SeqCst) && seen >= self.resume_after)
    }
}
