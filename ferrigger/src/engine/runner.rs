//! Drives one trigger through its states.

use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, info, warn};
use tokio::time::Instant;

use crate::config::TriggerDatafile;
use crate::error::{Error, Result, SnapshotError};
use crate::path::CaptureBindings;
use crate::snapshot::{diff, Difference, Snapshot, SnapshotStore, Stage};
use crate::triggers::TriggerDefinition;

use super::mapping::Mapping;
use super::poll::Poller;
use super::recovery::RecoveryPoint;
use super::report::{Outcome, Reason, RecoveryStatus, SkipCondition, TriggerReport};
use super::state::{State, StateMachine};
use super::{Mutator, Recoverer, StateLearner, TrafficMonitor};

/// Runs triggers against a learner, a mutator and a recoverer.
///
/// # Example
///
/// ```rust,no_run
/// use ferrigger::config::TriggerDatafile;
/// use ferrigger::engine::TriggerRunner;
/// use ferrigger::sim::SimulatedDevice;
/// use ferrigger::triggers::TriggerRegistry;
///
/// # async fn example() -> Result<(), ferrigger::Error> {
/// let device = SimulatedDevice::new();
/// let trigger = TriggerRegistry::lookup("iosxe", "TriggerUnconfigConfigEthernetInterface")?;
///
/// let mut runner = TriggerRunner::new(device.clone(), device.clone(), device);
/// let report = runner.run(&trigger, &TriggerDatafile::default()).await?;
/// println!("{}", report);
/// # Ok(())
/// # }
/// ```
pub struct TriggerRunner<L, M, R> {
    learner: L,
    mutator: M,
    recoverer: R,
    traffic: Option<Arc<dyn TrafficMonitor>>,
}

impl<L, M, R> TriggerRunner<L, M, R>
where
    L: StateLearner,
    M: Mutator,
    R: Recoverer,
{
    /// Create a runner.
    pub fn new(learner: L, mutator: M, recoverer: R) -> Self {
        Self {
            learner,
            mutator,
            recoverer,
            traffic: None,
        }
    }

    /// Check traffic after recovery.
    pub fn with_traffic_monitor(mut self, monitor: Arc<dyn TrafficMonitor>) -> Self {
        self.traffic = Some(monitor);
        self
    }

    /// The state learner.
    pub fn learner(&self) -> &L {
        &self.learner
    }

    /// The mutator.
    pub fn mutator(&self) -> &M {
        &self.mutator
    }

    /// The recoverer.
    pub fn recoverer(&self) -> &R {
        &self.recoverer
    }

    /// Take the collaborators back.
    pub fn into_parts(self) -> (L, M, R) {
        (self.learner, self.mutator, self.recoverer)
    }

    /// Run a registered trigger.
    pub async fn run(
        &mut self,
        trigger: &TriggerDefinition,
        datafile: &TriggerDatafile,
    ) -> Result<TriggerReport> {
        self.run_mapping(&trigger.name, &trigger.mapping, datafile)
            .await
    }

    /// Run a mapping under a trigger name.
    ///
    /// Returns `Err` only for an invalid mapping or datafile. Everything
    /// that goes wrong on the device ends up in the report's outcome.
    pub async fn run_mapping(
        &mut self,
        name: &str,
        mapping: &Mapping,
        datafile: &TriggerDatafile,
    ) -> Result<TriggerReport> {
        mapping.validate(name)?;
        datafile.validate()?;
        let statics = datafile.static_overrides()?;
        let mut run = Run::new(name);

        // =====================================================================
        // LEARN_BEFORE
        // =====================================================================

        run.machine.transition(State::LearnBefore)?;
        let features = mapping.learned_features();
        let mut poller = Poller::new(&datafile.timeout);
        let resolved = loop {
            poller.begin_attempt();
            run.machine.attempt();
            let attempt =
                match learn_all(&mut self.learner, &features, Stage::Before, &mut run.store).await {
                    Ok(()) => mapping.resolve(&run.store).map_err(Reason::from),
                    Err(reason) => Err(reason),
                };
            match attempt {
                Ok(candidates) => break Ok(candidates),
                Err(reason) => {
                    debug!("{}: LEARN_BEFORE attempt {}: {}", name, poller.attempts(), reason);
                    if !poller.wait().await {
                        break Err(reason);
                    }
                }
            }
        };

        let candidates = match resolved {
            Ok(candidates) => candidates,
            Err(reason @ Reason::LearnFailure { .. }) => {
                run.machine.transition(State::Done)?;
                let reason = Reason::TimeoutExceeded {
                    state: State::LearnBefore,
                    max_time: poller.max_time(),
                    attempts: poller.attempts(),
                    last: Some(Box::new(reason)),
                };
                return Ok(run.finish(Outcome::Errored(reason)));
            }
            Err(reason) => {
                return run.skip(SkipCondition {
                    message: "no learned entity satisfies the requirements".to_string(),
                    cause: Some(reason),
                });
            }
        };

        run.selected = mapping.select(&candidates, &statics);
        if run.selected.is_empty() {
            return run.skip(SkipCondition {
                message: format!(
                    "none of the {} candidate(s) matches the static overrides",
                    candidates.len()
                ),
                cause: None,
            });
        }
        for bindings in &run.selected {
            info!("{}: selected {}", name, bindings);
        }

        // =====================================================================
        // PROCEED: save the recovery point
        // =====================================================================

        run.machine.transition(State::Proceed)?;
        let mut point = match RecoveryPoint::save(&mut self.recoverer, datafile.timeout.method).await {
            Ok(point) => point,
            Err(e) => {
                run.machine.transition(State::Done)?;
                return Ok(run.finish(Outcome::Errored(Reason::RecoveryFailure {
                    message: format!("could not save configuration: {}", e),
                })));
            }
        };

        // =====================================================================
        // APPLY_CHANGE
        // =====================================================================

        run.machine.transition(State::ApplyChange)?;
        let changes = mapping.changes(&run.selected);
        let mut poller = Poller::new(&datafile.timeout);
        let mut applied = Ok(());
        'changes: for change in &changes {
            loop {
                poller.begin_attempt();
                run.machine.attempt();
                match self.mutator.apply(change).await {
                    Ok(()) => {
                        debug!("{}: applied {} change for {}", name, change.feature, change.bindings);
                        break;
                    }
                    Err(e) => {
                        warn!("{}: applying {} change failed: {}", name, change.feature, e);
                        if !poller.wait().await {
                            applied = Err(Reason::MutationFailure {
                                state: State::ApplyChange,
                                message: e.to_string(),
                            });
                            break 'changes;
                        }
                    }
                }
            }
        }

        // =====================================================================
        // LEARN_AFTER / VERIFY
        // =====================================================================

        let mut outcome = match applied {
            Err(reason) => {
                run.machine.transition(State::Recover)?;
                Outcome::Errored(reason)
            }
            Ok(()) => {
                run.machine.transition(State::LearnAfter)?;
                let verified = mapping.verified_features();
                let mut poller = Poller::new(&datafile.timeout);
                loop {
                    poller.begin_attempt();
                    run.machine.attempt();
                    if let Err(reason) =
                        learn_all(&mut self.learner, &verified, Stage::After, &mut run.store).await
                    {
                        debug!("{}: LEARN_AFTER attempt {}: {}", name, poller.attempts(), reason);
                        if poller.wait().await {
                            continue;
                        }
                        run.machine.transition(State::Recover)?;
                        break Outcome::Errored(Reason::TimeoutExceeded {
                            state: State::LearnAfter,
                            max_time: poller.max_time(),
                            attempts: poller.attempts(),
                            last: Some(Box::new(reason)),
                        });
                    }

                    run.machine.transition(State::Verify)?;
                    match mapping.verify(&run.store, &run.selected) {
                        Ok(()) => {
                            run.machine.transition(State::Pass)?;
                            run.machine.transition(State::Recover)?;
                            break Outcome::Passed;
                        }
                        Err(failure) => {
                            let reason = Reason::from(failure);
                            debug!("{}: VERIFY attempt {}: {}", name, poller.attempts(), reason);
                            if poller.wait().await {
                                run.machine.transition(State::LearnAfter)?;
                                continue;
                            }
                            run.machine.transition(State::Fail)?;
                            run.machine.transition(State::Recover)?;
                            break Outcome::Failed(reason);
                        }
                    }
                }
            }
        };

        // =====================================================================
        // RECOVER
        // =====================================================================

        let mut status = RecoveryStatus::default();
        let mut poller = Poller::new(&datafile.timeout_recovery);
        loop {
            poller.begin_attempt();
            run.machine.attempt();
            match point.restore().await {
                Ok(()) => break,
                Err(e) => {
                    warn!("{}: restore attempt {} failed: {}", name, poller.attempts(), e);
                    if !poller.wait().await {
                        status.restore_error = Some(e.to_string());
                        break;
                    }
                }
            }
        }
        drop(point);

        let mut poller = Poller::new(&datafile.timeout_recovery);
        loop {
            poller.begin_attempt();
            run.machine.attempt();
            match learn_all(&mut self.learner, &features, Stage::Recovered, &mut run.store).await {
                Ok(()) => {
                    status.compare_error = None;
                    status.differences = compare_recovered(mapping, &run.store, &features);
                    if status.differences.is_empty() {
                        break;
                    }
                }
                Err(reason) => status.compare_error = Some(reason.to_string()),
            }
            if !poller.wait().await {
                break;
            }
        }
        for (feature, diffs) in &status.differences {
            for diff in diffs {
                warn!("{}: [{}] not recovered: {}", name, feature, diff);
            }
        }

        if let Some(message) = &status.restore_error {
            if outcome == Outcome::Passed {
                outcome = Outcome::Errored(Reason::RecoveryFailure {
                    message: message.clone(),
                });
            }
        }

        if let Some(monitor) = &self.traffic {
            let mut poller = Poller::new(&datafile.traffic_timeout());
            let resumed = loop {
                poller.begin_attempt();
                match monitor.traffic_resumed().await {
                    Ok(true) => break true,
                    Ok(false) => debug!("{}: traffic not resumed yet", name),
                    Err(e) => warn!("{}: traffic check failed: {}", name, e),
                }
                if !poller.wait().await {
                    break false;
                }
            };
            status.traffic_resumed = Some(resumed);
            if !resumed && outcome == Outcome::Passed {
                outcome = Outcome::Failed(Reason::TimeoutExceeded {
                    state: State::Recover,
                    max_time: poller.max_time(),
                    attempts: poller.attempts(),
                    last: None,
                });
            }
        }

        run.machine.transition(State::Done)?;
        run.recovery = Some(status);
        Ok(run.finish(outcome))
    }
}

/// Mutable state of one run.
struct Run {
    name: String,
    machine: StateMachine,
    store: SnapshotStore,
    selected: Vec<CaptureBindings>,
    recovery: Option<RecoveryStatus>,
    started: Instant,
}

impl Run {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            machine: StateMachine::new(name),
            store: SnapshotStore::new(),
            selected: Vec::new(),
            recovery: None,
            started: Instant::now(),
        }
    }

    fn skip(mut self, condition: SkipCondition) -> Result<TriggerReport> {
        self.machine.transition(State::Skip)?;
        self.machine.transition(State::Done)?;
        Ok(self.finish(Outcome::Skipped(condition)))
    }

    fn finish(self, outcome: Outcome) -> TriggerReport {
        info!("{}: {}", self.name, outcome);
        TriggerReport {
            trigger: self.name,
            outcome,
            bindings: self.selected,
            history: self.machine.into_history(),
            snapshots: self.store,
            recovery: self.recovery,
            elapsed: self.started.elapsed(),
        }
    }
}

/// Learn every feature into `store`. A learner reporting missing data
/// records an empty snapshot.
async fn learn_all<L: StateLearner>(
    learner: &mut L,
    features: &[String],
    stage: Stage,
    store: &mut SnapshotStore,
) -> std::result::Result<(), Reason> {
    for feature in features {
        match learner.learn(feature).await {
            Ok(snapshot) => store.record(stage, snapshot),
            Err(Error::Snapshot(SnapshotError::MissingData { .. })) => {
                debug!("No data for '{}' ({})", feature, stage);
                store.record(stage, Snapshot::empty(feature.as_str()));
            }
            Err(e) => {
                return Err(Reason::LearnFailure {
                    feature: feature.clone(),
                    message: e.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Differences between the first and the post-recovery snapshots, for the
/// features that have any.
fn compare_recovered(
    mapping: &Mapping,
    store: &SnapshotStore,
    features: &[String],
) -> IndexMap<String, Vec<Difference>> {
    let unbound = CaptureBindings::new();
    let mut out = IndexMap::new();
    for feature in features {
        let (Some(before), Some(after)) = (
            store.get(Stage::Before, feature),
            store.get(Stage::Recovered, feature),
        ) else {
            continue;
        };
        let exclude = mapping.comparison_exclusions(feature);
        let diffs = diff::compare(before.tree(), after.tree(), |key| {
            exclude.is_excluded(key, &unbound)
        });
        if !diffs.is_empty() {
            out.insert(feature.clone(), diffs);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;

    use crate::config::Timeout;
    use crate::engine::{ConfigChange, ConfigInfo, FeatureRequirements};
    use crate::error::TriggerError;
    use crate::sim::{Features, SimulatedDevice, SimulatedTraffic};
    use crate::snapshot::Value;
    use crate::steps;
    use crate::triggers::TriggerRegistry;

    fn mapping() -> Mapping {
        Mapping::new()
            .with_requirements(
                "interface",
                FeatureRequirements::new([
                    steps!["info", r"(?P<interface>Ethernet\d+)", "enabled", true],
                    steps!["info", "(?P<interface>.*)", "oper_status", "up"],
                ])
                .unwrap()
                .with_exclude(["in_pkts"])
                .unwrap(),
            )
            .with_config(
                "interface",
                ConfigInfo::new().with_mandatory("name", "(?P<interface>.*)"),
            )
            .with_verify(
                "interface",
                FeatureRequirements::new([
                    steps!["info", "(?P<interface>.*)", "enabled", false],
                    steps!["info", "(?P<interface>.*)", "oper_status", "(.*down.*)"],
                ])
                .unwrap(),
            )
            .with_num_values("interface", 1)
    }

    fn interfaces() -> serde_json::Value {
        json!({"info": {
            "Ethernet1": {"enabled": true, "oper_status": "up", "mtu": 1500, "in_pkts": 10},
            "Ethernet2": {"enabled": true, "oper_status": "up", "mtu": 9000, "in_pkts": 20},
            "Loopback0": {"enabled": true, "oper_status": "up"},
        }})
    }

    fn interface<'a>(features: &'a mut Features, name: &str) -> Option<&'a mut indexmap::IndexMap<String, Value>> {
        features
            .get_mut("interface")
            .and_then(Value::as_map_mut)
            .and_then(|tree| tree.get_mut("info"))
            .and_then(Value::as_map_mut)
            .and_then(|info| info.get_mut(name))
            .and_then(Value::as_map_mut)
    }

    fn shut(change: &ConfigChange, features: &mut Features) -> Result<()> {
        let name = change
            .mandatory
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let intf = interface(features, &name).ok_or_else(|| TriggerError::Mutation {
            message: format!("no interface {}", name),
        })?;
        intf.insert("enabled".into(), Value::Bool(false));
        intf.insert("oper_status".into(), Value::from("administratively down"));
        Ok(())
    }

    fn device() -> SimulatedDevice {
        SimulatedDevice::new()
            .with_feature("interface", interfaces())
            .on_apply(shut)
    }

    fn datafile() -> TriggerDatafile {
        let budget = Timeout::new(Duration::from_secs(30), Duration::from_secs(10));
        TriggerDatafile::default()
            .with_timeout(budget)
            .with_timeout_recovery(budget)
    }

    async fn run_with(device: &SimulatedDevice, mapping: &Mapping, datafile: &TriggerDatafile) -> TriggerReport {
        let mut runner = TriggerRunner::new(device.clone(), device.clone(), device.clone());
        runner
            .run_mapping("TriggerShutEthernet", mapping, datafile)
            .await
            .unwrap()
    }

    async fn run(device: &SimulatedDevice) -> TriggerReport {
        run_with(device, &mapping(), &datafile()).await
    }

    fn states(report: &TriggerReport) -> Vec<State> {
        report.history.iter().map(|r| r.state).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_pass() {
        let device = device();
        let report = run(&device).await;

        assert_eq!(report.outcome, Outcome::Passed);
        assert_eq!(report.bindings.len(), 1);
        assert_eq!(report.bindings[0].get("interface"), Some("Ethernet1"));
        assert_eq!(
            states(&report),
            vec![
                State::Init,
                State::LearnBefore,
                State::Proceed,
                State::ApplyChange,
                State::LearnAfter,
                State::Verify,
                State::Pass,
                State::Recover,
                State::Done,
            ]
        );
        assert_eq!(report.attempts(State::LearnBefore), 1);

        let applied = device.applied();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].mandatory["name"], Value::from("Ethernet1"));
        assert_eq!(device.saves(), 1);
        assert_eq!(device.restores(), 1);

        let recovery = report.recovery.as_ref().unwrap();
        assert!(recovery.is_clean());
        assert!(report.snapshots.get(Stage::After, "interface").is_some());
        assert!(report.snapshots.get(Stage::Recovered, "interface").is_some());
        assert_eq!(device.feature("interface"), Some(Value::from(interfaces())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_when_nothing_qualifies() {
        let device = SimulatedDevice::new().with_feature(
            "interface",
            json!({"info": {"Ethernet1": {"enabled": false, "oper_status": "down"}}}),
        );
        let report = run(&device).await;

        let Outcome::Skipped(condition) = &report.outcome else {
            panic!("expected a skip, got {}", report.outcome);
        };
        assert!(matches!(
            condition.cause,
            Some(Reason::UnsatisfiedRequirement { .. })
        ));
        assert!(report.visited(State::Skip));
        assert!(!report.visited(State::Recover));
        assert!(report.recovery.is_none());
        assert_eq!(report.attempts(State::LearnBefore), 4);
        assert_eq!(device.saves(), 0);
        assert_eq!(device.restores(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_on_missing_feature() {
        let device = SimulatedDevice::new();
        let report = run(&device).await;

        let Outcome::Skipped(condition) = &report.outcome else {
            panic!("expected a skip, got {}", report.outcome);
        };
        assert!(matches!(
            condition.cause,
            Some(Reason::MissingSnapshotData { .. })
        ));
        assert!(report.snapshots.get(Stage::Before, "interface").unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_verify_failure_still_recovers() {
        let device = device().on_apply(|_, _| Ok(()));
        let report = run(&device).await;

        let Outcome::Failed(Reason::UnsatisfiedRequirement { feature, requirement, .. }) = &report.outcome else {
            panic!("expected a verification failure, got {}", report.outcome);
        };
        assert_eq!(feature, "interface");
        assert!(requirement.contains("enabled"));
        assert!(report.visited(State::Fail));
        assert!(report.visited(State::Recover));
        assert_eq!(report.attempts(State::LearnAfter), 4);
        assert_eq!(device.restores(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_data_after_change() {
        let device = device().on_apply(|change, features| {
            shut(change, features)?;
            if let Some(intf) = interface(features, "Ethernet1") {
                intf.shift_remove("oper_status");
            }
            Ok(())
        });
        let report = run(&device).await;

        assert!(matches!(
            report.outcome,
            Outcome::Failed(Reason::MissingSnapshotData { .. })
        ));
        assert_eq!(device.restores(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_learn_failure_before_change() {
        let device = device().with_failing_learns(100);
        let report = run(&device).await;

        let Outcome::Errored(Reason::TimeoutExceeded { state, attempts, last, .. }) = &report.outcome else {
            panic!("expected a timeout, got {}", report.outcome);
        };
        assert_eq!(*state, State::LearnBefore);
        assert_eq!(*attempts, 4);
        assert!(matches!(last.as_deref(), Some(Reason::LearnFailure { .. })));
        assert_eq!(device.saves(), 0);
        assert!(!report.visited(State::Recover));
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_failure_applies_nothing() {
        let device = device().with_failing_save();
        let report = run(&device).await;

        assert!(matches!(
            report.outcome,
            Outcome::Errored(Reason::RecoveryFailure { .. })
        ));
        assert!(!report.visited(State::ApplyChange));
        assert!(device.applied().is_empty());
        assert_eq!(device.restores(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_failure_recovers() {
        let device = device().with_failing_applies(100);
        let report = run(&device).await;

        assert!(matches!(
            report.outcome,
            Outcome::Errored(Reason::MutationFailure {
                state: State::ApplyChange,
                ..
            })
        ));
        assert!(!report.visited(State::LearnAfter));
        assert!(report.visited(State::Recover));
        assert_eq!(device.restores(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_is_retried() {
        let device = device().with_failing_applies(1);
        let report = run(&device).await;

        assert_eq!(report.outcome, Outcome::Passed);
        assert_eq!(report.attempts(State::ApplyChange), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_failure_turns_pass_into_error() {
        let device = device().with_failing_restores(100);
        let report = run(&device).await;

        assert!(matches!(
            report.outcome,
            Outcome::Errored(Reason::RecoveryFailure { .. })
        ));
        let recovery = report.recovery.as_ref().unwrap();
        assert!(recovery.restore_error.is_some());
        assert!(!recovery.differences["interface"].is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_drift_is_reported() {
        let device = device().after_restore(|features| {
            if let Some(intf) = interface(features, "Ethernet2") {
                intf.insert("mtu".into(), Value::Int(1400));
            }
        });
        let report = run(&device).await;

        assert_eq!(report.outcome, Outcome::Passed);
        let recovery = report.recovery.as_ref().unwrap();
        assert!(!recovery.is_clean());
        let diffs = &recovery.differences["interface"];
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].path, vec!["info", "Ethernet2", "mtu"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_ignores_excluded_keys() {
        let device = device().after_restore(|features| {
            if let Some(intf) = interface(features, "Ethernet2") {
                intf.insert("in_pkts".into(), Value::Int(99));
            }
        });
        let report = run(&device).await;

        assert!(report.recovery.as_ref().unwrap().is_clean());
    }

    #[tokio::test(start_paused = true)]
    async fn test_traffic_resumes() {
        let device = device();
        let traffic = Arc::new(SimulatedTraffic::resuming_after(2));
        let mut runner = TriggerRunner::new(device.clone(), device.clone(), device.clone())
            .with_traffic_monitor(traffic.clone());
        let report = runner
            .run_mapping("TriggerShutEthernet", &mapping(), &datafile())
            .await
            .unwrap();

        assert_eq!(report.outcome, Outcome::Passed);
        assert_eq!(report.recovery.as_ref().unwrap().traffic_resumed, Some(true));
        assert_eq!(traffic.checks(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_traffic_never_resumes() {
        let device = device();
        let mut runner = TriggerRunner::new(device.clone(), device.clone(), device.clone())
            .with_traffic_monitor(Arc::new(SimulatedTraffic::stopped()));
        let report = runner
            .run_mapping("TriggerShutEthernet", &mapping(), &datafile())
            .await
            .unwrap();

        assert!(matches!(
            report.outcome,
            Outcome::Failed(Reason::TimeoutExceeded {
                state: State::Recover,
                ..
            })
        ));
        assert_eq!(report.recovery.as_ref().unwrap().traffic_resumed, Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn test_static_override() {
        let device = device();
        let report = run_with(&device, &mapping(), &datafile().with_static("interface", "Ethernet2")).await;
        assert_eq!(report.outcome, Outcome::Passed);
        assert_eq!(report.bindings[0].get("interface"), Some("Ethernet2"));

        let report = run_with(&device, &mapping(), &datafile().with_static("interface", "Ethernet9")).await;
        let Outcome::Skipped(condition) = &report.outcome else {
            panic!("expected a skip, got {}", report.outcome);
        };
        assert!(condition.cause.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_mapping_is_an_error() {
        let device = device();
        let mut runner = TriggerRunner::new(device.clone(), device.clone(), device);
        let err = runner
            .run_mapping("empty", &Mapping::new(), &datafile())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Trigger(TriggerError::NoRequirements { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_an_error() {
        let device = device();
        let mut runner = TriggerRunner::new(device.clone(), device.clone(), device.clone());
        let datafile = datafile().with_timeout(Timeout::new(Duration::from_secs(30), Duration::ZERO));

        let err = runner.run_mapping("t", &mapping(), &datafile).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Config(crate::error::ConfigError::InvalidTimeout { .. })
        ));
        assert!(device.applied().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_builtin_subinterface_trigger() {
        let device = SimulatedDevice::new()
            .with_feature(
                "interface",
                json!({"info": {
                    "GigabitEthernet1/0/1": {"enabled": true, "oper_status": "up"},
                    "GigabitEthernet1/0/1.10": {"enabled": true, "oper_status": "up", "in_octets": 5},
                }}),
            )
            .on_apply(shut);
        let trigger =
            TriggerRegistry::lookup("iosxe", "TriggerUnconfigConfigEthernetSubInterface").unwrap();

        let mut runner = TriggerRunner::new(device.clone(), device.clone(), device.clone());
        let report = runner.run(&trigger, &datafile()).await.unwrap();

        assert!(report.is_passed(), "{}", report);
        assert_eq!(report.bindings[0].get("interface"), Some("GigabitEthernet1/0/1.10"));
        assert_eq!(device.applied()[0].mandatory["attach"], Value::Bool(false));
    }
}
