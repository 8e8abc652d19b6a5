//! Outcome of a trigger run.

use std::fmt;
use std::time::Duration;

use indexmap::IndexMap;

use crate::path::{CaptureBindings, Unsatisfied};
use crate::snapshot::{Difference, SnapshotStore};

use super::mapping::FeatureFailure;
use super::state::{State, StepRecord};

/// Why a run did not pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Reason {
    /// A requirement found data but not the expected value or shape.
    UnsatisfiedRequirement {
        feature: String,
        requirement: String,
        detail: Unsatisfied,
    },

    /// A requirement needed data the snapshot does not contain.
    MissingSnapshotData {
        feature: String,
        requirement: Option<String>,
        path: String,
    },

    /// A polled step used up its budget.
    TimeoutExceeded {
        state: State,
        max_time: Duration,
        attempts: u32,
        last: Option<Box<Reason>>,
    },

    /// The configuration-mutation collaborator failed.
    MutationFailure { state: State, message: String },

    /// The state learner failed for a reason other than missing data.
    LearnFailure { feature: String, message: String },

    /// Restoring the saved configuration failed.
    RecoveryFailure { message: String },
}

impl From<FeatureFailure> for Reason {
    fn from(failure: FeatureFailure) -> Self {
        let FeatureFailure { feature, failure } = failure;
        match failure.reason {
            Unsatisfied::Missing { path } => Reason::MissingSnapshotData {
                feature,
                requirement: Some(failure.requirement),
                path,
            },
            detail => Reason::UnsatisfiedRequirement {
                feature,
                requirement: failure.requirement,
                detail,
            },
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::UnsatisfiedRequirement {
                feature,
                requirement,
                detail,
            } => write!(f, "[{}] {} not satisfied: {}", feature, requirement, detail),
            Reason::MissingSnapshotData {
                feature,
                requirement,
                path,
            } => {
                write!(f, "[{}] missing data at {}", feature, path)?;
                if let Some(requirement) = requirement {
                    write!(f, " for {}", requirement)?;
                }
                Ok(())
            }
            Reason::TimeoutExceeded {
                state,
                max_time,
                attempts,
                last,
            } => {
                write!(
                    f,
                    "{} timed out after {:?} ({} attempt(s))",
                    state, max_time, attempts
                )?;
                if let Some(last) = last {
                    write!(f, ": {}", last)?;
                }
                Ok(())
            }
            Reason::MutationFailure { state, message } => {
                write!(f, "{}: mutation failed: {}", state, message)
            }
            Reason::LearnFailure { feature, message } => {
                write!(f, "learning '{}' failed: {}", feature, message)
            }
            Reason::RecoveryFailure { message } => write!(f, "recovery failed: {}", message),
        }
    }
}

/// A clean skip: the device had nothing this trigger can act on.
#[derive(Debug, Clone, PartialEq)]
pub struct SkipCondition {
    /// What was missing.
    pub message: String,

    /// The requirement failure behind the skip, if any.
    pub cause: Option<Reason>,
}

impl fmt::Display for SkipCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, " ({})", cause)?;
        }
        Ok(())
    }
}

/// Final verdict of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Passed,
    Failed(Reason),
    Skipped(SkipCondition),
    Errored(Reason),
}

impl Outcome {
    /// Short verdict: `PASS`, `FAIL`, `SKIP` or `ERRORED`.
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Passed => "PASS",
            Outcome::Failed(_) => "FAIL",
            Outcome::Skipped(_) => "SKIP",
            Outcome::Errored(_) => "ERRORED",
        }
    }

    /// The failure or error reason.
    pub fn reason(&self) -> Option<&Reason> {
        match self {
            Outcome::Failed(reason) | Outcome::Errored(reason) => Some(reason),
            Outcome::Passed | Outcome::Skipped(_) => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Passed => write!(f, "PASS"),
            Outcome::Failed(reason) => write!(f, "FAIL: {}", reason),
            Outcome::Skipped(skip) => write!(f, "SKIP: {}", skip),
            Outcome::Errored(reason) => write!(f, "ERRORED: {}", reason),
        }
    }
}

/// What happened during recovery.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecoveryStatus {
    /// Set when restoring the saved configuration failed.
    pub restore_error: Option<String>,

    /// Differences between the first and the post-recovery snapshots, per
    /// feature. Empty when the device came back as it was.
    pub differences: IndexMap<String, Vec<Difference>>,

    /// Set when the post-recovery learn failed.
    pub compare_error: Option<String>,

    /// Traffic check result; `None` when no monitor is attached.
    pub traffic_resumed: Option<bool>,
}

impl RecoveryStatus {
    /// Check if the device came back to its original state.
    pub fn is_clean(&self) -> bool {
        self.restore_error.is_none()
            && self.compare_error.is_none()
            && self.differences.values().all(Vec::is_empty)
            && self.traffic_resumed != Some(false)
    }
}

/// Everything recorded about one trigger run.
#[derive(Debug, Clone)]
pub struct TriggerReport {
    /// Trigger name.
    pub trigger: String,

    /// Final verdict.
    pub outcome: Outcome,

    /// Binding sets the change was applied for.
    pub bindings: Vec<CaptureBindings>,

    /// States visited, with poll attempts.
    pub history: Vec<StepRecord>,

    /// Every snapshot learned during the run.
    pub snapshots: SnapshotStore,

    /// Recovery details; `None` when nothing was changed on the device.
    pub recovery: Option<RecoveryStatus>,

    /// Wall time of the run.
    pub elapsed: Duration,
}

impl TriggerReport {
    /// Check if the run passed.
    pub fn is_passed(&self) -> bool {
        matches!(self.outcome, Outcome::Passed)
    }

    /// Check if a state was entered during the run.
    pub fn visited(&self, state: State) -> bool {
        self.history.iter().any(|r| r.state == state)
    }

    /// Poll attempts made across every visit to `state`.
    pub fn attempts(&self, state: State) -> u32 {
        self.history
            .iter()
            .filter(|r| r.state == state)
            .map(|r| r.attempts)
            .sum()
    }
}

impl fmt::Display for TriggerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {}", self.trigger, self.outcome)?;
        for bindings in &self.bindings {
            writeln!(f, "  selected: {}", bindings)?;
        }
        let path: Vec<&str> = self.history.iter().map(|r| r.state.name()).collect();
        writeln!(f, "  states: {}", path.join(" -> "))?;
        if let Some(recovery) = &self.recovery {
            if let Some(err) = &recovery.restore_error {
                writeln!(f, "  restore failed: {}", err)?;
            }
            for (feature, diffs) in &recovery.differences {
                for diff in diffs {
                    writeln!(f, "  [{}] {}", feature, diff)?;
                }
            }
        }
        write!(f, "  elapsed: {:?}", self.elapsed)
    }
}
