//! Requirements and sets of requirements joined on shared captures.

use std::fmt;

use indexmap::IndexSet;
use log::debug;

use crate::error::PathError;
use crate::snapshot::{ExclusionSet, Value};

use super::matcher::{evaluate, Evaluation, FailureRank, Unsatisfied};
use super::spec::{PathSpec, Step, Terminal};
use super::CaptureBindings;

/// A compiled path specification together with the steps it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Requirement {
    spec: PathSpec,
    steps: Vec<Step>,
}

impl Requirement {
    /// Compile a requirement from its steps.
    pub fn new(steps: Vec<Step>) -> Result<Self, PathError> {
        let spec = PathSpec::from_steps(&steps)?;
        Ok(Self { spec, steps })
    }

    /// The compiled specification.
    pub fn spec(&self) -> &PathSpec {
        &self.spec
    }

    /// The steps as written.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Check if this requirement ends in the `(.*)` wildcard.
    ///
    /// After a change such a requirement only marks a subtree that is
    /// allowed to differ; it never fails on its own.
    pub fn is_wildcard(&self) -> bool {
        matches!(self.spec.terminal(), Terminal::Any)
    }

    /// Evaluate against a tree.
    pub fn evaluate<'s>(
        &self,
        root: &'s Value,
        bindings: &CaptureBindings,
        exclude: &ExclusionSet,
    ) -> Evaluation<'s> {
        evaluate(&self.spec, root, bindings, exclude)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spec)
    }
}

/// The requirement that failed and why.
#[derive(Debug, Clone, PartialEq)]
pub struct RequirementFailure {
    /// The failing requirement, rendered.
    pub requirement: String,

    /// Why it failed.
    pub reason: Unsatisfied,
}

impl fmt::Display for RequirementFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.requirement, self.reason)
    }
}

/// Ordered requirements on one feature.
///
/// Requirements that share a capture name must agree on its value: the
/// set is resolved as a join, one requirement at a time, each evaluated
/// under the bindings produced by the ones before it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequirementSet {
    requirements: Vec<Requirement>,
}

impl RequirementSet {
    /// Compile a list of step lists.
    pub fn from_steps<I>(steps: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = Vec<Step>>,
    {
        let requirements = steps
            .into_iter()
            .map(Requirement::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { requirements })
    }

    /// The requirements in order.
    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// Number of requirements.
    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    /// Check if there are no requirements.
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Every capture name used, first occurrence first.
    pub fn captures(&self) -> Vec<&str> {
        let mut names: IndexSet<&str> = IndexSet::new();
        for requirement in &self.requirements {
            names.extend(requirement.spec().captures());
        }
        names.into_iter().collect()
    }

    /// Find every binding set under which all requirements hold.
    ///
    /// Starts from `seeds` (a single empty binding set when `seeds` is
    /// empty). The result keeps tree traversal order and holds no
    /// duplicates. When nothing survives a requirement, that requirement
    /// and its most informative failure are returned.
    pub fn resolve(
        &self,
        root: &Value,
        exclude: &ExclusionSet,
        seeds: &IndexSet<CaptureBindings>,
    ) -> Result<IndexSet<CaptureBindings>, RequirementFailure> {
        let mut current = if seeds.is_empty() {
            IndexSet::from([CaptureBindings::new()])
        } else {
            seeds.clone()
        };

        for requirement in &self.requirements {
            let mut next = IndexSet::new();
            let mut failure: Option<(Option<FailureRank>, Unsatisfied)> = None;
            for bindings in &current {
                let evaluation = requirement.evaluate(root, bindings, exclude);
                let rank = evaluation.failure_rank();
                match evaluation.into_result() {
                    Ok(matches) => next.extend(matches.into_iter().map(|m| m.bindings)),
                    Err(reason) => {
                        if failure.as_ref().is_none_or(|(best, _)| rank > *best) {
                            failure = Some((rank, reason));
                        }
                    }
                }
            }
            debug!("{}: {} candidate binding set(s)", requirement, next.len());

            if next.is_empty() {
                return Err(RequirementFailure {
                    requirement: requirement.to_string(),
                    reason: failure.map(|(_, reason)| reason).unwrap_or_else(|| Unsatisfied::Missing {
                        path: String::new(),
                    }),
                });
            }
            current = next;
        }
        Ok(current)
    }

    /// Check every requirement under fixed bindings.
    ///
    /// Captures already bound are never re-resolved. Requirements ending in
    /// `(.*)` are skipped.
    pub fn verify(
        &self,
        root: &Value,
        exclude: &ExclusionSet,
        bindings: &CaptureBindings,
    ) -> Result<(), RequirementFailure> {
        for requirement in self.requirements.iter().filter(|r| !r.is_wildcard()) {
            if let Err(reason) = requirement.evaluate(root, bindings, exclude).into_result() {
                return Err(RequirementFailure {
                    requirement: requirement.to_string(),
                    reason,
                });
            }
        }
        Ok(())
    }

    /// Check if any requirement covers a concrete path under `bindings`.
    pub fn covers(&self, path: &[String], bindings: &CaptureBindings) -> bool {
        self.requirements
            .iter()
            .any(|r| r.spec().covers(path, bindings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::not_exists;
    use crate::steps;
    use serde_json::json;

    fn seeds() -> IndexSet<CaptureBindings> {
        IndexSet::new()
    }

    #[test]
    fn test_join_on_shared_capture() {
        let tree = Value::from(json!({
            "info": {
                "Gi1": {"enabled": true, "port_channel": {"port_channel_member": true}, "oper_status": "up"},
                "Gi2": {"enabled": true, "port_channel": {"port_channel_member": false}, "oper_status": "up"},
                "Gi3": {"enabled": true, "port_channel": {"port_channel_member": false}, "oper_status": "down"},
                "Gi4": {"enabled": true, "port_channel": {"port_channel_member": false}, "oper_status": "up"},
            }
        }));
        let set = RequirementSet::from_steps([
            steps!["info", r"(?P<interface>\w+[0-9]+$)", "enabled", true],
            steps!["info", "(?P<interface>.*)", "port_channel", "port_channel_member", false],
            steps!["info", "(?P<interface>.*)", "oper_status", "up"],
        ])
        .unwrap();

        let resolved = set.resolve(&tree, &ExclusionSet::new(), &seeds()).unwrap();
        let names: Vec<&str> = resolved.iter().filter_map(|b| b.get("interface")).collect();
        assert_eq!(names, vec!["Gi2", "Gi4"]);
        assert_eq!(set.captures(), vec!["interface"]);
    }

    #[test]
    fn test_unresolved_names_requirement() {
        let tree = Value::from(json!({"info": {"Gi1": {"enabled": false}}}));
        let set = RequirementSet::from_steps([steps!["info", "(?P<interface>.*)", "enabled", true]]).unwrap();

        let failure = set.resolve(&tree, &ExclusionSet::new(), &seeds()).unwrap_err();
        assert_eq!(failure.requirement, "info[(?P<interface>.*)][enabled] == true");
        assert!(matches!(failure.reason, Unsatisfied::Mismatch { .. }));
    }

    #[test]
    fn test_unresolved_reports_best_failure_across_candidates() {
        let tree = Value::from(json!({"interfaces": {
            "Eth1": {"enabled": true},
            "Eth2": {"enabled": true, "oper_status": "down"},
        }}));
        let set = RequirementSet::from_steps([
            steps!["interfaces", "(?P<interface>.*)", "enabled", true],
            steps!["interfaces", "(?P<interface>.*)", "oper_status", "up"],
        ])
        .unwrap();

        let failure = set.resolve(&tree, &ExclusionSet::new(), &seeds()).unwrap_err();
        match failure.reason {
            Unsatisfied::Mismatch { path, actual, .. } => {
                assert_eq!(path, "interfaces[Eth2][oper_status]");
                assert_eq!(actual, Value::from("down"));
            }
            other => panic!("expected a mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_two_captures() {
        let tree = Value::from(json!({
            "info": {
                "Gi1": {"switchport_mode": "trunk", "port_channel": {"port_channel_int": "Port-channel1"}},
                "Gi2": {"switchport_mode": "access"},
            }
        }));
        let set = RequirementSet::from_steps([
            steps!["info", r"(?P<interface>\w+[\d\/\.]+)", "switchport_mode", "trunk"],
            steps!["info", r"(?P<interface>\w+[\d\/\.]+)", "port_channel", "port_channel_int", "(?P<port_channel_int>.*)"],
        ])
        .unwrap();

        let resolved = set.resolve(&tree, &ExclusionSet::new(), &seeds()).unwrap();
        assert_eq!(resolved.len(), 1);
        let b = &resolved[0];
        assert_eq!(b.get("interface"), Some("Gi1"));
        assert_eq!(b.get("port_channel_int"), Some("Port-channel1"));
    }

    #[test]
    fn test_verify_uses_bindings_verbatim() {
        let after = Value::from(json!({
            "info": {
                "Gi1": {"enabled": true},
                "Gi2": {"enabled": false},
            }
        }));
        let set = RequirementSet::from_steps([
            steps!["info", "(?P<interface>.*)", "enabled", false],
            steps!["info", "(?P<interface>.*)", "(.*)"],
        ])
        .unwrap();

        let gi2: CaptureBindings = [("interface", "Gi2")].into_iter().collect();
        assert!(set.verify(&after, &ExclusionSet::new(), &gi2).is_ok());

        let gi1: CaptureBindings = [("interface", "Gi1")].into_iter().collect();
        let failure = set.verify(&after, &ExclusionSet::new(), &gi1).unwrap_err();
        assert_eq!(failure.reason.path(), "info[Gi1][enabled]");
    }

    #[test]
    fn test_verify_wildcard_never_fails() {
        let after = Value::from(json!({"info": {}}));
        let set = RequirementSet::from_steps([steps!["info", "(Port-channel.*)", "mac_address", "(.*)"]]).unwrap();
        assert!(set.verify(&after, &ExclusionSet::new(), &CaptureBindings::new()).is_ok());
    }

    #[test]
    fn test_verify_not_exists() {
        let after = Value::from(json!({"info": {"Po1": {}, "Po2": {}}}));
        let set = RequirementSet::from_steps([steps!["info", not_exists("(?P<interface>.*)")]]).unwrap();

        let po3: CaptureBindings = [("interface", "Po3")].into_iter().collect();
        assert!(set.verify(&after, &ExclusionSet::new(), &po3).is_ok());

        let po2: CaptureBindings = [("interface", "Po2")].into_iter().collect();
        let failure = set.verify(&after, &ExclusionSet::new(), &po2).unwrap_err();
        assert_eq!(
            failure.reason,
            Unsatisfied::Leftover {
                path: "info".into(),
                key: "Po2".into()
            }
        );
    }
}
