//! What a trigger learns, changes and verifies.
//!
//! A [`Mapping`] ties the learned-state side of a trigger to the
//! configuration side:
//!
//! - `requirements`: per feature, the requirements that select the
//!   entities to act on before the change,
//! - `config_info`: per configuration feature, what to hand the mutator,
//!   with captures substituted,
//! - `verify_ops`: per feature, the requirements the device must meet
//!   after the change, evaluated with the bindings selected before,
//! - `num_values`: how many distinct values of a capture to act on.

use std::collections::HashSet;
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::StaticOverrides;
use crate::error::{Result, TriggerError};
use crate::path::{CaptureBindings, KeyPattern, RequirementFailure, RequirementSet, Step, Unsatisfied};
use crate::snapshot::{self, display_path, ExclusionSet, Snapshot, SnapshotStore, Stage, Value};

/// Interface names reserved for out-of-band management.
static MANAGEMENT_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(mgmt|management)").unwrap());

/// VRFs that hold the management interface.
static MANAGEMENT_VRF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(mgmt-vrf|mgmt-intf|management)$").unwrap());

/// Requirements on one learned feature, with the keys to ignore.
#[derive(Debug, Clone, Default)]
pub struct FeatureRequirements {
    requirements: RequirementSet,
    exclude: ExclusionSet,
    strict: bool,
    exclude_management: bool,
}

impl FeatureRequirements {
    /// Compile requirements from step lists.
    pub fn new<I>(steps: I) -> Result<Self>
    where
        I: IntoIterator<Item = Vec<Step>>,
    {
        Ok(Self {
            requirements: RequirementSet::from_steps(steps)?,
            exclude: ExclusionSet::new(),
            strict: false,
            exclude_management: false,
        })
    }

    /// Add exclusion patterns.
    pub fn with_exclude<I, S>(mut self, patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exclude.extend(&ExclusionSet::from_patterns(patterns)?);
        Ok(self)
    }

    /// Add a prebuilt exclusion set.
    pub fn with_exclusions(mut self, exclusions: &ExclusionSet) -> Self {
        self.exclude.extend(exclusions);
        self
    }

    /// Add a code-defined exclusion.
    pub fn with_custom_exclude<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&str, &CaptureBindings) -> bool + Send + Sync + 'static,
    {
        self.exclude = self.exclude.with_custom(name, predicate);
        self
    }

    /// Require every before/after difference to be explained by a
    /// requirement.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Whether candidates bound to the management interface may be
    /// selected. Defaults to `true`.
    pub fn with_management_interface(mut self, include: bool) -> Self {
        self.exclude_management = !include;
        self
    }

    /// The requirements.
    pub fn requirements(&self) -> &RequirementSet {
        &self.requirements
    }

    /// The exclusions.
    pub fn exclude(&self) -> &ExclusionSet {
        &self.exclude
    }

    /// Check if strict verification is on.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Check if the management interface may be selected.
    pub fn includes_management_interface(&self) -> bool {
        !self.exclude_management
    }

    /// Check if `bindings` put the management interface under any
    /// requirement.
    ///
    /// A bound key is the management interface when its name starts with
    /// `mgmt`/`management`, or when its `vrf` leaf names a management VRF.
    pub fn binds_management_interface(&self, root: &Value, bindings: &CaptureBindings) -> bool {
        self.requirements.requirements().iter().any(|requirement| {
            let mut path: Vec<String> = Vec::new();
            for segment in requirement.spec().segments() {
                let Some(key) = segment.render(bindings) else {
                    return false;
                };
                let bound = segment.capture().is_some();
                if bound && MANAGEMENT_NAME.is_match(&key) {
                    return true;
                }
                path.push(key);
                if !bound {
                    continue;
                }
                let vrf = path
                    .iter()
                    .try_fold(root, |node, k| node.get(k))
                    .and_then(|node| node.get("vrf"))
                    .and_then(Value::as_str);
                if vrf.is_some_and(|vrf| MANAGEMENT_VRF.is_match(vrf)) {
                    return true;
                }
            }
            false
        })
    }
}

/// Keyword arguments for the configuration mutator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigKwargs {
    pub mandatory: IndexMap<String, Value>,
    pub optional: IndexMap<String, Value>,
}

/// Configuration side of a trigger for one configuration feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigInfo {
    /// Attribute paths on the configuration object, as step lists.
    pub requirements: Vec<Vec<Value>>,

    /// Whether the configuration object should be verified after applying.
    pub verify_conf: bool,

    /// Constructor arguments.
    pub kwargs: ConfigKwargs,
}

impl ConfigInfo {
    /// Create an empty entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mandatory argument.
    pub fn with_mandatory(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.mandatory.insert(key.into(), value.into());
        self
    }

    /// Add an optional argument.
    pub fn with_optional(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.optional.insert(key.into(), value.into());
        self
    }

    /// Add an attribute path.
    pub fn with_requirement(mut self, steps: Vec<Value>) -> Self {
        self.requirements.push(steps);
        self
    }

    /// Set `verify_conf`.
    pub fn with_verify_conf(mut self, verify_conf: bool) -> Self {
        self.verify_conf = verify_conf;
        self
    }

    /// Captures referenced anywhere in this entry.
    pub fn captures(&self) -> IndexSet<String> {
        let mut names = IndexSet::new();
        let values = self
            .requirements
            .iter()
            .flatten()
            .chain(self.kwargs.mandatory.values())
            .chain(self.kwargs.optional.values());
        for value in values {
            collect_captures(value, &mut names);
        }
        names
    }

    /// Substitute bound captures and produce the change for the mutator.
    pub fn render(&self, feature: &str, bindings: &CaptureBindings) -> ConfigChange {
        let render_map = |map: &IndexMap<String, Value>| -> IndexMap<String, Value> {
            map.iter()
                .map(|(k, v)| (k.clone(), substitute(v, bindings)))
                .collect()
        };
        ConfigChange {
            feature: feature.to_string(),
            bindings: bindings.clone(),
            mandatory: render_map(&self.kwargs.mandatory),
            optional: render_map(&self.kwargs.optional),
            attributes: self
                .requirements
                .iter()
                .map(|steps| steps.iter().map(|v| substitute(v, bindings)).collect())
                .collect(),
            verify_conf: self.verify_conf,
        }
    }
}

fn capture_of(text: &str) -> Option<String> {
    KeyPattern::parse(text).ok()?.capture().map(str::to_string)
}

fn collect_captures(value: &Value, names: &mut IndexSet<String>) {
    match value {
        Value::Str(s) => names.extend(capture_of(s)),
        Value::List(items) => items.iter().for_each(|v| collect_captures(v, names)),
        Value::Map(map) => map.values().for_each(|v| collect_captures(v, names)),
        _ => {}
    }
}

/// Replace a string holding a capture pattern with the bound value.
fn substitute(value: &Value, bindings: &CaptureBindings) -> Value {
    match value {
        Value::Str(s) => capture_of(s)
            .and_then(|name| bindings.get(&name).map(Value::from))
            .unwrap_or_else(|| value.clone()),
        Value::List(items) => Value::List(items.iter().map(|v| substitute(v, bindings)).collect()),
        Value::Map(map) => Value::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute(v, bindings)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

/// A configuration change handed to the [`Mutator`](super::Mutator).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigChange {
    /// Configuration feature, e.g. `interface`.
    pub feature: String,

    /// The binding set this change was rendered for.
    pub bindings: CaptureBindings,

    /// Mandatory arguments with captures substituted.
    pub mandatory: IndexMap<String, Value>,

    /// Optional arguments with captures substituted.
    pub optional: IndexMap<String, Value>,

    /// Attribute paths with captures substituted.
    pub attributes: Vec<Vec<Value>>,

    /// Whether the configuration object should be verified after applying.
    pub verify_conf: bool,
}

/// How many distinct values of a capture to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NumValuesRepr", into = "NumValuesRepr")]
pub enum NumValues {
    Count(usize),
    All,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum NumValuesRepr {
    Count(usize),
    Word(String),
}

impl TryFrom<NumValuesRepr> for NumValues {
    type Error = String;

    fn try_from(repr: NumValuesRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            NumValuesRepr::Count(n) => Ok(NumValues::Count(n)),
            NumValuesRepr::Word(w) if w == "all" => Ok(NumValues::All),
            NumValuesRepr::Word(w) => Err(format!("num_values must be a count or 'all', got '{}'", w)),
        }
    }
}

impl From<NumValues> for NumValuesRepr {
    fn from(n: NumValues) -> Self {
        match n {
            NumValues::Count(n) => NumValuesRepr::Count(n),
            NumValues::All => NumValuesRepr::Word("all".to_string()),
        }
    }
}

impl From<usize> for NumValues {
    fn from(n: usize) -> Self {
        NumValues::Count(n)
    }
}

impl fmt::Display for NumValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumValues::Count(n) => write!(f, "{}", n),
            NumValues::All => write!(f, "all"),
        }
    }
}

/// A requirement failure on a named feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFailure {
    pub feature: String,
    pub failure: RequirementFailure,
}

impl fmt::Display for FeatureFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.feature, self.failure)
    }
}

/// The full description of what a trigger does.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    requirements: IndexMap<String, FeatureRequirements>,
    config_info: IndexMap<String, ConfigInfo>,
    verify_ops: IndexMap<String, FeatureRequirements>,
    num_values: IndexMap<String, NumValues>,
}

impl Mapping {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add pre-change requirements on a feature.
    pub fn with_requirements(mut self, feature: impl Into<String>, reqs: FeatureRequirements) -> Self {
        self.requirements.insert(feature.into(), reqs);
        self
    }

    /// Add a configuration entry.
    pub fn with_config(mut self, feature: impl Into<String>, info: ConfigInfo) -> Self {
        self.config_info.insert(feature.into(), info);
        self
    }

    /// Add post-change requirements on a feature.
    pub fn with_verify(mut self, feature: impl Into<String>, reqs: FeatureRequirements) -> Self {
        self.verify_ops.insert(feature.into(), reqs);
        self
    }

    /// Limit how many distinct values of a capture are acted on.
    pub fn with_num_values(mut self, capture: impl Into<String>, n: impl Into<NumValues>) -> Self {
        self.num_values.insert(capture.into(), n.into());
        self
    }

    /// Pre-change requirements per feature.
    pub fn requirements(&self) -> &IndexMap<String, FeatureRequirements> {
        &self.requirements
    }

    /// Configuration entries per feature.
    pub fn config_info(&self) -> &IndexMap<String, ConfigInfo> {
        &self.config_info
    }

    /// Post-change requirements per feature.
    pub fn verify_ops(&self) -> &IndexMap<String, FeatureRequirements> {
        &self.verify_ops
    }

    /// Selection limits per capture.
    pub fn num_values(&self) -> &IndexMap<String, NumValues> {
        &self.num_values
    }

    /// Check that every capture used after the pre-change step is produced
    /// by it.
    pub fn validate(&self, trigger: &str) -> Result<()> {
        if self.requirements.values().all(|r| r.requirements().is_empty()) {
            return Err(TriggerError::NoRequirements {
                trigger: trigger.to_string(),
            }
            .into());
        }

        let produced: HashSet<&str> = self
            .requirements
            .values()
            .flat_map(|r| r.requirements().captures())
            .collect();

        for reqs in self.verify_ops.values() {
            if let Some(name) = reqs
                .requirements()
                .captures()
                .into_iter()
                .find(|name| !produced.contains(name))
            {
                return Err(TriggerError::UnboundCapture {
                    name: name.to_string(),
                    section: "verify_ops".to_string(),
                }
                .into());
            }
        }

        for info in self.config_info.values() {
            if let Some(name) = info.captures().into_iter().find(|name| !produced.contains(name.as_str())) {
                return Err(TriggerError::UnboundCapture {
                    name,
                    section: "config_info".to_string(),
                }
                .into());
            }
        }

        if let Some(name) = self.num_values.keys().find(|name| !produced.contains(name.as_str())) {
            return Err(TriggerError::UnknownNumValues { name: name.clone() }.into());
        }
        Ok(())
    }

    /// Features to learn before the change: requirement features, then
    /// verification features not already listed.
    pub fn learned_features(&self) -> Vec<String> {
        let mut features: IndexSet<&String> = self.requirements.keys().collect();
        features.extend(self.verify_ops.keys());
        features.into_iter().cloned().collect()
    }

    /// Features to learn after the change.
    pub fn verified_features(&self) -> Vec<String> {
        self.verify_ops.keys().cloned().collect()
    }

    /// Exclusions used when comparing the first and the post-recovery
    /// snapshots of `feature`.
    pub fn comparison_exclusions(&self, feature: &str) -> ExclusionSet {
        self.requirements
            .get(feature)
            .or_else(|| self.verify_ops.get(feature))
            .map(|r| r.exclude().clone())
            .unwrap_or_default()
    }

    /// Resolve every candidate binding set from the pre-change snapshots.
    ///
    /// Features are joined in order: captures bound by one feature
    /// constrain the next. A feature without a snapshot is treated as
    /// empty. Features that exclude the management interface drop the
    /// candidates bound to it.
    pub fn resolve(&self, store: &SnapshotStore) -> std::result::Result<IndexSet<CaptureBindings>, FeatureFailure> {
        let mut candidates = IndexSet::new();
        for (feature, reqs) in &self.requirements {
            let empty;
            let snapshot = match store.get(Stage::Before, feature) {
                Some(snapshot) => snapshot,
                None => {
                    empty = Snapshot::empty(feature.as_str());
                    &empty
                }
            };
            candidates = reqs
                .requirements()
                .resolve(snapshot.tree(), reqs.exclude(), &candidates)
                .map_err(|failure| FeatureFailure {
                    feature: feature.clone(),
                    failure,
                })?;

            if reqs.includes_management_interface() {
                continue;
            }
            candidates.retain(|bindings| !reqs.binds_management_interface(snapshot.tree(), bindings));
            if candidates.is_empty() {
                let path = reqs
                    .requirements()
                    .requirements()
                    .first()
                    .map(|r| r.spec().to_string())
                    .unwrap_or_default();
                return Err(FeatureFailure {
                    feature: feature.clone(),
                    failure: RequirementFailure {
                        requirement: "include_management_interface: false".to_string(),
                        reason: Unsatisfied::Absent {
                            path,
                            pattern: "non-management interface".to_string(),
                        },
                    },
                });
            }
        }
        Ok(candidates)
    }

    /// Pick the binding sets to act on.
    ///
    /// Static overrides filter the candidates first. Then, for every capture
    /// in `num_values`, only candidates whose value is among the first N
    /// distinct values (in traversal order) are kept. Captures without a
    /// `num_values` entry are not limited.
    pub fn select(
        &self,
        candidates: &IndexSet<CaptureBindings>,
        statics: &StaticOverrides,
    ) -> Vec<CaptureBindings> {
        let mut selected: Vec<CaptureBindings> = candidates
            .iter()
            .filter(|b| statics.accepts(b))
            .cloned()
            .collect();

        for (capture, limit) in &self.num_values {
            let NumValues::Count(limit) = *limit else {
                continue;
            };
            let mut kept: IndexSet<String> = IndexSet::new();
            selected.retain(|b| match b.get(capture) {
                Some(value) if kept.contains(value) => true,
                Some(value) if kept.len() < limit => {
                    kept.insert(value.to_string());
                    true
                }
                Some(_) => false,
                None => true,
            });
        }
        selected
    }

    /// Render the configuration changes for the selected binding sets.
    pub fn changes(&self, selected: &[CaptureBindings]) -> Vec<ConfigChange> {
        selected
            .iter()
            .flat_map(|bindings| {
                self.config_info
                    .iter()
                    .map(move |(feature, info)| info.render(feature, bindings))
            })
            .collect()
    }

    /// Check the post-change snapshots under the selected bindings.
    ///
    /// For strict features every difference between the first and the
    /// post-change snapshot must also lie under one of the requirements.
    pub fn verify(
        &self,
        store: &SnapshotStore,
        selected: &[CaptureBindings],
    ) -> std::result::Result<(), FeatureFailure> {
        for (feature, reqs) in &self.verify_ops {
            let empty = Snapshot::empty(feature.as_str());
            let after = store.get(Stage::After, feature).unwrap_or(&empty);
            let fail = |failure| FeatureFailure {
                feature: feature.clone(),
                failure,
            };

            for bindings in selected {
                reqs.requirements()
                    .verify(after.tree(), reqs.exclude(), bindings)
                    .map_err(fail)?;

                if !reqs.is_strict() {
                    continue;
                }
                let before = store.get(Stage::Before, feature).unwrap_or(&empty);
                let differences = snapshot::diff::compare(before.tree(), after.tree(), |key| {
                    reqs.exclude().is_excluded(key, bindings)
                });
                if let Some(diff) = differences
                    .iter()
                    .find(|d| !reqs.requirements().covers(&d.path, bindings))
                {
                    return Err(fail(RequirementFailure {
                        requirement: "strict".to_string(),
                        reason: Unsatisfied::UnexpectedChange {
                            path: display_path(&diff.path),
                            change: diff.change.to_string(),
                        },
                    }));
                }
            }
        }
        Ok(())
    }
}
