//! Ops definitions and the learner built on them.

use indexmap::IndexMap;
use log::debug;

use crate::engine::StateLearner;
use crate::error::{PathError, Result, SnapshotError, TriggerError};
use crate::path::{evaluate, CaptureBindings, KeyPattern, PathSpec};
use crate::snapshot::{ExclusionSet, Snapshot, Value};

use super::CommandParser;

/// Copies the parsed output at `src` into the snapshot at `dest`.
#[derive(Debug, Clone)]
pub struct Leaf {
    /// Show command whose parsed output is read.
    pub command: String,

    /// Where to read in the parsed output.
    pub src: PathSpec,

    /// Where to write in the snapshot; every capture comes from `src`.
    pub dest: Vec<KeyPattern>,
}

impl Leaf {
    /// Compile a leaf from two bracket paths.
    pub fn new(command: impl Into<String>, src: &str, dest: &str) -> Result<Self> {
        let src = PathSpec::from_bracket_path(src)?;
        let dest = PathSpec::from_bracket_path(dest)?.segments().to_vec();

        let bound = src.captures();
        for pattern in &dest {
            let known = match pattern {
                KeyPattern::Literal(_) => true,
                KeyPattern::Regex { .. } => pattern.capture().is_some_and(|c| bound.contains(&c)),
            };
            if !known {
                return Err(PathError::UnboundCapture {
                    name: pattern.to_string(),
                }
                .into());
            }
        }

        Ok(Self {
            command: command.into(),
            src,
            dest,
        })
    }

    fn render(&self, bindings: &CaptureBindings) -> Result<Vec<String>> {
        self.dest
            .iter()
            .map(|pattern| {
                pattern.render(bindings).ok_or_else(|| {
                    PathError::UnboundCapture {
                        name: pattern.to_string(),
                    }
                    .into()
                })
            })
            .collect()
    }
}

/// How one feature is assembled from parsed commands.
#[derive(Debug, Clone)]
pub struct OpsDefinition {
    feature: String,
    leaves: Vec<Leaf>,
    attributes: Vec<PathSpec>,
}

impl OpsDefinition {
    /// Create an empty definition for `feature`.
    pub fn new(feature: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            leaves: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Add a leaf.
    pub fn with_leaf(mut self, command: impl Into<String>, src: &str, dest: &str) -> Result<Self> {
        self.leaves.push(Leaf::new(command, src, dest)?);
        Ok(self)
    }

    /// Keep only the subtrees under this bracket path. May be given more
    /// than once; with none, everything is kept.
    pub fn with_attribute(mut self, path: &str) -> Result<Self> {
        self.attributes.push(PathSpec::from_bracket_path(path)?);
        Ok(self)
    }

    /// Feature name.
    pub fn feature(&self) -> &str {
        &self.feature
    }

    /// All leaves, in insertion order.
    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    /// Commands to parse, each once, in first-use order.
    pub fn commands(&self) -> Vec<&str> {
        let mut commands: Vec<&str> = Vec::new();
        for leaf in &self.leaves {
            if !commands.contains(&leaf.command.as_str()) {
                commands.push(&leaf.command);
            }
        }
        commands
    }

    /// Build the snapshot from parsed outputs keyed by command.
    ///
    /// Commands without output and source paths with no data contribute
    /// nothing; the result may be empty.
    pub fn assemble(&self, outputs: &IndexMap<String, Value>) -> Result<Snapshot> {
        let unbound = CaptureBindings::new();
        let nothing = ExclusionSet::new();
        let mut tree = IndexMap::new();

        for leaf in &self.leaves {
            let Some(output) = outputs.get(&leaf.command) else {
                continue;
            };
            for found in evaluate(&leaf.src, output, &unbound, &nothing).matches {
                let Some(value) = found.value else {
                    continue;
                };
                merge_at(&mut tree, &leaf.render(&found.bindings)?, value.clone());
            }
        }

        if !self.attributes.is_empty() {
            let root = Value::Map(tree);
            tree = IndexMap::new();
            for attribute in &self.attributes {
                for found in evaluate(attribute, &root, &unbound, &nothing).matches {
                    if let Some(value) = found.value {
                        merge_at(&mut tree, &found.path, value.clone());
                    }
                }
            }
        }

        Ok(Snapshot::new(self.feature.as_str(), tree))
    }

    /// Parse every command and assemble the snapshot.
    pub async fn make<P: CommandParser>(&self, parser: &mut P) -> Result<Snapshot> {
        let mut outputs = IndexMap::new();
        for command in self.commands() {
            match parser.parse(command).await {
                Ok(output) => {
                    outputs.insert(command.to_string(), output);
                }
                Err(e) => debug!("{}: no data from '{}': {}", self.feature, command, e),
            }
        }
        self.assemble(&outputs)
    }
}

/// Insert `value` at `path`, merging mappings that already exist there.
fn merge_at(tree: &mut IndexMap<String, Value>, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        if let Value::Map(incoming) = value {
            merge_maps(tree, incoming);
        }
        return;
    };

    let mut node = tree;
    for key in parents {
        let child = node.entry(key.clone()).or_insert_with(Value::map);
        if !child.is_map() {
            *child = Value::map();
        }
        node = match child.as_map_mut() {
            Some(map) => map,
            None => return,
        };
    }

    match value {
        Value::Map(incoming) => match node.get_mut(last) {
            Some(Value::Map(existing)) => merge_maps(existing, incoming),
            _ => {
                node.insert(last.clone(), Value::Map(incoming));
            }
        },
        value => {
            node.insert(last.clone(), value);
        }
    }
}

fn merge_maps(into: &mut IndexMap<String, Value>, from: IndexMap<String, Value>) {
    for (key, value) in from {
        merge_at(into, std::slice::from_ref(&key), value);
    }
}

/// A [`StateLearner`] that learns features through ops definitions.
#[derive(Debug)]
pub struct OpsLearner<P> {
    parser: P,
    ops: IndexMap<String, OpsDefinition>,
}

impl<P: CommandParser> OpsLearner<P> {
    /// Create a learner with no features.
    pub fn new(parser: P) -> Self {
        Self {
            parser,
            ops: IndexMap::new(),
        }
    }

    /// Learn a feature through `ops`.
    pub fn with_ops(mut self, ops: OpsDefinition) -> Self {
        self.ops.insert(ops.feature().to_string(), ops);
        self
    }

    /// The parser.
    pub fn parser(&self) -> &P {
        &self.parser
    }

    /// Take the parser back.
    pub fn into_parser(self) -> P {
        self.parser
    }
}

impl<P: CommandParser> StateLearner for OpsLearner<P> {
    async fn learn(&mut self, feature: &str) -> Result<Snapshot> {
        let ops = self.ops.get(feature).ok_or_else(|| TriggerError::Learn {
            feature: feature.to_string(),
            message: "no ops definition".to_string(),
        })?;
        let snapshot = ops.make(&mut self.parser).await?;
        if snapshot.is_empty() {
            return Err(SnapshotError::MissingData {
                feature: feature.to_string(),
                path: String::new(),
            }
            .into());
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::RecordedOutputs;
    use serde_json::json;

    #[test]
    fn test_leaf_rejects_unbound_destination() {
        assert!(Leaf::new("show vlan", "[vlans][(?P<vlan>.*)]", "info[(?P<vlan>.*)]").is_ok());
        let err = Leaf::new("show vlan", "[vlans][(?P<vlan>.*)]", "info[(?P<id>.*)]").unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Path(PathError::UnboundCapture { .. })
        ));
        assert!(Leaf::new("show vlan", "[vlans]", "info[(Vlan.*)]").is_err());
    }

    #[test]
    fn test_commands_are_deduplicated() {
        let ops = OpsDefinition::new("vlan")
            .with_leaf("show vlan", "[vlans][(?P<v>.*)][name]", "info[(?P<v>.*)][name]")
            .unwrap()
            .with_leaf("show vlan", "[vlans][(?P<v>.*)][state]", "info[(?P<v>.*)][state]")
            .unwrap()
            .with_leaf("show vtp", "[domain]", "info[vtp][domain]")
            .unwrap();
        assert_eq!(ops.commands(), vec!["show vlan", "show vtp"]);
    }

    #[test]
    fn test_leaves_merge_into_one_tree() {
        let ops = OpsDefinition::new("vlan")
            .with_leaf("show vlan", "[vlans][(?P<v>.*)][name]", "info[(?P<v>.*)][name]")
            .unwrap()
            .with_leaf("show vlan brief", "[(?P<v>.*)][state]", "info[(?P<v>.*)][state]")
            .unwrap();

        let outputs: IndexMap<String, Value> = [
            ("show vlan".to_string(), Value::from(json!({"vlans": {"10": {"name": "users", "mtu": 1500}}}))),
            ("show vlan brief".to_string(), Value::from(json!({"10": {"state": "active"}, "20": {"state": "suspend"}}))),
        ]
        .into_iter()
        .collect();

        let snapshot = ops.assemble(&outputs).unwrap();
        assert_eq!(
            snapshot.tree(),
            &Value::from(json!({"info": {
                "10": {"name": "users", "state": "active"},
                "20": {"state": "suspend"},
            }}))
        );
    }

    #[tokio::test]
    async fn test_learner_reports_missing_data_when_empty() {
        let ops = OpsDefinition::new("vlan")
            .with_leaf("show vlan", "[vlans]", "info[vlans]")
            .unwrap();
        let mut learner = OpsLearner::new(RecordedOutputs::new().with_output("show vlan", json!({})))
            .with_ops(ops);

        let err = learner.learn("vlan").await.unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Snapshot(SnapshotError::MissingData { .. })
        ));
        assert_eq!(learner.parser().calls(), ["show vlan"]);

        let err = learner.learn("ospf").await.unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Trigger(TriggerError::Learn { .. })
        ));
    }
}
