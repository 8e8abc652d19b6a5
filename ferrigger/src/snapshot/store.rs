//! Snapshots grouped by trigger step.

use std::fmt;

use indexmap::IndexMap;

use super::Snapshot;

/// The point in a trigger run at which a snapshot was learned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Learned before any change was applied.
    Before,

    /// Learned after the change, during verification.
    After,

    /// Learned after recovery.
    Recovered,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Before => "before",
            Stage::After => "after",
            Stage::Recovered => "recovered",
        };
        write!(f, "{}", name)
    }
}

/// Holds the latest snapshot of every feature for every stage.
///
/// Recording a feature again for the same stage replaces the earlier
/// snapshot; the snapshots themselves are never modified.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    entries: IndexMap<(Stage, String), Snapshot>,
}

impl SnapshotStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a snapshot under its feature name.
    pub fn record(&mut self, stage: Stage, snapshot: Snapshot) {
        self.entries
            .insert((stage, snapshot.feature().to_string()), snapshot);
    }

    /// Get the snapshot of a feature at a stage.
    pub fn get(&self, stage: Stage, feature: &str) -> Option<&Snapshot> {
        self.entries.get(&(stage, feature.to_string()))
    }

    /// Iterate all snapshots of a stage in the order they were first recorded.
    pub fn stage(&self, stage: Stage) -> impl Iterator<Item = &Snapshot> {
        self.entries
            .iter()
            .filter(move |((s, _), _)| *s == stage)
            .map(|(_, snapshot)| snapshot)
    }

    /// Number of stored snapshots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_and_replace() {
        let mut store = SnapshotStore::new();
        store.record(
            Stage::Before,
            Snapshot::from_json("interface", json!({"info": {"Ethernet1": {}}})).unwrap(),
        );
        store.record(Stage::Before, Snapshot::empty("vlan"));
        store.record(Stage::After, Snapshot::empty("interface"));

        assert_eq!(store.len(), 3);
        assert!(!store.get(Stage::Before, "interface").unwrap().is_empty());
        assert!(store.get(Stage::After, "interface").unwrap().is_empty());
        assert!(store.get(Stage::Recovered, "interface").is_none());

        store.record(Stage::Before, Snapshot::empty("interface"));
        assert_eq!(store.len(), 3);
        assert!(store.get(Stage::Before, "interface").unwrap().is_empty());

        let features: Vec<&str> = store.stage(Stage::Before).map(Snapshot::feature).collect();
        assert_eq!(features, vec!["interface", "vlan"]);
    }
}
