//! Learned device state.
//!
//! A [`Snapshot`] is the state tree of one feature at one point in time.
//! It is immutable once learned; the only way to observe new state is to
//! learn again. Snapshots are grouped per trigger step in a
//! [`SnapshotStore`].

pub mod diff;
mod exclude;
mod store;
mod value;

pub use diff::{Change, Difference};
pub use exclude::{ExcludeFn, Exclusion, ExclusionSet};
pub use store::{SnapshotStore, Stage};
pub use value::Value;

use indexmap::IndexMap;

use crate::error::{Result, SnapshotError};

/// Immutable state tree for one learned feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    feature: String,
    root: Value,
}

impl Snapshot {
    /// Create a snapshot from a root mapping.
    pub fn new(feature: impl Into<String>, root: IndexMap<String, Value>) -> Self {
        Self {
            feature: feature.into(),
            root: Value::Map(root),
        }
    }

    /// Create a snapshot with nothing learned.
    pub fn empty(feature: impl Into<String>) -> Self {
        Self::new(feature, IndexMap::new())
    }

    /// Create a snapshot from any value; the value must be a mapping.
    pub fn from_value(feature: impl Into<String>, root: Value) -> Result<Self> {
        let feature = feature.into();
        match root {
            Value::Map(map) => Ok(Self::new(feature, map)),
            _ => Err(SnapshotError::NotAMapping { feature }.into()),
        }
    }

    /// Create a snapshot from a JSON document.
    pub fn from_json(feature: impl Into<String>, json: serde_json::Value) -> Result<Self> {
        Self::from_value(feature, Value::from(json))
    }

    /// Name of the learned feature.
    pub fn feature(&self) -> &str {
        &self.feature
    }

    /// The root of the tree (always a mapping).
    pub fn tree(&self) -> &Value {
        &self.root
    }

    /// Check if nothing was learned.
    pub fn is_empty(&self) -> bool {
        self.root.as_map().is_none_or(IndexMap::is_empty)
    }

    /// Look up a value by path.
    ///
    /// A key that is absent anywhere along the path, including the case
    /// where the whole snapshot is empty, yields
    /// [`SnapshotError::MissingData`]. A key present with a null value is
    /// returned as [`Value::Null`].
    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> std::result::Result<&Value, SnapshotError> {
        let mut node = &self.root;
        for (depth, key) in path.iter().enumerate() {
            node = node.get(key.as_ref()).ok_or_else(|| SnapshotError::MissingData {
                feature: self.feature.clone(),
                path: display_path(&path[..=depth]),
            })?;
        }
        Ok(node)
    }

    /// Check if a path is present.
    pub fn contains<S: AsRef<str>>(&self, path: &[S]) -> bool {
        self.get(path).is_ok()
    }
}

/// Render a key path as `info[interfaces][Ethernet1]`.
pub fn display_path<S: AsRef<str>>(path: &[S]) -> String {
    let mut out = String::new();
    for (i, key) in path.iter().enumerate() {
        if i == 0 {
            out.push_str(key.as_ref());
        } else {
            out.push('[');
            out.push_str(key.as_ref());
            out.push(']');
        }
    }
    out
}
