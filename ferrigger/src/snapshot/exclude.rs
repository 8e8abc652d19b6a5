//! Keys ignored during matching and comparison.

use std::fmt;
use std::sync::Arc;

use crate::error::PathError;
use crate::path::{CaptureBindings, KeyPattern};

/// Predicate deciding whether a key is excluded, given the current bindings.
pub type ExcludeFn = dyn Fn(&str, &CaptureBindings) -> bool + Send + Sync;

/// A single exclusion entry.
#[derive(Clone)]
pub enum Exclusion {
    /// Literal key or regex (full match).
    Pattern(KeyPattern),

    /// Code-defined predicate, e.g. "subinterfaces of the bound interface".
    Custom {
        /// Name shown in debug output.
        name: String,
        /// The predicate.
        predicate: Arc<ExcludeFn>,
    },
}

impl Exclusion {
    /// Check if this entry excludes `key`.
    pub fn excludes(&self, key: &str, bindings: &CaptureBindings) -> bool {
        match self {
            Exclusion::Pattern(pattern) => pattern.is_match(key),
            Exclusion::Custom { predicate, .. } => predicate(key, bindings),
        }
    }
}

impl fmt::Debug for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exclusion::Pattern(pattern) => f.debug_tuple("Pattern").field(&pattern.as_str()).finish(),
            Exclusion::Custom { name, .. } => f.debug_tuple("Custom").field(name).finish(),
        }
    }
}

/// Set of keys that never take part in matching or comparison.
///
/// Volatile leaves (counters, timestamps, rates) and whole entities that a
/// trigger does not care about are listed here. An excluded key is pruned
/// wherever it appears in the tree.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    entries: Vec<Exclusion>,
}

impl ExclusionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from key patterns.
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = patterns
            .into_iter()
            .map(|p| KeyPattern::parse(p.as_ref()).map(Exclusion::Pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    /// Add a key pattern.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, PathError> {
        self.entries.push(Exclusion::Pattern(KeyPattern::parse(pattern)?));
        Ok(self)
    }

    /// Add a code-defined predicate.
    pub fn with_custom<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&str, &CaptureBindings) -> bool + Send + Sync + 'static,
    {
        self.entries.push(Exclusion::Custom {
            name: name.into(),
            predicate: Arc::new(predicate),
        });
        self
    }

    /// Append every entry of another set.
    pub fn extend(&mut self, other: &ExclusionSet) {
        self.entries.extend(other.entries.iter().cloned());
    }

    /// Check if `key` is excluded under the given bindings.
    pub fn is_excluded(&self, key: &str, bindings: &CaptureBindings) -> bool {
        self.entries.iter().any(|e| e.excludes(key, bindings))
    }

    /// Iterate the entries.
    pub fn iter(&self) -> impl Iterator<Item = &Exclusion> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
