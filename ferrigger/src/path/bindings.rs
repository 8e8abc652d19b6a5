//! Capture name to value bindings.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Values bound to named captures.
///
/// Ordered by capture name so two binding sets with the same content
/// compare, hash and print identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CaptureBindings(BTreeMap<String, String>);

impl CaptureBindings {
    /// Create an empty binding set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Bind `name` to `value`, replacing any earlier value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Check if `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of bound captures.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for CaptureBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CaptureBindings {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_in_name_order() {
        let b: CaptureBindings = [("vrf", "default"), ("interface", "Eth1")].into_iter().collect();
        assert_eq!(b.to_string(), "interface=Eth1, vrf=default");
        assert_eq!(b.get("vrf"), Some("default"));
        assert!(!b.contains("missing"));
    }
}
