//! Structural comparison of two state trees.

use std::fmt;

use super::value::Value;
use super::display_path;

/// How a single leaf or subtree differs.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Present only in the second tree.
    Added(Value),

    /// Present only in the first tree.
    Removed(Value),

    /// Present in both with different values.
    Modified { before: Value, after: Value },
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::Added(value) => write!(f, "added {}", value),
            Change::Removed(value) => write!(f, "removed {}", value),
            Change::Modified { before, after } => write!(f, "{} -> {}", before, after),
        }
    }
}

/// One difference between two trees, with the path at which it occurs.
#[derive(Debug, Clone, PartialEq)]
pub struct Difference {
    /// Keys from the root to the differing node.
    pub path: Vec<String>,

    /// What changed.
    pub change: Change,
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = display_path(&self.path);
        match &self.change {
            Change::Added(value) => write!(f, "+ {}: {}", path, value),
            Change::Removed(value) => write!(f, "- {}: {}", path, value),
            Change::Modified { before, after } => {
                write!(f, "~ {}: {} -> {}", path, before, after)
            }
        }
    }
}

/// Compare two trees and list every difference.
///
/// Keys for which `excluded` returns true are skipped at any depth. Lists of
/// equal length are compared element by element; lists of different length
/// are reported as one modification.
pub fn compare<F>(before: &Value, after: &Value, excluded: F) -> Vec<Difference>
where
    F: Fn(&str) -> bool,
{
    let mut out = Vec::new();
    let mut path = Vec::new();
    walk(before, after, &excluded, &mut path, &mut out);
    out
}

fn walk<F>(
    before: &Value,
    after: &Value,
    excluded: &F,
    path: &mut Vec<String>,
    out: &mut Vec<Difference>,
) where
    F: Fn(&str) -> bool,
{
    match (before, after) {
        (Value::Map(a), Value::Map(b)) => {
            for (key, left) in a {
                if excluded(key) {
                    continue;
                }
                path.push(key.clone());
                match b.get(key) {
                    Some(right) => walk(left, right, excluded, path, out),
                    None => out.push(Difference {
                        path: path.clone(),
                        change: Change::Removed(left.clone()),
                    }),
                }
                path.pop();
            }
            for (key, right) in b {
                if excluded(key) || a.contains_key(key) {
                    continue;
                }
                path.push(key.clone());
                out.push(Difference {
                    path: path.clone(),
                    change: Change::Added(right.clone()),
                });
                path.pop();
            }
        }
        (Value::List(a), Value::List(b)) if a.len() == b.len() => {
            for (i, (left, right)) in a.iter().zip(b).enumerate() {
                path.push(i.to_string());
                walk(left, right, excluded, path, out);
                path.pop();
            }
        }
        _ => {
            if !before.loosely_eq(after) {
                out.push(Difference {
                    path: path.clone(),
                    change: Change::Modified {
                        before: before.clone(),
                        after: after.clone(),
                    },
                });
            }
        }
    }
}
