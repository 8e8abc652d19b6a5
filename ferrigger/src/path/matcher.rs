//! Evaluation of a path specification against a state tree.

use std::fmt;

use log::debug;

use crate::snapshot::{display_path, ExclusionSet, Value};

use super::pattern::{KeyMatch, KeyPattern};
use super::spec::{PathSpec, Terminal};
use super::CaptureBindings;

/// One way a path specification was satisfied.
#[derive(Debug, Clone, PartialEq)]
pub struct Match<'s> {
    /// Concrete keys from the root to the matched node.
    pub path: Vec<String>,

    /// Bindings in effect for this branch, including new captures.
    pub bindings: CaptureBindings,

    /// The matched node; `None` for a satisfied absence check.
    pub value: Option<&'s Value>,
}

/// Why a path specification was not satisfied.
#[derive(Debug, Clone, PartialEq)]
pub enum Unsatisfied {
    /// Data needed to follow the path is not in the tree.
    Missing { path: String },

    /// The node exists but holds the wrong value or shape.
    Mismatch {
        path: String,
        expected: String,
        actual: Value,
    },

    /// A key that must be absent is still present.
    Leftover { path: String, key: String },

    /// No key matches an existence assertion.
    Absent { path: String, pattern: String },

    /// A difference between two snapshots that no requirement explains.
    UnexpectedChange { path: String, change: String },
}

impl Unsatisfied {
    /// Path at which evaluation stopped.
    pub fn path(&self) -> &str {
        match self {
            Unsatisfied::Missing { path }
            | Unsatisfied::Mismatch { path, .. }
            | Unsatisfied::Leftover { path, .. }
            | Unsatisfied::Absent { path, .. }
            | Unsatisfied::UnexpectedChange { path, .. } => path,
        }
    }

    /// Check if this is missing data rather than a wrong value.
    pub fn is_missing(&self) -> bool {
        matches!(self, Unsatisfied::Missing { .. })
    }
}

impl fmt::Display for Unsatisfied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unsatisfied::Missing { path } => write!(f, "no data at {}", path),
            Unsatisfied::Mismatch {
                path,
                expected,
                actual,
            } => write!(f, "{}: expected {}, found {}", path, expected, actual),
            Unsatisfied::Leftover { path, key } => {
                write!(f, "{}: '{}' is still present", path, key)
            }
            Unsatisfied::Absent { path, pattern } => {
                write!(f, "{}: no key matches '{}'", path, pattern)
            }
            Unsatisfied::UnexpectedChange { path, change } => {
                write!(f, "{}: unexpected change {}", path, change)
            }
        }
    }
}

/// All matches of one evaluation, plus the most informative failure.
#[derive(Debug, Clone, Default)]
pub struct Evaluation<'s> {
    /// Every satisfying branch, in tree order.
    pub matches: Vec<Match<'s>>,

    /// The failure that got furthest, when some branch failed.
    pub failure: Option<Unsatisfied>,

    rank: Option<FailureRank>,
}

/// Orders failures: a wrong value beats missing data, then deeper beats
/// shallower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FailureRank {
    wrong_value: bool,
    depth: usize,
}

impl FailureRank {
    fn new(failure: &Unsatisfied, depth: usize) -> Self {
        Self {
            wrong_value: !failure.is_missing(),
            depth,
        }
    }
}

impl<'s> Evaluation<'s> {
    /// Check if at least one branch matched.
    pub fn is_satisfied(&self) -> bool {
        !self.matches.is_empty()
    }

    /// Rank of `failure`, for comparing failures across evaluations.
    pub fn failure_rank(&self) -> Option<FailureRank> {
        self.rank
    }

    /// Matches, or the reason there are none.
    pub fn into_result(self) -> Result<Vec<Match<'s>>, Unsatisfied> {
        if self.matches.is_empty() {
            Err(self.failure.unwrap_or_else(|| Unsatisfied::Missing {
                path: String::new(),
            }))
        } else {
            Ok(self.matches)
        }
    }
}

/// Evaluate `spec` against `root`.
///
/// Regex segments fan out over every matching key, so one spec may match
/// many times. Keys excluded by `exclude` are invisible: they are never
/// descended into, never bound and never reported as leftovers.
pub fn evaluate<'s>(
    spec: &PathSpec,
    root: &'s Value,
    bindings: &CaptureBindings,
    exclude: &ExclusionSet,
) -> Evaluation<'s> {
    let mut walker = Walker {
        spec,
        exclude,
        out: Evaluation::default(),
    };
    let mut path = Vec::new();
    walker.descend(0, root, &mut path, bindings.clone());

    debug!(
        "{}: {} match(es){}",
        spec,
        walker.out.matches.len(),
        walker
            .out
            .failure
            .as_ref()
            .filter(|_| walker.out.matches.is_empty())
            .map(|f| format!(", {}", f))
            .unwrap_or_default()
    );
    walker.out
}

struct Walker<'a, 's> {
    spec: &'a PathSpec,
    exclude: &'a ExclusionSet,
    out: Evaluation<'s>,
}

impl<'a, 's> Walker<'a, 's> {
    fn descend(
        &mut self,
        depth: usize,
        node: &'s Value,
        path: &mut Vec<String>,
        bindings: CaptureBindings,
    ) {
        let Some(segment) = self.spec.segments().get(depth) else {
            self.terminal(node, path, bindings);
            return;
        };

        let Some(map) = node.as_map() else {
            self.fail(path.len(), mismatch(path, "a mapping", node));
            return;
        };

        if let KeyPattern::Literal(key) = segment {
            match map.get(key) {
                Some(child) if !self.exclude.is_excluded(key, &bindings) => {
                    path.push(key.clone());
                    self.descend(depth + 1, child, path, bindings);
                    path.pop();
                }
                _ => self.fail(path.len() + 1, missing(path, key)),
            }
            return;
        }

        let mut matched = false;
        for (key, child) in map {
            if self.exclude.is_excluded(key, &bindings) {
                continue;
            }
            let Some(key_match) = segment.match_key(key, &bindings) else {
                continue;
            };
            matched = true;
            let next = bind(segment, key_match, &bindings);
            path.push(key.clone());
            self.descend(depth + 1, child, path, next);
            path.pop();
        }
        if !matched {
            self.fail(path.len() + 1, missing(path, segment.as_str()));
        }
    }

    fn terminal(&mut self, node: &'s Value, path: &mut Vec<String>, bindings: CaptureBindings) {
        match self.spec.terminal() {
            Terminal::Any => self.accept(path.clone(), bindings, Some(node)),

            Terminal::Equals(expected) => {
                if node.loosely_eq(expected) {
                    self.accept(path.clone(), bindings, Some(node));
                } else {
                    let failure = mismatch(path, &expected.to_string(), node);
                    self.fail(path.len(), failure);
                }
            }

            Terminal::Matches(pattern) => match node {
                Value::Map(map) => {
                    let mut matched = false;
                    for (key, child) in map {
                        if self.exclude.is_excluded(key, &bindings) {
                            continue;
                        }
                        if let Some(key_match) = pattern.match_key(key, &bindings) {
                            matched = true;
                            let next = bind(pattern, key_match, &bindings);
                            let mut child_path = path.clone();
                            child_path.push(key.clone());
                            self.accept(child_path, next, Some(child));
                        }
                    }
                    if !matched {
                        self.fail(path.len() + 1, missing(path, pattern.as_str()));
                    }
                }
                Value::List(items) => {
                    let mut matched = false;
                    for item in items {
                        let Some(text) = item.scalar_text() else {
                            continue;
                        };
                        if let Some(key_match) = pattern.match_key(&text, &bindings) {
                            matched = true;
                            let next = bind(pattern, key_match, &bindings);
                            self.accept(path.clone(), next, Some(item));
                        }
                    }
                    if !matched {
                        let failure = mismatch(path, &format!("an element matching '{}'", pattern), node);
                        self.fail(path.len(), failure);
                    }
                }
                _ => {
                    let key_match = node
                        .scalar_text()
                        .and_then(|text| pattern.match_key(&text, &bindings));
                    match key_match {
                        Some(key_match) => {
                            let next = bind(pattern, key_match, &bindings);
                            self.accept(path.clone(), next, Some(node));
                        }
                        None => {
                            let failure = mismatch(path, &format!("'{}'", pattern), node);
                            self.fail(path.len(), failure);
                        }
                    }
                }
            },

            Terminal::Exists(pattern) => {
                let Some(map) = node.as_map() else {
                    self.fail(path.len(), mismatch(path, "a mapping", node));
                    return;
                };
                let mut matched = false;
                for (key, child) in map {
                    if self.exclude.is_excluded(key, &bindings) {
                        continue;
                    }
                    if let Some(key_match) = pattern.match_key(key, &bindings) {
                        matched = true;
                        let next = bind(pattern, key_match, &bindings);
                        let mut child_path = path.clone();
                        child_path.push(key.clone());
                        self.accept(child_path, next, Some(child));
                    }
                }
                if !matched {
                    self.fail(
                        path.len() + 1,
                        Unsatisfied::Absent {
                            path: display_path(path),
                            pattern: pattern.as_str().to_string(),
                        },
                    );
                }
            }

            Terminal::NotExists(pattern) => {
                let Some(map) = node.as_map() else {
                    self.fail(path.len(), mismatch(path, "a mapping", node));
                    return;
                };
                let leftover = map.keys().find(|key| {
                    !self.exclude.is_excluded(key, &bindings)
                        && pattern.match_key(key, &bindings).is_some()
                });
                match leftover {
                    Some(key) => self.fail(
                        path.len() + 1,
                        Unsatisfied::Leftover {
                            path: display_path(path),
                            key: key.clone(),
                        },
                    ),
                    None => self.accept(path.clone(), bindings, None),
                }
            }
        }
    }

    fn accept(&mut self, path: Vec<String>, bindings: CaptureBindings, value: Option<&'s Value>) {
        self.out.matches.push(Match {
            path,
            bindings,
            value,
        });
    }

    /// Keep the failure that says the most; the first one wins ties.
    fn fail(&mut self, depth: usize, failure: Unsatisfied) {
        let rank = FailureRank::new(&failure, depth);
        if self.out.rank.is_none_or(|best| rank > best) {
            self.out.rank = Some(rank);
            self.out.failure = Some(failure);
        }
    }
}

fn mismatch(path: &[String], expected: &str, actual: &Value) -> Unsatisfied {
    Unsatisfied::Mismatch {
        path: display_path(path),
        expected: expected.to_string(),
        actual: actual.clone(),
    }
}

fn missing(path: &[String], key: &str) -> Unsatisfied {
    let mut full: Vec<&str> = path.iter().map(String::as_str).collect();
    full.push(key);
    Unsatisfied::Missing {
        path: display_path(&full),
    }
}

fn bind(pattern: &KeyPattern, key_match: KeyMatch, bindings: &CaptureBindings) -> CaptureBindings {
    let mut next = bindings.clone();
    if let (KeyMatch::Captured(value), Some(name)) = (key_match, pattern.capture()) {
        next.insert(name, value);
    }
    next
}
