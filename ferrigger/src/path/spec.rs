//! Path specifications: segments plus a terminal expectation.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PathError;
use crate::snapshot::Value;

use super::pattern::{KeyPattern, WILDCARD};
use super::CaptureBindings;

/// Existence assertion on the last step of a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentinel {
    /// Some key matching the pattern must be present.
    Exists(String),

    /// No key matching the pattern may be present.
    NotExists(String),
}

/// One step of a requirement as written in a mapping.
///
/// In YAML a step is either a plain scalar or a one-key mapping
/// `{exists: key}` / `{not_exists: key}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Step {
    /// Existence assertion.
    Sentinel(Sentinel),

    /// Key pattern, or the expected value when last.
    Value(Value),
}

/// Build an `Exists` step.
pub fn exists(pattern: impl Into<String>) -> Step {
    Step::Sentinel(Sentinel::Exists(pattern.into()))
}

/// Build a `NotExists` step.
pub fn not_exists(pattern: impl Into<String>) -> Step {
    Step::Sentinel(Sentinel::NotExists(pattern.into()))
}

impl From<&str> for Step {
    fn from(s: &str) -> Self {
        Step::Value(Value::from(s))
    }
}

impl From<String> for Step {
    fn from(s: String) -> Self {
        Step::Value(Value::from(s))
    }
}

impl From<bool> for Step {
    fn from(b: bool) -> Self {
        Step::Value(Value::Bool(b))
    }
}

impl From<i64> for Step {
    fn from(i: i64) -> Self {
        Step::Value(Value::Int(i))
    }
}

impl From<i32> for Step {
    fn from(i: i32) -> Self {
        Step::Value(Value::from(i))
    }
}

impl From<Sentinel> for Step {
    fn from(s: Sentinel) -> Self {
        Step::Sentinel(s)
    }
}

impl From<Value> for Step {
    fn from(v: Value) -> Self {
        Step::Value(v)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Sentinel(Sentinel::Exists(p)) => write!(f, "Exists({})", p),
            Step::Sentinel(Sentinel::NotExists(p)) => write!(f, "NotExists({})", p),
            Step::Value(Value::Str(s)) => write!(f, "{}", s),
            Step::Value(v) => write!(f, "{}", v),
        }
    }
}

/// What must hold at the end of a path.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminal {
    /// `(.*)`: the path exists; the subtree below is not compared.
    Any,

    /// The leaf equals a non-string value.
    Equals(Value),

    /// The leaf (or a key, at a mapping) matches a string pattern.
    Matches(KeyPattern),

    /// A key matching the pattern is present.
    Exists(KeyPattern),

    /// No key matching the pattern is present.
    NotExists(KeyPattern),
}

impl Terminal {
    fn pattern(&self) -> Option<&KeyPattern> {
        match self {
            Terminal::Matches(p) | Terminal::Exists(p) | Terminal::NotExists(p) => Some(p),
            Terminal::Any | Terminal::Equals(_) => None,
        }
    }
}

/// Compiled path specification.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSpec {
    segments: Vec<KeyPattern>,
    terminal: Terminal,
}

impl PathSpec {
    /// Compile a list of steps.
    ///
    /// All steps but the last are key patterns. The last step is the
    /// expectation: `(.*)`, an existence assertion, a string pattern or any
    /// other value to compare for equality. A lone existence assertion is a
    /// valid path; any other single step has nothing to compare against.
    pub fn from_steps(steps: &[Step]) -> Result<Self, PathError> {
        let Some((last, keys)) = steps.split_last() else {
            return Err(PathError::Empty);
        };
        let text = || render_steps(steps);

        let mut segments = Vec::with_capacity(keys.len());
        for (index, step) in keys.iter().enumerate() {
            match step {
                Step::Value(Value::Str(s)) if s == WILDCARD => {
                    return Err(PathError::TrailingAfterWildcard { path: text() });
                }
                Step::Value(Value::Str(s)) => segments.push(KeyPattern::parse(s)?),
                Step::Sentinel(_) => return Err(PathError::SentinelNotLast { path: text() }),
                Step::Value(_) => return Err(PathError::NotAKey { index, path: text() }),
            }
        }

        let terminal = match last {
            Step::Sentinel(Sentinel::Exists(p)) => Terminal::Exists(KeyPattern::parse(p)?),
            Step::Sentinel(Sentinel::NotExists(p)) => Terminal::NotExists(KeyPattern::parse(p)?),
            _ if keys.is_empty() => return Err(PathError::MissingExpectation { path: text() }),
            Step::Value(Value::Str(s)) if s == WILDCARD => Terminal::Any,
            Step::Value(Value::Str(s)) => Terminal::Matches(KeyPattern::parse(s)?),
            Step::Value(v) => Terminal::Equals(v.clone()),
        };

        let spec = Self { segments, terminal };
        spec.check_captures()?;
        Ok(spec)
    }

    /// Compile a bracket path such as `info[interfaces][(?P<intf>.*)][ipv4]`.
    ///
    /// Every token is a key segment and the terminal is `(.*)`: the path
    /// selects whole subtrees. A trailing `[(.*)]` is the same as leaving it
    /// out.
    pub fn from_bracket_path(path: &str) -> Result<Self, PathError> {
        let mut tokens = split_brackets(path)?;
        if tokens.last().is_some_and(|t| t == WILDCARD) {
            tokens.pop();
        }
        if tokens.is_empty() {
            return Err(PathError::Empty);
        }
        if tokens.iter().any(|t| t == WILDCARD) {
            return Err(PathError::TrailingAfterWildcard {
                path: path.to_string(),
            });
        }

        let segments = tokens
            .iter()
            .map(|t| KeyPattern::parse(t))
            .collect::<Result<Vec<_>, _>>()?;
        let spec = Self {
            segments,
            terminal: Terminal::Any,
        };
        spec.check_captures()?;
        Ok(spec)
    }

    /// Key segments, excluding the terminal.
    pub fn segments(&self) -> &[KeyPattern] {
        &self.segments
    }

    /// The terminal expectation.
    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    /// Names of all captures, in path order.
    pub fn captures(&self) -> Vec<&str> {
        self.segments
            .iter()
            .chain(self.terminal.pattern())
            .filter_map(KeyPattern::capture)
            .collect()
    }

    /// Check if a concrete key path lies under this spec for `bindings`.
    ///
    /// Used for strict verification: a difference at `path` is explained by
    /// this spec when every segment matches (captures taking their bound
    /// value) and either the spec ends in `(.*)` or the path continues at
    /// most through the terminal key.
    pub fn covers(&self, path: &[String], bindings: &CaptureBindings) -> bool {
        if path.len() < self.segments.len() {
            return false;
        }
        let prefix_matches = self
            .segments
            .iter()
            .zip(path)
            .all(|(segment, key)| segment.match_key(key, bindings).is_some());
        if !prefix_matches {
            return false;
        }

        let rest = &path[self.segments.len()..];
        match &self.terminal {
            Terminal::Any => true,
            Terminal::Equals(_) | Terminal::Matches(_) => rest.is_empty(),
            Terminal::Exists(p) | Terminal::NotExists(p) => {
                rest.first().is_some_and(|k| p.match_key(k, bindings).is_some())
            }
        }
    }

    fn check_captures(&self) -> Result<(), PathError> {
        let mut seen = HashSet::new();
        for name in self.captures() {
            if !seen.insert(name) {
                return Err(PathError::DuplicateCapture {
                    name: name.to_string(),
                    path: self.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.segments.iter().map(KeyPattern::as_str).collect();
        write!(f, "{}", crate::snapshot::display_path(&keys))?;
        match &self.terminal {
            Terminal::Any => write!(f, "[{}]", WILDCARD),
            Terminal::Equals(v) => write!(f, " == {}", v),
            Terminal::Matches(p) => write!(f, " =~ '{}'", p),
            Terminal::Exists(p) => write!(f, "[Exists({})]", p),
            Terminal::NotExists(p) => write!(f, "[NotExists({})]", p),
        }
    }
}

fn render_steps(steps: &[Step]) -> String {
    let parts: Vec<String> = steps.iter().map(Step::to_string).collect();
    format!("[{}]", parts.join(", "))
}

/// Split `head[a][b[c]]` into `["head", "a", "b[c]"]`.
///
/// Brackets inside a token must balance, and `\` escapes the next
/// character, so regex character classes survive intact.
fn split_brackets(path: &str) -> Result<Vec<String>, PathError> {
    let malformed = || PathError::MalformedBrackets {
        path: path.to_string(),
    };

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut chars = path.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                current.push(chars.next().ok_or_else(malformed)?);
            }
            '[' if depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                depth = 1;
            }
            '[' => {
                depth += 1;
                current.push(c);
            }
            ']' if depth == 0 => return Err(malformed()),
            ']' if depth == 1 => {
                depth = 0;
                tokens.push(std::mem::take(&mut current));
            }
            ']' => {
                depth -= 1;
                current.push(c);
            }
            _ if depth == 0 && !tokens.is_empty() => return Err(malformed()),
            _ => current.push(c),
        }
    }

    if depth != 0 {
        return Err(malformed());
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Build a `Vec<Step>` from a list of step expressions.
///
/// ```
/// use ferrigger::{steps, path::not_exists};
///
/// let req = steps!["info", "(?P<interface>.*)", "enabled", false];
/// let gone = steps!["info", "(?P<interface>.*)", not_exists("vrf")];
/// assert_eq!(req.len(), 4);
/// assert_eq!(gone.len(), 3);
/// ```
#[macro_export]
macro_rules! steps {
    ($($step:expr),* $(,)?) => {
        vec![ $($crate::path::Step::from($step)),* ]
    };
}
