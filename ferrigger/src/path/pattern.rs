//! Key patterns used by path segments and exclusion lists.

use std::fmt;

use regex::Regex;

use crate::error::PathError;

use super::CaptureBindings;

/// Characters that make a key pattern a regex rather than a literal key.
///
/// A bare `.` does not count: interface names and addresses contain dots
/// and are meant literally.
const REGEX_META: &[char] = &['(', ')', '[', ']', '*', '+', '?', '|', '^', '$', '\\', '{'];

/// Subtree wildcard.
pub const WILDCARD: &str = "(.*)";

/// A compiled key pattern: a literal key or an anchored regex.
#[derive(Debug, Clone)]
pub enum KeyPattern {
    /// Exact key.
    Literal(String),

    /// Regex matched against the whole key, with at most one named capture.
    Regex {
        /// Pattern as written.
        source: String,
        /// Compiled, anchored pattern.
        regex: Regex,
        /// Name of the capture group, if any.
        capture: Option<String>,
    },
}

/// Result of matching one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMatch {
    /// Matched without producing a binding.
    Plain,

    /// Matched and captured a value for the pattern's named group.
    Captured(String),
}

impl KeyPattern {
    /// Compile a pattern.
    ///
    /// Strings without regex metacharacters are literal keys. Everything
    /// else is a regex that must match the whole key.
    pub fn parse(source: &str) -> Result<Self, PathError> {
        if !source.contains(REGEX_META) {
            return Ok(KeyPattern::Literal(source.to_string()));
        }

        let regex = Regex::new(&format!("^(?:{})$", source)).map_err(|e| {
            PathError::InvalidPattern {
                pattern: source.to_string(),
                source: e,
            }
        })?;

        let mut names = regex.capture_names().flatten();
        let capture = names.next().map(str::to_string);
        if names.next().is_some() {
            return Err(PathError::MultipleCaptures {
                pattern: source.to_string(),
            });
        }

        Ok(KeyPattern::Regex {
            source: source.to_string(),
            regex,
            capture,
        })
    }

    /// Create a literal pattern without inspecting the text.
    pub fn literal(key: impl Into<String>) -> Self {
        KeyPattern::Literal(key.into())
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        match self {
            KeyPattern::Literal(key) => key,
            KeyPattern::Regex { source, .. } => source,
        }
    }

    /// Name of the capture group, if any.
    pub fn capture(&self) -> Option<&str> {
        match self {
            KeyPattern::Literal(_) => None,
            KeyPattern::Regex { capture, .. } => capture.as_deref(),
        }
    }

    /// Check if this is the `(.*)` subtree wildcard.
    pub fn is_wildcard(&self) -> bool {
        self.as_str() == WILDCARD
    }

    /// Check if `key` matches, ignoring bindings.
    pub fn is_match(&self, key: &str) -> bool {
        match self {
            KeyPattern::Literal(literal) => literal == key,
            KeyPattern::Regex { regex, .. } => regex.is_match(key),
        }
    }

    /// Match `key` under existing bindings.
    ///
    /// When the capture is already bound, the key only matches if it
    /// captures exactly the bound value. A named group that did not take
    /// part in the match captures the empty string.
    pub fn match_key(&self, key: &str, bindings: &CaptureBindings) -> Option<KeyMatch> {
        match self {
            KeyPattern::Literal(literal) => (literal == key).then_some(KeyMatch::Plain),
            KeyPattern::Regex { regex, capture, .. } => {
                let caps = regex.captures(key)?;
                let Some(name) = capture else {
                    return Some(KeyMatch::Plain);
                };
                let value = caps.name(name).map_or("", |m| m.as_str());
                match bindings.get(name) {
                    Some(bound) if bound != value => None,
                    _ => Some(KeyMatch::Captured(value.to_string())),
                }
            }
        }
    }

    /// Concrete key for this pattern under `bindings`.
    ///
    /// Literals render as themselves, a capture renders as its bound value.
    /// A regex without a bound capture has no single key.
    pub fn render(&self, bindings: &CaptureBindings) -> Option<String> {
        match self {
            KeyPattern::Literal(key) => Some(key.clone()),
            KeyPattern::Regex { capture, .. } => capture
                .as_deref()
                .and_then(|name| bindings.get(name))
                .map(str::to_string),
        }
    }
}

impl PartialEq for KeyPattern {
    fn eq(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (KeyPattern::Literal(_), KeyPattern::Literal(_))
                | (KeyPattern::Regex { .. }, KeyPattern::Regex { .. })
        ) && self.as_str() == other.as_str()
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_detection() {
        assert!(matches!(KeyPattern::parse("enabled").unwrap(), KeyPattern::Literal(_)));
        assert!(matches!(
            KeyPattern::parse("GigabitEthernet0/0/0.100").unwrap(),
            KeyPattern::Literal(_)
        ));
        assert!(matches!(KeyPattern::parse("Port-channel1").unwrap(), KeyPattern::Literal(_)));
        assert!(matches!(KeyPattern::parse("(Tunnel.*)").unwrap(), KeyPattern::Regex { .. }));
    }

    #[test]
    fn test_regex_is_anchored() {
        let pattern = KeyPattern::parse(r"\w+Ethernet[\d\/\.]+").unwrap();
        assert!(pattern.is_match("GigabitEthernet1/0/1"));
        assert!(!pattern.is_match("GigabitEthernet1/0/1 extra"));
        assert!(!pattern.is_match("Loopback0"));

        let pattern = KeyPattern::parse("(.*down.*)").unwrap();
        assert!(pattern.is_match("administratively down"));
        assert!(!pattern.is_match("up"));
    }

    #[test]
    fn test_capture_binding() {
        let pattern = KeyPattern::parse(r"(?P<interface>Eth\d+)").unwrap();
        assert_eq!(pattern.capture(), Some("interface"));

        let mut bindings = CaptureBindings::new();
        assert_eq!(
            pattern.match_key("Eth1", &bindings),
            Some(KeyMatch::Captured("Eth1".into()))
        );

        bindings.insert("interface", "Eth2");
        assert_eq!(pattern.match_key("Eth1", &bindings), None);
        assert_eq!(
            pattern.match_key("Eth2", &bindings),
            Some(KeyMatch::Captured("Eth2".into()))
        );
        assert_eq!(pattern.match_key("Vlan2", &bindings), None);
    }

    #[test]
    fn test_alternation_inside_capture() {
        let pattern = KeyPattern::parse(
            r"(?P<interface>(GigabitEthernet|gigabitEthernet|Ethernet|ethernet)[0-9\/]+\.[0-9]+)",
        )
        .unwrap();
        assert_eq!(pattern.capture(), Some("interface"));
        assert_eq!(
            pattern.match_key("GigabitEthernet0/0/1.10", &CaptureBindings::new()),
            Some(KeyMatch::Captured("GigabitEthernet0/0/1.10".into()))
        );
    }

    #[test]
    fn test_multiple_captures_rejected() {
        let err = KeyPattern::parse(r"(?P<a>\w+)-(?P<b>\d+)").unwrap_err();
        assert!(matches!(err, PathError::MultipleCaptures { .. }));
    }

    #[test]
    fn test_invalid_regex() {
        let err = KeyPattern::parse("(?P<x>[").unwrap_err();
        assert!(matches!(err, PathError::InvalidPattern { .. }));
    }

    #[test]
    fn test_render() {
        let mut bindings = CaptureBindings::new();
        bindings.insert("interface", "Eth1");

        assert_eq!(KeyPattern::parse("info").unwrap().render(&bindings).as_deref(), Some("info"));
        assert_eq!(
            KeyPattern::parse("(?P<interface>.*)").unwrap().render(&bindings).as_deref(),
            Some("Eth1")
        );
        assert_eq!(KeyPattern::parse("(?P<vrf>.*)").unwrap().render(&bindings), None);
        assert_eq!(KeyPattern::parse("(.*)").unwrap().render(&bindings), None);
    }
}
