//! Error types for ferrigger.

use thiserror::Error;

/// Main error type for ferrigger operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Learned state errors
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Path specification errors
    #[error("Path error: {0}")]
    Path(#[from] PathError),

    /// Trigger and collaborator errors
    #[error("Trigger error: {0}")]
    Trigger(#[from] TriggerError),

    /// Datafile and mapping file errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised while learning or reading a snapshot.
///
/// A completely empty learn and a partially incomplete one are the same
/// condition here: the data a caller asked for is not in the tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapshotError {
    /// Requested data is not present in the learned state
    #[error("No data for feature '{feature}' at '{path}'")]
    MissingData { feature: String, path: String },

    /// Snapshot root must be a mapping
    #[error("Snapshot root for feature '{feature}' is not a mapping")]
    NotAMapping { feature: String },

    /// Show command output could not be parsed
    #[error("Parsing '{command}' failed: {message}")]
    Parse { command: String, message: String },
}

/// Errors raised while compiling path specifications.
#[derive(Error, Debug)]
pub enum PathError {
    /// Regex in a segment failed to compile
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A segment may carry at most one named capture
    #[error("Pattern '{pattern}' has more than one named capture")]
    MultipleCaptures { pattern: String },

    /// The same capture name appears twice in one path
    #[error("Capture '{name}' appears more than once in '{path}'")]
    DuplicateCapture { name: String, path: String },

    /// Path has no segments
    #[error("Path specification is empty")]
    Empty,

    /// Path must end with an expectation
    #[error("Path '{path}' has no expected value")]
    MissingExpectation { path: String },

    /// Exists/NotExists may only terminate a path
    #[error("Existence assertion must be the last step in '{path}'")]
    SentinelNotLast { path: String },

    /// Nothing may follow a '(.*)' wildcard
    #[error("Steps follow the '(.*)' wildcard in '{path}'")]
    TrailingAfterWildcard { path: String },

    /// Keys must be strings
    #[error("Step {index} of '{path}' is not a key")]
    NotAKey { index: usize, path: String },

    /// Bracket path could not be parsed
    #[error("Malformed bracket path '{path}'")]
    MalformedBrackets { path: String },

    /// Capture used in a destination path was never bound
    #[error("Capture '{name}' is not bound")]
    UnboundCapture { name: String },
}

/// Trigger definition and collaborator errors.
#[derive(Error, Debug)]
pub enum TriggerError {
    /// The configuration-mutation collaborator failed
    #[error("Mutation failed: {message}")]
    Mutation { message: String },

    /// The recovery collaborator failed
    #[error("Recovery failed: {message}")]
    Recovery { message: String },

    /// The state learner failed for a reason other than missing data
    #[error("Learning '{feature}' failed: {message}")]
    Learn { feature: String, message: String },

    /// A capture used by a later step is never produced by `requirements`
    #[error("Capture '{name}' used in {section} is not bound by requirements")]
    UnboundCapture { name: String, section: String },

    /// `num_values` names a capture that requirements never produce
    #[error("num_values names unknown capture '{name}'")]
    UnknownNumValues { name: String },

    /// Mapping has no pre-change requirements
    #[error("Trigger '{trigger}' has no requirements")]
    NoRequirements { trigger: String },

    /// State machine was driven along an edge it does not have
    #[error("Illegal transition from {from} to {to}")]
    IllegalTransition { from: String, to: String },

    /// A trigger with the same os and name is already registered
    #[error("Trigger '{name}' already registered for '{os}'")]
    AlreadyRegistered { os: String, name: String },

    /// Unknown trigger
    #[error("Unknown trigger '{name}' for '{os}'")]
    UnknownTrigger { os: String, name: String },

    /// The global trigger registry lock is poisoned
    #[error("Trigger registry unavailable: {message}")]
    Registry { message: String },
}

/// Datafile and mapping file errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML decoding error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Static override could not be compiled
    #[error("Invalid static override for '{name}': {message}")]
    InvalidStatic { name: String, message: String },

    /// Timing budget that cannot be polled
    #[error("Invalid timeout '{name}': {message}")]
    InvalidTimeout { name: String, message: String },
}

/// Result type alias using ferrigger's Error.
pub type Result<T> = std::result::Result<T, Error>;
