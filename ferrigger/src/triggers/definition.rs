//! Trigger definition.

use std::fmt;
use std::path::Path;

use crate::config::TriggerFile;
use crate::engine::Mapping;
use crate::error::Result;

/// A named mapping for one operating system.
#[derive(Debug, Clone)]
pub struct TriggerDefinition {
    /// Trigger name (e.g., "TriggerUnconfigConfigEthernetInterface").
    pub name: String,

    /// Operating system the trigger targets (e.g., "iosxe").
    pub os: String,

    /// Free-text description.
    pub description: String,

    /// What the trigger learns, changes and verifies.
    pub mapping: Mapping,
}

impl TriggerDefinition {
    /// Create a trigger with an empty mapping.
    pub fn new(name: impl Into<String>, os: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            os: os.into(),
            description: String::new(),
            mapping: Mapping::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the mapping.
    pub fn with_mapping(mut self, mapping: Mapping) -> Self {
        self.mapping = mapping;
        self
    }

    /// Parse and validate a trigger from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        TriggerFile::from_yaml(yaml)?.into_definition()
    }

    /// Read, parse and validate a trigger file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        TriggerFile::from_path(path)?.into_definition()
    }

    /// Check the mapping for unbound captures and missing requirements.
    pub fn validate(&self) -> Result<()> {
        self.mapping.validate(&self.name)
    }
}

impl fmt::Display for TriggerDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.name)
    }
}
