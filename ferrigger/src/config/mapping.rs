//! YAML form of trigger mappings.
//!
//! ```yaml
//! name: TriggerUnconfigConfigEthernetSubInterface
//! os: iosxe
//! mapping:
//!   requirements:
//!     interface:
//!       requirements:
//!         - [info, '(?P<interface>GigabitEthernet[0-9\/]+\.[0-9]+)', enabled, true]
//!       exclude: [in_octets, out_octets]
//!   config_info:
//!     interface:
//!       kwargs:
//!         mandatory: {name: '(?P<interface>.*)', attach: false}
//!   verify_ops:
//!     interface:
//!       requirements:
//!         - [info, '(?P<interface>.*)', enabled, false]
//!         - [info, '(?P<interface>.*)', {not_exists: vrf}]
//!   num_values: {interface: 1}
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::engine::{ConfigInfo, FeatureRequirements, Mapping, NumValues};
use crate::error::{ConfigError, Result};
use crate::path::Step;
use crate::triggers::TriggerDefinition;

/// Requirements on one feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFile {
    pub requirements: Vec<Vec<Step>>,
    pub exclude: Vec<String>,
    pub strict: bool,

    /// Unset means the management interface may be selected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_management_interface: Option<bool>,
}

impl FeatureFile {
    /// Compile into engine requirements.
    pub fn compile(&self) -> Result<FeatureRequirements> {
        Ok(FeatureRequirements::new(self.requirements.iter().cloned())?
            .with_exclude(&self.exclude)?
            .with_strict(self.strict)
            .with_management_interface(self.include_management_interface.unwrap_or(true)))
    }
}

/// A whole mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingFile {
    pub requirements: IndexMap<String, FeatureFile>,
    pub config_info: IndexMap<String, ConfigInfo>,
    pub verify_ops: IndexMap<String, FeatureFile>,
    pub num_values: IndexMap<String, NumValues>,
}

impl MappingFile {
    /// Compile into a [`Mapping`].
    pub fn into_mapping(self) -> Result<Mapping> {
        let mut mapping = Mapping::new();
        for (feature, file) in &self.requirements {
            mapping = mapping.with_requirements(feature.as_str(), file.compile()?);
        }
        for (feature, info) in self.config_info {
            mapping = mapping.with_config(feature, info);
        }
        for (feature, file) in &self.verify_ops {
            mapping = mapping.with_verify(feature.as_str(), file.compile()?);
        }
        for (capture, n) in self.num_values {
            mapping = mapping.with_num_values(capture, n);
        }
        Ok(mapping)
    }
}

/// A trigger described in YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerFile {
    pub name: String,
    pub os: String,
    #[serde(default)]
    pub description: String,
    pub mapping: MappingFile,
}

impl TriggerFile {
    /// Parse a trigger file.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::from(e).into())
    }

    /// Read and parse a trigger file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::from)?;
        Self::from_yaml(&text)
    }

    /// Compile and validate into a trigger definition.
    pub fn into_definition(self) -> Result<TriggerDefinition> {
        let trigger = TriggerDefinition::new(self.name, self.os)
            .with_description(self.description)
            .with_mapping(self.mapping.into_mapping()?);
        trigger.validate()?;
        Ok(trigger)
    }
}
