//! Global trigger registry for looking up trigger definitions.

use std::collections::HashMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use super::definition::TriggerDefinition;
use super::vendors;
use crate::error::{Result, TriggerError};

/// Global trigger registry.
static REGISTRY: Lazy<RwLock<TriggerRegistry>> = Lazy::new(|| {
    let mut registry = TriggerRegistry::new();
    registry.register_builtin_triggers();
    RwLock::new(registry)
});

/// Registry of trigger definitions keyed by operating system and name.
#[derive(Debug, Default)]
pub struct TriggerRegistry {
    triggers: HashMap<(String, String), TriggerDefinition>,
}

impl TriggerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            triggers: HashMap::new(),
        }
    }

    /// Get the global registry.
    pub fn global() -> &'static RwLock<TriggerRegistry> {
        &REGISTRY
    }

    /// Look up a trigger in the global registry.
    pub fn lookup(os: &str, name: &str) -> Result<TriggerDefinition> {
        Self::global()
            .read()
            .map_err(|_| TriggerError::Registry {
                message: "Failed to acquire registry lock".to_string(),
            })?
            .get(os, name)
            .cloned()
            .ok_or_else(|| {
                TriggerError::UnknownTrigger {
                    os: os.to_string(),
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// Register a trigger in the global registry.
    pub fn register_global(trigger: TriggerDefinition) -> Result<()> {
        Self::global()
            .write()
            .map_err(|_| TriggerError::Registry {
                message: "Failed to acquire registry lock".to_string(),
            })?
            .register(trigger)
    }

    /// Register built-in triggers.
    fn register_builtin_triggers(&mut self) {
        for trigger in vendors::iosxe::triggers() {
            self.triggers
                .insert((trigger.os.clone(), trigger.name.clone()), trigger);
        }
    }

    /// Validate and register a trigger definition.
    pub fn register(&mut self, trigger: TriggerDefinition) -> Result<()> {
        trigger.validate()?;
        let key = (trigger.os.clone(), trigger.name.clone());
        if self.triggers.contains_key(&key) {
            return Err(TriggerError::AlreadyRegistered {
                os: trigger.os,
                name: trigger.name,
            }
            .into());
        }
        self.triggers.insert(key, trigger);
        Ok(())
    }

    /// Get a trigger by operating system and name.
    pub fn get(&self, os: &str, name: &str) -> Option<&TriggerDefinition> {
        self.triggers.get(&(os.to_string(), name.to_string()))
    }

    /// Check if a trigger is registered.
    pub fn contains(&self, os: &str, name: &str) -> bool {
        self.get(os, name).is_some()
    }

    /// Names of the triggers registered for `os`, sorted.
    pub fn names(&self, os: &str) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .triggers
            .keys()
            .filter(|(o, _)| o == os)
            .map(|(_, name)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Number of registered triggers.
    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}
