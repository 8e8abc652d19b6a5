//! Trigger datafile: timing budgets, recovery method and static overrides.

use std::path::Path;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::path::{CaptureBindings, KeyPattern};

/// How the device configuration is saved before a change and restored
/// afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryMethod {
    /// Configuration checkpoint / archive with rollback.
    #[default]
    Checkpoint,

    /// Reload a saved running-config file.
    SavedConfig,
}

/// Retry budget for one polled step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeout {
    /// Total time allowed for the step.
    #[serde(with = "seconds")]
    pub max_time: Duration,

    /// Wait between attempts.
    #[serde(with = "seconds")]
    pub interval: Duration,

    /// Recovery method; only meaningful for the main `timeout`.
    pub method: RecoveryMethod,
}

impl Default for Timeout {
    fn default() -> Self {
        Self {
            max_time: Duration::from_secs(180),
            interval: Duration::from_secs(15),
            method: RecoveryMethod::default(),
        }
    }
}

impl Timeout {
    /// Create a budget with the default recovery method.
    pub fn new(max_time: Duration, interval: Duration) -> Self {
        Self {
            max_time,
            interval,
            method: RecoveryMethod::default(),
        }
    }

    /// Set the recovery method.
    pub fn with_method(mut self, method: RecoveryMethod) -> Self {
        self.method = method;
        self
    }
}

/// Per-run trigger settings.
///
/// ```yaml
/// timeout: {max_time: 180, interval: 15, method: checkpoint}
/// timeout_recovery: {max_time: 180, interval: 15}
/// tgn_timeout: 60
/// tgn_delay: 10
/// static: {interface: 'Ethernet1/1/1'}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerDatafile {
    /// Budget for learning, applying and verifying.
    pub timeout: Timeout,

    /// Budget for recovery and the final comparison.
    pub timeout_recovery: Timeout,

    /// Time allowed for traffic to resume after recovery.
    #[serde(with = "seconds")]
    pub tgn_timeout: Duration,

    /// Wait between traffic checks.
    #[serde(with = "seconds")]
    pub tgn_delay: Duration,

    /// Fixed values (literal or regex) for captures that are otherwise
    /// learned dynamically.
    #[serde(rename = "static")]
    pub statics: IndexMap<String, String>,
}

impl Default for TriggerDatafile {
    fn default() -> Self {
        Self {
            timeout: Timeout::default(),
            timeout_recovery: Timeout::default(),
            tgn_timeout: Duration::from_secs(60),
            tgn_delay: Duration::from_secs(10),
            statics: IndexMap::new(),
        }
    }
}

impl TriggerDatafile {
    /// Parse a datafile from YAML. Missing fields take their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let datafile: Self = serde_yaml::from_str(yaml).map_err(ConfigError::from)?;
        datafile.validate()?;
        Ok(datafile)
    }

    /// Check every polling budget waits between attempts.
    pub fn validate(&self) -> Result<()> {
        let budgets = [
            ("timeout.interval", self.timeout.interval),
            ("timeout_recovery.interval", self.timeout_recovery.interval),
            ("tgn_delay", self.tgn_delay),
        ];
        for (name, wait) in budgets {
            if wait.is_zero() {
                return Err(ConfigError::InvalidTimeout {
                    name: name.to_string(),
                    message: "the wait between attempts must be greater than zero".to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Read and parse a datafile.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::from)?;
        Self::from_yaml(&text)
    }

    /// Set the main timeout.
    pub fn with_timeout(mut self, timeout: Timeout) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the recovery timeout.
    pub fn with_timeout_recovery(mut self, timeout: Timeout) -> Self {
        self.timeout_recovery = timeout;
        self
    }

    /// Set the traffic budget.
    pub fn with_traffic(mut self, tgn_timeout: Duration, tgn_delay: Duration) -> Self {
        self.tgn_timeout = tgn_timeout;
        self.tgn_delay = tgn_delay;
        self
    }

    /// Fix a capture to a literal value or regex.
    pub fn with_static(mut self, capture: impl Into<String>, value: impl Into<String>) -> Self {
        self.statics.insert(capture.into(), value.into());
        self
    }

    /// Traffic budget as a [`Timeout`].
    pub fn traffic_timeout(&self) -> Timeout {
        Timeout::new(self.tgn_timeout, self.tgn_delay)
    }

    /// Compile the static overrides.
    pub fn static_overrides(&self) -> Result<StaticOverrides> {
        let mut patterns = IndexMap::new();
        for (name, value) in &self.statics {
            let pattern = KeyPattern::parse(value).map_err(|e| ConfigError::InvalidStatic {
                name: name.clone(),
                message: e.to_string(),
            })?;
            patterns.insert(name.clone(), pattern);
        }
        Ok(StaticOverrides(patterns))
    }
}

/// Compiled static overrides.
#[derive(Debug, Clone, Default)]
pub struct StaticOverrides(IndexMap<String, KeyPattern>);

impl StaticOverrides {
    /// Check if a candidate binding set satisfies every override.
    ///
    /// Captures the candidate does not bind are not constrained.
    pub fn accepts(&self, bindings: &CaptureBindings) -> bool {
        self.0.iter().all(|(name, pattern)| {
            bindings
                .get(name)
                .is_none_or(|value| pattern.is_match(value))
        })
    }

    /// Check if there are no overrides.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Durations written as (possibly fractional) seconds.
mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let datafile = TriggerDatafile::from_yaml("{}").unwrap();
        assert_eq!(datafile.timeout.max_time, Duration::from_secs(180));
        assert_eq!(datafile.timeout.interval, Duration::from_secs(15));
        assert_eq!(datafile.timeout.method, RecoveryMethod::Checkpoint);
        assert_eq!(datafile.timeout_recovery, Timeout::default());
        assert_eq!(datafile.tgn_timeout, Duration::from_secs(60));
        assert_eq!(datafile.tgn_delay, Duration::from_secs(10));
        assert!(datafile.statics.is_empty());
    }

    #[test]
    fn test_full_datafile() {
        let yaml = r#"
timeout:
  max_time: 300
  interval: 7.5
  method: saved_config
timeout_recovery:
  max_time: 60
tgn_timeout: 120
static:
  interface: 'Ethernet1/1/1'
"#;
        let datafile = TriggerDatafile::from_yaml(yaml).unwrap();
        assert_eq!(datafile.timeout.max_time, Duration::from_secs(300));
        assert_eq!(datafile.timeout.interval, Duration::from_millis(7500));
        assert_eq!(datafile.timeout.method, RecoveryMethod::SavedConfig);
        assert_eq!(datafile.timeout_recovery.max_time, Duration::from_secs(60));
        assert_eq!(datafile.timeout_recovery.interval, Duration::from_secs(15));
        assert_eq!(datafile.tgn_timeout, Duration::from_secs(120));
        assert_eq!(datafile.tgn_delay, Duration::from_secs(10));
        assert_eq!(datafile.statics.get("interface").map(String::as_str), Some("Ethernet1/1/1"));
    }

    #[test]
    fn test_bad_method() {
        assert!(TriggerDatafile::from_yaml("timeout: {method: reboot}").is_err());
        assert!(TriggerDatafile::from_yaml("tgn_delay: -1").is_err());
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let err = TriggerDatafile::from_yaml("timeout: {max_time: 30, interval: 0}").unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Config(ConfigError::InvalidTimeout { ref name, .. }) if name == "timeout.interval"
        ));
        assert!(TriggerDatafile::from_yaml("timeout_recovery: {interval: 0}").is_err());
        assert!(TriggerDatafile::from_yaml("tgn_delay: 0").is_err());

        let built = TriggerDatafile::default().with_traffic(Duration::from_secs(60), Duration::ZERO);
        assert!(built.validate().is_err());
        assert!(TriggerDatafile::default().validate().is_ok());
    }

    #[test]
    fn test_static_overrides() {
        let datafile = TriggerDatafile::default()
            .with_static("interface", "(?P<interface>Ethernet1.*)")
            .with_static("vrf", "default");
        let statics = datafile.static_overrides().unwrap();

        let ok: CaptureBindings = [("interface", "Ethernet1/1"), ("vrf", "default")].into_iter().collect();
        let wrong_intf: CaptureBindings = [("interface", "Ethernet2/1")].into_iter().collect();
        let unbound: CaptureBindings = [("peer", "10.0.0.1")].into_iter().collect();

        assert!(statics.accepts(&ok));
        assert!(!statics.accepts(&wrong_intf));
        assert!(statics.accepts(&unbound));
    }

    #[test]
    fn test_invalid_static() {
        let datafile = TriggerDatafile::default().with_static("interface", "(Eth");
        let err = datafile.static_overrides().unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Config(ConfigError::InvalidStatic { .. })
        ));
    }
}
