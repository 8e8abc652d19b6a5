//! Cisco NX-OS ops.

use crate::ops::OpsDefinition;

/// vPC domain state from `show vpc`.
pub fn vpc() -> OpsDefinition {
    OpsDefinition::new("vpc")
        .with_leaf("show vpc", "[vpc]", "info[vpc]")
        .unwrap()
}
