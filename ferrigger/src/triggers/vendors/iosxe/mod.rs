//! Cisco IOS-XE triggers.

pub mod interface;

use super::super::TriggerDefinition;

/// All built-in IOS-XE triggers.
pub fn triggers() -> Vec<TriggerDefinition> {
    vec![
        interface::physical_trunk(),
        interface::ethernet(),
        interface::ethernet_sub(),
        interface::virtual_trunk(),
    ]
}
