//! Unconfigure and reconfigure one interface.
//!
//! Each trigger picks one interface matching its requirements, removes its
//! configuration, checks the learned interface state reflects that, then
//! restores the configuration.

use crate::engine::{ConfigInfo, FeatureRequirements, Mapping};
use crate::path::{not_exists, CaptureBindings};
use crate::snapshot::ExclusionSet;
use crate::steps;
use crate::triggers::TriggerDefinition;

/// Learned feature all interface triggers work on.
pub const FEATURE: &str = "interface";

/// Interface keys that change on their own and are never compared.
pub const INTERFACE_EXCLUDE: &[&str] = &[
    "maker",
    "last_change",
    "in_rate",
    "in_rate_pkts",
    "out_rate",
    "out_rate_pkts",
    "in_octets",
    "in_pkts",
    "in_unicast_pkts",
    "out_octets",
    "out_pkts",
    "out_unicast_pkts",
    "out_multicast_pkts",
    "in_multicast_pkts",
    "last_clear",
    "in_broadcast_pkts",
    "out_broadcast_pkts",
    "bandwidth",
    "load_interval",
    "port_speed",
    "in_crc_errors",
    "in_errors",
    "in_discards",
    "(Tunnel.*)",
    "accounting",
];

/// Exclusions shared by every interface trigger.
pub fn interface_exclude() -> ExclusionSet {
    ExclusionSet::from_patterns(INTERFACE_EXCLUDE).unwrap()
}

/// Subinterfaces of the bound interface go away with it.
pub fn remove_related_subinterface(key: &str, bindings: &CaptureBindings) -> bool {
    bindings
        .get("interface")
        .and_then(|intf| key.strip_prefix(intf))
        .is_some_and(|rest| rest.starts_with('.'))
}

fn unconfig_interface() -> ConfigInfo {
    ConfigInfo::new()
        .with_mandatory("name", "(?P<interface>.*)")
        .with_mandatory("attach", false)
        .with_verify_conf(false)
}

/// Trunk member of a port-channel.
pub fn physical_trunk() -> TriggerDefinition {
    let requirements = FeatureRequirements::new([
        steps!["info", r"(?P<interface>\w+Ethernet[\d\/\.]+)", "switchport_mode", "trunk"],
        steps![
            "info",
            r"(?P<interface>\w+Ethernet[\d\/\.]+)",
            "port_channel",
            "port_channel_int",
            "(?P<port_channel_int>.*)"
        ],
    ])
    .unwrap()
    .with_exclusions(&interface_exclude());

    let verify = FeatureRequirements::new([
        steps!["info", "(?P<interface>.*)", "oper_status", "down"],
        steps!["info", "(?P<interface>.*)", "enabled", false],
        steps!["info", "(?P<interface>.*)", "port_channel", "port_channel_member", false],
        steps!["info", "(?P<interface>.*)", "mac_address", r"([\w\.]+)"],
        steps!["info", "(?P<interface>.*)", "(.*)"],
        steps![
            "info",
            "(?P<port_channel_int>.*)",
            "port_channel",
            "port_channel_member_intfs",
            "(.*)"
        ],
        steps!["info", "(Port-channel.*)", "mac_address", "(.*)"],
        steps!["info", "(Port-channel.*)", "phys_address", "(.*)"],
    ])
    .unwrap()
    .with_exclusions(&interface_exclude())
    .with_strict(true);

    TriggerDefinition::new("TriggerUnconfigConfigPhysicalTrunkInterface", "iosxe")
        .with_description("Unconfigure and reconfigure a physical trunk interface in a port-channel")
        .with_mapping(
            Mapping::new()
                .with_requirements(FEATURE, requirements)
                .with_config(FEATURE, unconfig_interface())
                .with_verify(FEATURE, verify)
                .with_num_values("interface", 1),
        )
}

/// Routed Ethernet interface that is up and not bundled.
pub fn ethernet() -> TriggerDefinition {
    let requirements = FeatureRequirements::new([
        steps!["info", r"(?P<interface>\w+Ethernet[0-9\/]+$)", "enabled", true],
        steps!["info", "(?P<interface>.*)", "port_channel", "port_channel_member", false],
        steps!["info", "(?P<interface>.*)", "oper_status", "up"],
    ])
    .unwrap()
    .with_exclusions(&interface_exclude())
    .with_management_interface(false);

    let verify = FeatureRequirements::new([
        steps!["info", "(?P<interface>.*)", not_exists("access_vlan")],
        steps!["info", "(?P<interface>.*)", not_exists("switchport_mode")],
        steps!["info", "(?P<interface>.*)", not_exists("trunk_vlans")],
        steps!["info", "(?P<interface>.*)", not_exists("vrf")],
        steps!["info", "(?P<interface>.*)", not_exists("duplex_mode")],
        steps!["info", "(?P<interface>.*)", not_exists("mac_address")],
        steps!["info", "(?P<interface>.*)", "switchport_enable", false],
        steps!["info", "(?P<interface>.*)", "enabled", false],
        steps!["info", "(?P<interface>.*)", "oper_status", "(.*down.*)"],
    ])
    .unwrap()
    .with_exclusions(&interface_exclude())
    .with_custom_exclude("remove_related_subinterface", remove_related_subinterface)
    .with_strict(true);

    TriggerDefinition::new("TriggerUnconfigConfigEthernetInterface", "iosxe")
        .with_description("Unconfigure and reconfigure an Ethernet interface")
        .with_mapping(
            Mapping::new()
                .with_requirements(FEATURE, requirements)
                .with_config(FEATURE, unconfig_interface())
                .with_verify(FEATURE, verify)
                .with_num_values("interface", 1),
        )
}

/// Ethernet subinterface that is up.
pub fn ethernet_sub() -> TriggerDefinition {
    const SUBINTERFACE: &str =
        r"(?P<interface>(GigabitEthernet|gigabitEthernet|Ethernet|ethernet)[0-9\/]+\.[0-9]+)";

    let requirements = FeatureRequirements::new([
        steps!["info", SUBINTERFACE, "enabled", true],
        steps!["info", SUBINTERFACE, "oper_status", "up"],
    ])
    .unwrap()
    .with_exclusions(&interface_exclude());

    let verify = FeatureRequirements::new([
        steps!["info", "(?P<interface>.*)", "enabled", false],
        steps!["info", "(?P<interface>.*)", "oper_status", "(.*)"],
    ])
    .unwrap()
    .with_exclusions(&interface_exclude())
    .with_strict(true);

    TriggerDefinition::new("TriggerUnconfigConfigEthernetSubInterface", "iosxe")
        .with_description("Unconfigure and reconfigure an Ethernet subinterface")
        .with_mapping(
            Mapping::new()
                .with_requirements(FEATURE, requirements)
                .with_config(FEATURE, unconfig_interface())
                .with_verify(FEATURE, verify)
                .with_num_values("interface", 1),
        )
}

/// Port-channel in trunk mode.
pub fn virtual_trunk() -> TriggerDefinition {
    let requirements = FeatureRequirements::new([
        steps!["info", r"(?P<interface>[p|P]ort-channel[\d\.]+)", "switchport_mode", "trunk"],
        steps!["info", "(?P<interface>.*)", "port_channel", "port_channel_member", false],
    ])
    .unwrap()
    .with_exclusions(&interface_exclude());

    let verify = FeatureRequirements::new([steps!["info", not_exists("(?P<interface>.*)")]])
        .unwrap()
        .with_exclusions(&interface_exclude())
        .with_strict(true);

    TriggerDefinition::new("TriggerUnconfigConfigVirtualTrunkInterface", "iosxe")
        .with_description("Unconfigure and reconfigure a port-channel trunk interface")
        .with_mapping(
            Mapping::new()
                .with_requirements(FEATURE, requirements)
                .with_config(FEATURE, unconfig_interface())
                .with_verify(FEATURE, verify)
                .with_num_values("interface", 1),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticOverrides;
    use crate::snapshot::{Snapshot, SnapshotStore, Stage, Value};
    use serde_json::json;

    fn before(tree: serde_json::Value) -> SnapshotStore {
        let mut store = SnapshotStore::new();
        store.record(Stage::Before, Snapshot::from_json(FEATURE, tree).unwrap());
        store
    }

    fn pick(trigger: &TriggerDefinition, store: &SnapshotStore) -> Vec<CaptureBindings> {
        let candidates = trigger.mapping.resolve(store).unwrap();
        trigger.mapping.select(&candidates, &StaticOverrides::default())
    }

    #[test]
    fn test_builtin_triggers_validate() {
        for trigger in super::super::triggers() {
            assert!(trigger.validate().is_ok(), "{} is invalid", trigger);
        }
    }

    #[test]
    fn test_remove_related_subinterface() {
        let bindings: CaptureBindings = [("interface", "GigabitEthernet1/0/1")].into_iter().collect();
        assert!(remove_related_subinterface("GigabitEthernet1/0/1.100", &bindings));
        assert!(!remove_related_subinterface("GigabitEthernet1/0/1", &bindings));
        assert!(!remove_related_subinterface("GigabitEthernet1/0/10", &bindings));
        assert!(!remove_related_subinterface("GigabitEthernet1/0/1.100", &CaptureBindings::new()));
    }

    #[test]
    fn test_ethernet_selects_routed_up_interface() {
        let store = before(json!({"info": {
            "GigabitEthernet1/0/1": {
                "enabled": true, "oper_status": "up",
                "port_channel": {"port_channel_member": true},
            },
            "GigabitEthernet1/0/2": {
                "enabled": true, "oper_status": "up",
                "port_channel": {"port_channel_member": false},
                "in_octets": 1000,
            },
            "GigabitEthernet1/0/2.100": {
                "enabled": true, "oper_status": "up",
                "port_channel": {"port_channel_member": false},
            },
            "Loopback0": {"enabled": true, "oper_status": "up"},
        }}));

        let selected = pick(&ethernet(), &store);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].get("interface"), Some("GigabitEthernet1/0/2"));
    }

    #[test]
    fn test_ethernet_skips_management_interface() {
        let store = before(json!({"info": {
            "GigabitEthernet0": {
                "enabled": true, "oper_status": "up", "vrf": "Mgmt-vrf",
                "port_channel": {"port_channel_member": false},
            },
            "GigabitEthernet1/0/1": {
                "enabled": true, "oper_status": "up",
                "port_channel": {"port_channel_member": false},
            },
        }}));

        let selected = pick(&ethernet(), &store);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].get("interface"), Some("GigabitEthernet1/0/1"));
    }

    #[test]
    fn test_ethernet_strict_verification() {
        let trigger = ethernet();
        let up = json!({
            "enabled": true, "oper_status": "up", "switchport_enable": true,
            "switchport_mode": "access", "access_vlan": "10",
            "port_channel": {"port_channel_member": false},
        });
        let mut store = before(json!({"info": {
            "GigabitEthernet1/0/1": up.clone(),
            "GigabitEthernet1/0/1.10": {"enabled": true, "oper_status": "up"},
            "GigabitEthernet1/0/2": up.clone(),
        }}));
        let selected = pick(&trigger, &store);
        assert_eq!(selected[0].get("interface"), Some("GigabitEthernet1/0/1"));

        let shut = json!({
            "enabled": false, "oper_status": "administratively down", "switchport_enable": false,
            "port_channel": {"port_channel_member": false},
        });

        // The bound interface's own subinterface goes away with it.
        store.record(
            Stage::After,
            Snapshot::from_json(FEATURE, json!({"info": {
                "GigabitEthernet1/0/1": shut.clone(),
                "GigabitEthernet1/0/2": up.clone(),
            }}))
            .unwrap(),
        );
        assert!(trigger.mapping.verify(&store, &selected).is_ok());

        store.record(
            Stage::After,
            Snapshot::from_json(FEATURE, json!({"info": {
                "GigabitEthernet1/0/1": shut,
                "GigabitEthernet1/0/1.10": {"enabled": true, "oper_status": "up"},
            }}))
            .unwrap(),
        );
        let failure = trigger.mapping.verify(&store, &selected).unwrap_err();
        assert_eq!(failure.failure.requirement, "strict");
        assert_eq!(failure.failure.reason.path(), "info[GigabitEthernet1/0/2]");
    }

    #[test]
    fn test_ethernet_sub_strict_verification() {
        let trigger = ethernet_sub();
        let mut store = before(json!({"info": {
            "GigabitEthernet1/0/1": {"enabled": true, "oper_status": "up"},
            "GigabitEthernet1/0/1.10": {"enabled": true, "oper_status": "up"},
        }}));
        let selected = pick(&trigger, &store);

        store.record(
            Stage::After,
            Snapshot::from_json(FEATURE, json!({"info": {
                "GigabitEthernet1/0/1": {"enabled": true, "oper_status": "up"},
                "GigabitEthernet1/0/1.10": {"enabled": false, "oper_status": "down"},
            }}))
            .unwrap(),
        );
        assert!(trigger.mapping.verify(&store, &selected).is_ok());

        store.record(
            Stage::After,
            Snapshot::from_json(FEATURE, json!({"info": {
                "GigabitEthernet1/0/1": {"enabled": false, "oper_status": "down"},
                "GigabitEthernet1/0/1.10": {"enabled": false, "oper_status": "down"},
            }}))
            .unwrap(),
        );
        let failure = trigger.mapping.verify(&store, &selected).unwrap_err();
        assert_eq!(failure.failure.requirement, "strict");
    }

    #[test]
    fn test_physical_trunk_binds_port_channel() {
        let store = before(json!({"info": {
            "GigabitEthernet1/0/3": {
                "switchport_mode": "trunk",
                "port_channel": {"port_channel_member": true, "port_channel_int": "Port-channel10"},
            },
            "GigabitEthernet1/0/4": {"switchport_mode": "access"},
        }}));

        let selected = pick(&physical_trunk(), &store);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].get("interface"), Some("GigabitEthernet1/0/3"));
        assert_eq!(selected[0].get("port_channel_int"), Some("Port-channel10"));

        let change = &physical_trunk().mapping.changes(&selected)[0];
        assert_eq!(change.mandatory["name"], Value::from("GigabitEthernet1/0/3"));
        assert_eq!(change.mandatory["attach"], Value::Bool(false));
    }

    #[test]
    fn test_physical_trunk_strict_verification() {
        let trigger = physical_trunk();
        let mut store = before(json!({"info": {
            "GigabitEthernet1/0/3": {
                "enabled": true, "oper_status": "up", "switchport_mode": "trunk",
                "mac_address": "0011.2233.4455",
                "port_channel": {"port_channel_member": true, "port_channel_int": "Port-channel10"},
            },
            "Port-channel10": {
                "oper_status": "up", "mac_address": "0011.2233.4400",
                "port_channel": {"port_channel_member_intfs": ["GigabitEthernet1/0/3"]},
            },
        }}));
        let selected = pick(&trigger, &store);

        let after = json!({"info": {
            "GigabitEthernet1/0/3": {
                "enabled": false, "oper_status": "down",
                "mac_address": "0011.2233.4455",
                "port_channel": {"port_channel_member": false},
            },
            "Port-channel10": {
                "oper_status": "up", "mac_address": "0000.0000.0000",
                "port_channel": {"port_channel_member_intfs": []},
            },
        }});
        store.record(Stage::After, Snapshot::from_json(FEATURE, after).unwrap());
        assert!(trigger.mapping.verify(&store, &selected).is_ok());

        let collateral = json!({"info": {
            "GigabitEthernet1/0/3": {
                "enabled": false, "oper_status": "down",
                "mac_address": "0011.2233.4455",
                "port_channel": {"port_channel_member": false},
            },
            "Port-channel10": {
                "oper_status": "down", "mac_address": "0011.2233.4400",
                "port_channel": {"port_channel_member_intfs": ["GigabitEthernet1/0/3"]},
            },
        }});
        store.record(Stage::After, Snapshot::from_json(FEATURE, collateral).unwrap());
        let failure = trigger.mapping.verify(&store, &selected).unwrap_err();
        assert_eq!(failure.failure.requirement, "strict");
    }

    #[test]
    fn test_ethernet_sub_pattern() {
        let store = before(json!({"info": {
            "GigabitEthernet1/0/1": {"enabled": true, "oper_status": "up"},
            "GigabitEthernet1/0/1.10": {"enabled": true, "oper_status": "up"},
        }}));
        let selected = pick(&ethernet_sub(), &store);
        assert_eq!(selected[0].get("interface"), Some("GigabitEthernet1/0/1.10"));
    }

    #[test]
    fn test_virtual_trunk_verifies_removal() {
        let trigger = virtual_trunk();
        let trunk = json!({"switchport_mode": "trunk", "port_channel": {"port_channel_member": false}});
        let mut store = before(json!({"info": {
            "Port-channel10": trunk.clone(),
            "Port-channel20": trunk.clone(),
        }}));
        let selected = pick(&trigger, &store);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].get("interface"), Some("Port-channel10"));

        store.record(
            Stage::After,
            Snapshot::from_json(FEATURE, json!({"info": {"Port-channel20": trunk}})).unwrap(),
        );
        assert!(trigger.mapping.verify(&store, &selected).is_ok());

        store.record(
            Stage::After,
            Snapshot::from_json(FEATURE, json!({"info": {"Port-channel20": {}}})).unwrap(),
        );
        let failure = trigger.mapping.verify(&store, &selected).unwrap_err();
        assert_eq!(failure.failure.requirement, "strict");

        store.record(
            Stage::After,
            Snapshot::from_json(FEATURE, json!({"info": {"Port-channel10": {}}})).unwrap(),
        );
        assert!(trigger.mapping.verify(&store, &selected).is_err());
    }
}
