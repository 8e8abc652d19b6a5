//! Unconfig/reconfig interface example
//!
//! Runs a built-in IOS-XE interface trigger against a simulated device.
//! The device shuts the interface and strips its L2 configuration when the
//! change is applied, and is restored from its saved state afterwards.
//!
//! # Usage
//!
//! ```bash
//! # Ethernet interface, default datafile
//! cargo run --example unconfig_interface
//!
//! # Another built-in trigger, with a datafile
//! cargo run --example unconfig_interface -- --trigger TriggerUnconfigConfigEthernetSubInterface --datafile trigger.yaml
//!
//! # Leave the interface up to see a verification failure
//! cargo run --example unconfig_interface -- --broken
//! ```

use std::env;
use std::path::PathBuf;

use ferrigger::sim::Features;
use ferrigger::{ConfigChange, SimulatedDevice, TriggerDatafile, TriggerRegistry, TriggerRunner, Value};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    println!("=== Ferrigger Unconfig Interface Example ===\n");

    let registry = TriggerRegistry::global().read().map_err(|e| e.to_string())?;
    println!("Built-in iosxe triggers:");
    for name in registry.names("iosxe") {
        println!("  {}", name);
    }
    drop(registry);

    let trigger = TriggerRegistry::lookup("iosxe", &args.trigger)?;
    println!("\nRunning {} ({})", trigger, trigger.description);

    let datafile = match &args.datafile {
        Some(path) => TriggerDatafile::from_path(path)?,
        None => TriggerDatafile::default(),
    };

    let device = SimulatedDevice::new().with_feature("interface", interfaces());
    let device = if args.broken {
        device.on_apply(|_, _| Ok(()))
    } else {
        device.on_apply(unconfigure)
    };

    let mut runner = TriggerRunner::new(device.clone(), device.clone(), device.clone());
    let report = runner.run(&trigger, &datafile).await?;

    println!("\n{}\n", report);
    println!("Changes applied: {}", device.applied().len());
    println!("Restores: {}", device.restores());

    if !report.is_passed() {
        std::process::exit(1);
    }
    Ok(())
}

/// What `show interfaces` learns on a small access switch.
fn interfaces() -> serde_json::Value {
    json!({"info": {
        "GigabitEthernet1/0/1": {
            "enabled": true,
            "oper_status": "up",
            "port_channel": {"port_channel_member": false},
            "switchport_enable": true,
            "switchport_mode": "access",
            "access_vlan": "10",
            "duplex_mode": "full",
            "mac_address": "0057.d2ff.428c",
            "counters": {"in_pkts": 1204, "out_pkts": 998},
        },
        "GigabitEthernet1/0/1.10": {
            "enabled": true,
            "oper_status": "up",
            "encapsulation": {"encapsulation": "dot1q", "first_dot1q": "10"},
        },
        "GigabitEthernet1/0/2": {
            "enabled": false,
            "oper_status": "down",
            "port_channel": {"port_channel_member": false},
        },
        "Port-channel1": {
            "enabled": true,
            "oper_status": "up",
            "switchport_mode": "trunk",
            "port_channel": {"port_channel_member": false},
        },
    }})
}

/// `default interface` followed by `shutdown`.
fn unconfigure(change: &ConfigChange, features: &mut Features) -> ferrigger::error::Result<()> {
    let name = change
        .mandatory
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let interface = features
        .get_mut("interface")
        .and_then(Value::as_map_mut)
        .and_then(|tree| tree.get_mut("info"))
        .and_then(Value::as_map_mut)
        .and_then(|info| info.get_mut(name))
        .and_then(Value::as_map_mut);

    let Some(interface) = interface else {
        return Err(ferrigger::error::TriggerError::Mutation {
            message: format!("interface {} does not exist", name),
        }
        .into());
    };

    for key in ["access_vlan", "switchport_mode", "trunk_vlans", "vrf", "duplex_mode", "mac_address"] {
        interface.shift_remove(key);
    }
    if interface.contains_key("switchport_enable") {
        interface.insert("switchport_enable".into(), Value::Bool(false));
    }
    interface.insert("enabled".into(), Value::Bool(false));
    interface.insert("oper_status".into(), Value::from("administratively down"));
    Ok(())
}

struct Args {
    trigger: String,
    datafile: Option<PathBuf>,
    broken: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut trigger = "TriggerUnconfigConfigEthernetInterface".to_string();
        let mut datafile = None;
        let mut broken = false;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--trigger" | "-t" => {
                    i += 1;
                    trigger = args.get(i).cloned().unwrap_or(trigger);
                }
                "--datafile" | "-d" => {
                    i += 1;
                    datafile = args.get(i).map(PathBuf::from);
                }
                "--broken" => broken = true,
                "--help" => {
                    println!("Usage: unconfig_interface [--trigger NAME] [--datafile PATH] [--broken]");
                    std::process::exit(0);
                }
                _ => {}
            }
            i += 1;
        }

        Self {
            trigger,
            datafile,
            broken,
        }
    }
}
