//! Cisco IOS-XE ops.

use crate::ops::OpsDefinition;

const SHOW_ARP: &str = "show arp";
const SHOW_IP_INTERFACE: &str = "show ip interface";
const SHOW_IP_ARP_SUMMARY: &str = "show ip arp summary";
const SHOW_IP_TRAFFIC: &str = "show ip traffic";

/// ARP neighbors, per-interface proxy settings and global statistics.
pub fn arp() -> OpsDefinition {
    let neighbor_src = "[interfaces][(?P<intf>.*)][ipv4][neighbors][(?P<neighbor>.*)]";
    let neighbor_dest = "info[interfaces][(?P<intf>.*)][ipv4][neighbors][(?P<neighbor>.*)]";

    let mut ops = OpsDefinition::new("arp");
    for key in ["ip", "link_layer_address", "origin"] {
        ops = ops
            .with_leaf(
                SHOW_ARP,
                &format!("{}[{}]", neighbor_src, key),
                &format!("{}[{}]", neighbor_dest, key),
            )
            .unwrap();
    }

    for (src, dest) in [("proxy_arp", "proxy_enable"), ("local_proxy_arp", "local_proxy_enable")] {
        ops = ops
            .with_leaf(
                SHOW_IP_INTERFACE,
                &format!("[(?P<intf>.*)][{}]", src),
                &format!("info[interfaces][(?P<intf>.*)][arp_dynamic_learning][{}]", dest),
            )
            .unwrap();
    }

    ops = ops
        .with_leaf(SHOW_IP_ARP_SUMMARY, "[total_entries]", "info[statistics][entries_total]")
        .unwrap()
        .with_leaf(SHOW_IP_ARP_SUMMARY, "[incomp_entries]", "info[statistics][incomplete_total]")
        .unwrap();

    for (src, dest) in [
        ("arp_in_requests", "in_requests_pkts"),
        ("arp_in_replies", "in_replies_pkts"),
        ("arp_out_requests", "out_requests_pkts"),
        ("arp_out_replies", "out_replies_pkts"),
        ("arp_drops_input_full", "in_drops"),
    ] {
        ops = ops
            .with_leaf(
                SHOW_IP_TRAFFIC,
                &format!("[arp_statistics][{}]", src),
                &format!("info[statistics][{}]", dest),
            )
            .unwrap();
    }
    ops
}
