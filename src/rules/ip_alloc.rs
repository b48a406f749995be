//! IP allocation offset rule.
//!
//! Carves gateway, reserved, static and DHCP ranges out of each network's
//! first subnet by indexing into its address list, publishes the ingress
//! VIP and service CIDR under the BGP data, and assigns per-host addresses
//! from a compact window at the bottom of each subnet. Offsets come from
//! the ip_alloc_offset rule block; an index that falls outside a subnet is
//! a fatal error.

use super::RuleError;
use crate::ip::Subnet;
use crate::models::SiteDocumentData;
use log::info;
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Offsets for the ip_alloc_offset rule block.
///
/// Negative values index from the end of a subnet.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IpAllocOffsets {
    /// Start of the per-host address window, and reserved-range end for
    /// every network except oob
    pub default: i64,
    /// Reserved-range end for the oob network
    pub oob: i64,
    pub gateway: i64,
    pub ingress_vip: i64,
    /// End of the static range for every network except pxe
    pub static_ip_end: i64,
    /// End of the DHCP range of the pxe network
    pub dhcp_ip_end: i64,
}

/// Apply the offset rule: network ranges, BGP data, then host addresses
pub fn apply(data: &mut SiteDocumentData, offsets: &IpAllocOffsets) -> Result<(), RuleError> {
    let subnets = network_subnets(data)?;
    update_vlan_net_data(data, offsets, &subnets)?;
    update_host_ip_data(data, offsets, &subnets)?;
    Ok(())
}

/// Materialize the first subnet of every non-ingress network.
///
/// Networks may carry multiple subnets; only the first is authoritative.
fn network_subnets(data: &SiteDocumentData) -> Result<BTreeMap<String, Subnet>, RuleError> {
    info!("Extracting network subnets");
    let mut subnets = BTreeMap::new();
    for vlan in &data.network.vlan_network_data {
        if vlan.name == "ingress" {
            continue;
        }
        let cidr = vlan
            .subnet
            .first()
            .ok_or_else(|| RuleError::MissingSubnet(vlan.name.clone()))?;
        subnets.insert(vlan.name.clone(), Subnet::parse(cidr)?);
    }
    Ok(subnets)
}

/// Compute gateway and address ranges for every network, and the BGP
/// ingress data
fn update_vlan_net_data(
    data: &mut SiteDocumentData,
    offsets: &IpAllocOffsets,
    subnets: &BTreeMap<String, Subnet>,
) -> Result<(), RuleError> {
    info!("Applying network design rules: bgp");
    let ingress = data
        .network
        .vlan_by_name("ingress")
        .ok_or_else(|| RuleError::MissingNetwork("ingress".to_string()))?;
    let ingress_cidr = ingress
        .subnet
        .first()
        .ok_or_else(|| RuleError::MissingSubnet("ingress".to_string()))?
        .clone();
    let ingress_vip = Subnet::parse(&ingress_cidr)?
        .address_at(i128::from(offsets.ingress_vip))?
        .to_string();
    data.network.bgp.insert(
        Value::String("ingress_vip".to_string()),
        Value::String(ingress_vip),
    );
    data.network.bgp.insert(
        Value::String("public_service_cidr".to_string()),
        Value::String(ingress_cidr),
    );

    info!("Applying network design rules: vlan");
    for (name, subnet) in subnets {
        let ip_offset = if name == "oob" {
            i128::from(offsets.oob)
        } else {
            i128::from(offsets.default)
        };
        let Some(vlan) = data.network.vlan_by_name_mut(name) else {
            continue;
        };

        vlan.gateway = Some(subnet.address_at(i128::from(offsets.gateway))?.to_string());
        vlan.reserved_start = Some(subnet.address_at(1)?.to_string());
        vlan.reserved_end = Some(subnet.address_at(ip_offset)?.to_string());
        vlan.static_start = Some(subnet.address_at(ip_offset + 1)?.to_string());

        if name == "pxe" {
            // The back half of a PXE subnet belongs to DHCP
            let mid = (subnet.size() / 2) as i128;
            vlan.static_end = Some(subnet.address_at(mid - 1)?.to_string());
            vlan.dhcp_start = Some(subnet.address_at(mid)?.to_string());
            vlan.dhcp_end = Some(subnet.address_at(i128::from(offsets.dhcp_ip_end))?.to_string());
        } else {
            vlan.static_end =
                Some(subnet.address_at(i128::from(offsets.static_ip_end))?.to_string());
        }

        // Only OAM carries a default route
        vlan.routes = if name == "oam" {
            vec!["0.0.0.0/0".to_string()]
        } else {
            Vec::new()
        };
    }
    Ok(())
}

/// Assign host addresses for every role a host has an entry for.
///
/// A single host index runs across the whole site in stored rack/host
/// order, so all hosts draw from the same window of each subnet. Subnets
/// are assumed sized to the host count; indexing past a subnet fails the
/// run.
fn update_host_ip_data(
    data: &mut SiteDocumentData,
    offsets: &IpAllocOffsets,
    subnets: &BTreeMap<String, Subnet>,
) -> Result<(), RuleError> {
    info!("Updating baremetal host addresses");
    let mut host_index: i128 = 0;
    for rack in &mut data.baremetal {
        for host in &mut rack.hosts {
            for role in host.ip.roles_present() {
                let subnet = subnets
                    .get(role)
                    .ok_or_else(|| RuleError::MissingNetwork(role.to_string()))?;
                let address = subnet.address_at(host_index + i128::from(offsets.default))?;
                host.ip.set_by_role(role, &address.to_string());
            }
            host_index += 1;
        }
    }
    Ok(())
}
