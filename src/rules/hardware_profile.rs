//! Hardware profile classification rule.
//!
//! Derives each host's type (genesis, controller, compute) from its
//! hardware profile. The profile table is keyed by site type; the first
//! controller-profile host in sorted (rack name, host name) order becomes
//! the genesis node, and downstream bootstrap sequencing depends on that
//! tie-break staying exactly as it is.

use super::RuleError;
use crate::models::{Host, Rack, SiteDocumentData, DATA_DEFAULT};
use serde::Deserialize;
use std::collections::HashMap;

/// Hardware profile descriptor for one site type
#[derive(Debug, Clone, Deserialize)]
pub struct HardwareProfile {
    pub profile_name: ProfileName,
}

/// Host profile names for each role
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileName {
    pub ctrl: String,
    pub compute: String,
}

/// Classify every host in the site.
///
/// Racks and hosts are iterated in lexicographic name order so genesis
/// selection is deterministic regardless of extraction order.
pub fn apply(
    data: &mut SiteDocumentData,
    rules: &HashMap<String, HardwareProfile>,
) -> Result<(), RuleError> {
    let sitetype = data.site_info.sitetype.as_deref().unwrap_or(DATA_DEFAULT);
    let profile = rules
        .get(sitetype)
        .ok_or_else(|| RuleError::UnknownSiteType(sitetype.to_string()))?;
    let controller_profile = profile.profile_name.ctrl.clone();

    let mut racks: Vec<&mut Rack> = data.baremetal.iter_mut().collect();
    racks.sort_by(|a, b| a.name.cmp(&b.name));

    let mut genesis_assigned = false;
    for rack in racks {
        let mut hosts: Vec<&mut Host> = rack.hosts.iter_mut().collect();
        hosts.sort_by(|a, b| a.name.cmp(&b.name));
        for host in hosts {
            genesis_assigned = classify_host(host, &controller_profile, genesis_assigned);
        }
    }
    Ok(())
}

/// Classify one host, threading the genesis-assigned accumulator through
/// the traversal
fn classify_host(host: &mut Host, controller_profile: &str, genesis_assigned: bool) -> bool {
    if host.host_profile.as_deref() == Some(controller_profile) {
        if genesis_assigned {
            host.host_type = Some("controller".to_string());
        } else {
            host.host_type = Some("genesis".to_string());
        }
        true
    } else {
        host.host_type = Some("compute".to_string());
        genesis_assigned
    }
}
