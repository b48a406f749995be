//! Site document data model.
//!
//! Typed entities describing one site: general site information, VLAN
//! network data, and baremetal racks with their hosts. Entities are built
//! from the nested mappings that extraction plugins produce, are mutated
//! in place by the design rule engine, and serialize back into the
//! intermediary document shape consumed by manifest templates.
//!
//! Fields without a value are held as `None` internally; the `#CHANGE_ME`
//! placeholder only appears at the serialization boundary (and is accepted
//! back as "unset" when loading). IP addresses are validated leniently: a
//! value that parses is stored in canonical form, anything else is logged
//! as a warning and passed through untouched.

use log::warn;
use serde_yaml::{Mapping, Value};
use std::net::IpAddr;

/// Placeholder emitted for fields that never received a value
pub const DATA_DEFAULT: &str = "#CHANGE_ME";

/// The six host network roles an IPList tracks, in serialization order
pub const IP_ROLES: [&str; 6] = ["oob", "oam", "calico", "overlay", "pxe", "storage"];

/// Validate an IP address string.
///
/// Returns the canonical form if the address parses, otherwise logs a
/// warning and returns the input untouched. Malformed addresses never
/// fail the pipeline.
pub fn parse_ip(addr: &str) -> String {
    match addr.parse::<IpAddr>() {
        Ok(ip) => ip.to_string(),
        Err(_) => {
            warn!("{} is not a valid IP address.", addr);
            addr.to_string()
        }
    }
}

/// Errors produced while building a site document from raw data
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("site document data is not a mapping")]
    NotAMapping,
    #[error("site document data is missing required section '{0}'")]
    MissingSection(&'static str),
}

fn key(name: &str) -> Value {
    Value::String(name.to_string())
}

/// Render a scalar override value as a string, if it is one
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Treat the serialization placeholder as "unset" when reading data back in
fn optional_scalar(value: &Value) -> Option<String> {
    scalar_string(value).filter(|s| s != DATA_DEFAULT)
}

fn sentinel_or(value: &Option<String>) -> Value {
    match value {
        Some(v) => Value::String(v.clone()),
        None => Value::String(DATA_DEFAULT.to_string()),
    }
}

/// Ordered list of servers (DNS, NTP) for a site
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerList {
    servers: Vec<String>,
}

impl ServerList {
    /// Build a list from address strings, validating each entry
    pub fn new<I, S>(servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ServerList {
            servers: servers.into_iter().map(|s| parse_ip(s.as_ref())).collect(),
        }
    }

    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Merge additional servers into the list.
    ///
    /// Accepts a comma-separated string, a sequence of addresses, or a
    /// mapping carrying a `servers` key with either of those shapes.
    /// Entries are appended, not replaced, so merging the same data twice
    /// duplicates entries.
    pub fn merge(&mut self, servers: &Value) {
        match servers {
            Value::String(joined) => {
                for addr in joined.split(',') {
                    self.servers.push(parse_ip(addr));
                }
            }
            Value::Sequence(list) => {
                for entry in list {
                    if let Some(addr) = scalar_string(entry) {
                        self.servers.push(parse_ip(&addr));
                    }
                }
            }
            Value::Mapping(map) => {
                if let Some(inner) = map.get("servers") {
                    self.merge(inner);
                }
            }
            _ => {}
        }
    }
}

impl std::fmt::Display for ServerList {
    /// Comma-joined form used in YAML documents
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.servers.join(","))
    }
}

/// Per-role IP addresses for a baremetal host
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IPList {
    pub oob: Option<String>,
    pub oam: Option<String>,
    pub calico: Option<String>,
    pub overlay: Option<String>,
    pub pxe: Option<String>,
    pub storage: Option<String>,
}

impl IPList {
    pub fn from_value(value: &Value) -> Self {
        let mut ip_list = IPList::default();
        if let Value::Mapping(map) = value {
            for (role, addr) in map {
                match (role.as_str(), optional_scalar(addr)) {
                    (Some(role), Some(addr)) => ip_list.set_by_role(role, &addr),
                    _ => {}
                }
            }
        }
        ip_list
    }

    pub fn get(&self, role: &str) -> Option<&str> {
        let slot = match role {
            "oob" => &self.oob,
            "oam" => &self.oam,
            "calico" => &self.calico,
            "overlay" => &self.overlay,
            "pxe" => &self.pxe,
            "storage" => &self.storage,
            _ => return None,
        };
        slot.as_deref()
    }

    /// Set the address for a role. Unknown roles are logged and ignored.
    pub fn set_by_role(&mut self, role: &str, addr: &str) {
        let parsed = parse_ip(addr);
        match role {
            "oob" => self.oob = Some(parsed),
            "oam" => self.oam = Some(parsed),
            "calico" => self.calico = Some(parsed),
            "overlay" => self.overlay = Some(parsed),
            "pxe" => self.pxe = Some(parsed),
            "storage" => self.storage = Some(parsed),
            _ => warn!("{} role is not defined for IPList.", role),
        }
    }

    /// Roles that currently hold an entry, in serialization order
    pub fn roles_present(&self) -> Vec<&'static str> {
        IP_ROLES
            .iter()
            .copied()
            .filter(|role| self.get(role).is_some())
            .collect()
    }

    pub fn merge_additional_data(&mut self, config: &Mapping) {
        for role in IP_ROLES {
            if let Some(addr) = config.get(role).and_then(optional_scalar) {
                self.set_by_role(role, &addr);
            }
        }
    }

    /// All six roles, with the placeholder standing in for unset slots
    pub fn to_value(&self) -> Value {
        let mut map = Mapping::new();
        for role in IP_ROLES {
            map.insert(
                key(role),
                match self.get(role) {
                    Some(addr) => Value::String(addr.to_string()),
                    None => Value::String(DATA_DEFAULT.to_string()),
                },
            );
        }
        Value::Mapping(map)
    }
}

/// A baremetal host within a rack
#[derive(Debug, Clone, PartialEq)]
pub struct Host {
    pub name: String,
    /// Name of the rack this host belongs to (back-reference only)
    pub rack_name: String,
    /// genesis, controller or compute once classified
    pub host_type: Option<String>,
    pub host_profile: Option<String>,
    pub ip: IPList,
    /// Passthrough attributes not modeled explicitly; merged but never
    /// serialized into the intermediary document
    pub extra: Mapping,
}

impl Host {
    pub fn new(name: &str, rack_name: &str) -> Self {
        Host {
            name: name.to_string(),
            rack_name: rack_name.to_string(),
            host_type: None,
            host_profile: None,
            ip: IPList::default(),
            extra: Mapping::new(),
        }
    }

    pub fn from_value(name: &str, rack_name: &str, value: &Value) -> Self {
        let mut host = Host::new(name, rack_name);
        if let Value::Mapping(map) = value {
            host.host_type = map.get("type").and_then(optional_scalar);
            host.host_profile = map.get("host_profile").and_then(optional_scalar);
            if let Some(ip) = map.get("ip") {
                host.ip = IPList::from_value(ip);
            }
            for (k, v) in map {
                match k.as_str() {
                    Some("type") | Some("host_profile") | Some("ip") => {}
                    _ => {
                        host.extra.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        host
    }

    pub fn merge_additional_data(&mut self, config: &Mapping) {
        if let Some(host_type) = config.get("type").and_then(optional_scalar) {
            self.host_type = Some(host_type);
        }
        if let Some(profile) = config.get("host_profile").and_then(optional_scalar) {
            self.host_profile = Some(profile);
        }
        if let Some(Value::Mapping(ip)) = config.get("ip") {
            self.ip.merge_additional_data(ip);
        }
        for (k, v) in config {
            match k.as_str() {
                Some("type") | Some("host_profile") | Some("ip") => {}
                _ => {
                    self.extra.insert(k.clone(), v.clone());
                }
            }
        }
    }

    pub fn to_value(&self) -> Value {
        let mut map = Mapping::new();
        map.insert(key("host_profile"), sentinel_or(&self.host_profile));
        map.insert(key("ip"), self.ip.to_value());
        map.insert(key("type"), sentinel_or(&self.host_type));
        Value::Mapping(map)
    }
}

/// A named rack holding an ordered list of hosts
#[derive(Debug, Clone, PartialEq)]
pub struct Rack {
    pub name: String,
    pub hosts: Vec<Host>,
}

impl Rack {
    pub fn from_value(name: &str, value: &Value) -> Self {
        let mut hosts = Vec::new();
        if let Value::Mapping(map) = value {
            for (host_name, host_value) in map {
                if let Some(host_name) = host_name.as_str() {
                    hosts.push(Host::from_value(host_name, name, host_value));
                }
            }
        }
        Rack {
            name: name.to_string(),
            hosts,
        }
    }

    pub fn host_by_name(&self, name: &str) -> Option<&Host> {
        self.hosts.iter().find(|host| host.name == name)
    }

    pub fn merge_additional_data(&mut self, config: &Mapping) {
        for (host_name, host_value) in config {
            let Some(host_name) = host_name.as_str() else {
                continue;
            };
            match self.hosts.iter_mut().find(|host| host.name == host_name) {
                Some(host) => {
                    if let Value::Mapping(host_config) = host_value {
                        host.merge_additional_data(host_config);
                    }
                }
                None => {
                    let rack_name = self.name.clone();
                    self.hosts
                        .push(Host::from_value(host_name, &rack_name, host_value));
                }
            }
        }
    }

    pub fn to_value(&self) -> Value {
        let mut map = Mapping::new();
        for host in &self.hosts {
            map.insert(key(&host.name), host.to_value());
        }
        Value::Mapping(map)
    }
}

/// One named VLAN network and its address ranges
#[derive(Debug, Clone, PartialEq)]
pub struct VLANNetworkData {
    pub name: String,
    /// Role of the entry, defaults to the name
    pub role: String,
    pub vlan: Option<Value>,
    /// Subnet CIDRs; the first entry is authoritative
    pub subnet: Vec<String>,
    pub routes: Vec<String>,
    pub gateway: Option<String>,
    pub dhcp_start: Option<String>,
    pub dhcp_end: Option<String>,
    pub static_start: Option<String>,
    pub static_end: Option<String>,
    pub reserved_start: Option<String>,
    pub reserved_end: Option<String>,
}

impl VLANNetworkData {
    pub fn new(name: &str) -> Self {
        VLANNetworkData {
            name: name.to_string(),
            role: name.to_string(),
            vlan: None,
            subnet: Vec::new(),
            routes: Vec::new(),
            gateway: None,
            dhcp_start: None,
            dhcp_end: None,
            static_start: None,
            static_end: None,
            reserved_start: None,
            reserved_end: None,
        }
    }

    pub fn from_value(name: &str, value: &Value) -> Self {
        let mut data = VLANNetworkData::new(name);
        if let Value::Mapping(map) = value {
            if let Some(role) = map.get("role").and_then(|v| v.as_str()) {
                data.role = role.to_string();
            }
            data.vlan = map.get("vlan").cloned();
            if let Some(Value::Sequence(subnets)) = map.get("subnet") {
                data.subnet
                    .extend(subnets.iter().filter_map(scalar_string));
            }
            if let Some(Value::Sequence(routes)) = map.get("routes") {
                data.routes.extend(routes.iter().filter_map(scalar_string));
            }
            data.gateway = map.get("gateway").and_then(optional_scalar);
            data.dhcp_start = map.get("dhcp_start").and_then(optional_scalar);
            data.dhcp_end = map.get("dhcp_end").and_then(optional_scalar);
            data.static_start = map.get("static_start").and_then(optional_scalar);
            data.static_end = map.get("static_end").and_then(optional_scalar);
            data.reserved_start = map.get("reserved_start").and_then(optional_scalar);
            data.reserved_end = map.get("reserved_end").and_then(optional_scalar);
        }
        data
    }

    pub fn merge_additional_data(&mut self, config: &Mapping) {
        if let Some(vlan) = config.get("vlan") {
            self.vlan = Some(vlan.clone());
        }
        if let Some(Value::Sequence(subnets)) = config.get("subnet") {
            self.subnet.extend(subnets.iter().filter_map(scalar_string));
        }
        if let Some(Value::Sequence(routes)) = config.get("routes") {
            self.routes.extend(routes.iter().filter_map(scalar_string));
        }
        for (field, slot) in [
            ("gateway", &mut self.gateway),
            ("dhcp_start", &mut self.dhcp_start),
            ("dhcp_end", &mut self.dhcp_end),
            ("static_start", &mut self.static_start),
            ("static_end", &mut self.static_end),
            ("reserved_start", &mut self.reserved_start),
            ("reserved_end", &mut self.reserved_end),
        ] {
            if let Some(value) = config.get(field).and_then(optional_scalar) {
                *slot = Some(value);
            }
        }
    }

    /// Serialized under the role name; empty fields and incomplete range
    /// pairs are left out
    pub fn to_value(&self) -> (Value, Value) {
        let mut map = Mapping::new();
        if let Some(vlan) = &self.vlan {
            map.insert(key("vlan"), vlan.clone());
        }
        if !self.subnet.is_empty() {
            map.insert(
                key("subnet"),
                Value::Sequence(self.subnet.iter().map(|s| key(s)).collect()),
            );
        }
        if !self.routes.is_empty() {
            map.insert(
                key("routes"),
                Value::Sequence(self.routes.iter().map(|r| key(r)).collect()),
            );
        }
        if let Some(gateway) = &self.gateway {
            map.insert(key("gateway"), key(gateway));
        }
        if let (Some(start), Some(end)) = (&self.dhcp_start, &self.dhcp_end) {
            map.insert(key("dhcp_start"), key(start));
            map.insert(key("dhcp_end"), key(end));
        }
        if let (Some(start), Some(end)) = (&self.static_start, &self.static_end) {
            map.insert(key("static_start"), key(start));
            map.insert(key("static_end"), key(end));
        }
        if let (Some(start), Some(end)) = (&self.reserved_start, &self.reserved_end) {
            map.insert(key("reserved_start"), key(start));
            map.insert(key("reserved_end"), key(end));
        }
        (key(&self.role), Value::Mapping(map))
    }
}

/// Site network configuration: VLAN networks plus BGP data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Network {
    pub vlan_network_data: Vec<VLANNetworkData>,
    /// Free-form BGP key/values; the rule engine fills in ingress_vip and
    /// public_service_cidr
    pub bgp: Mapping,
}

impl Network {
    pub fn from_value(value: &Value) -> Self {
        let mut network = Network::default();
        if let Value::Mapping(map) = value {
            if let Some(Value::Mapping(bgp)) = map.get("bgp") {
                network.bgp = bgp.clone();
            }
            if let Some(Value::Mapping(vlans)) = map.get("vlan_network_data") {
                for (name, vlan_value) in vlans {
                    if let Some(name) = name.as_str() {
                        network
                            .vlan_network_data
                            .push(VLANNetworkData::from_value(name, vlan_value));
                    }
                }
            }
        }
        network
    }

    pub fn vlan_by_name(&self, name: &str) -> Option<&VLANNetworkData> {
        self.vlan_network_data.iter().find(|vlan| vlan.name == name)
    }

    pub fn vlan_by_name_mut(&mut self, name: &str) -> Option<&mut VLANNetworkData> {
        self.vlan_network_data
            .iter_mut()
            .find(|vlan| vlan.name == name)
    }

    pub fn vlan_by_role(&self, role: &str) -> Option<&VLANNetworkData> {
        self.vlan_network_data.iter().find(|vlan| vlan.role == role)
    }

    pub fn merge_additional_data(&mut self, config: &Mapping) {
        if let Some(Value::Mapping(bgp)) = config.get("bgp") {
            for (k, v) in bgp {
                self.bgp.insert(k.clone(), v.clone());
            }
        }
        if let Some(Value::Mapping(vlans)) = config.get("vlan_network_data") {
            for (name, vlan_value) in vlans {
                let Some(name) = name.as_str() else {
                    continue;
                };
                match self.vlan_by_name_mut(name) {
                    Some(vlan) => {
                        if let Value::Mapping(vlan_config) = vlan_value {
                            vlan.merge_additional_data(vlan_config);
                        }
                    }
                    None => {
                        self.vlan_network_data
                            .push(VLANNetworkData::from_value(name, vlan_value));
                    }
                }
            }
        }
    }

    pub fn to_value(&self) -> Value {
        let mut map = Mapping::new();
        if !self.bgp.is_empty() {
            map.insert(key("bgp"), Value::Mapping(self.bgp.clone()));
        }
        let mut vlans = Mapping::new();
        for vlan in &self.vlan_network_data {
            let (role, vlan_value) = vlan.to_value();
            vlans.insert(role, vlan_value);
        }
        map.insert(key("vlan_network_data"), Value::Mapping(vlans));
        Value::Mapping(map)
    }
}

/// General site information and shared services
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteInfo {
    pub name: String,
    pub physical_location_id: Option<Value>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub corridor: Option<String>,
    pub sitetype: Option<String>,
    pub domain: Option<String>,
    pub dns: ServerList,
    pub ntp: ServerList,
    pub ldap: Mapping,
}

impl SiteInfo {
    pub fn from_value(value: &Value) -> Self {
        let mut info = SiteInfo::default();
        if let Value::Mapping(map) = value {
            if let Some(name) = map.get("name").and_then(|v| v.as_str()) {
                info.name = name.to_string();
            }
            info.physical_location_id = map
                .get("physical_location_id")
                .filter(|v| v.as_str() != Some(DATA_DEFAULT))
                .cloned();
            info.state = map.get("state").and_then(optional_scalar);
            info.country = map.get("country").and_then(optional_scalar);
            info.corridor = map.get("corridor").and_then(optional_scalar);
            info.sitetype = map.get("sitetype").and_then(optional_scalar);
            info.domain = map.get("domain").and_then(optional_scalar);
            if let Some(dns) = map.get("dns") {
                info.dns.merge(dns);
            }
            if let Some(ntp) = map.get("ntp") {
                info.ntp.merge(ntp);
            }
            if let Some(Value::Mapping(ldap)) = map.get("ldap") {
                info.ldap = ldap.clone();
            }
        }
        info
    }

    pub fn merge_additional_data(&mut self, config: &Mapping) {
        if let Some(name) = config.get("name").and_then(|v| v.as_str()) {
            self.name = name.to_string();
        }
        if let Some(id) = config.get("physical_location_id") {
            self.physical_location_id = Some(id.clone());
        }
        for (field, slot) in [
            ("state", &mut self.state),
            ("country", &mut self.country),
            ("corridor", &mut self.corridor),
            ("sitetype", &mut self.sitetype),
            ("domain", &mut self.domain),
        ] {
            if let Some(value) = config.get(field).and_then(optional_scalar) {
                *slot = Some(value);
            }
        }
        if let Some(dns) = config.get("dns") {
            self.dns.merge(dns);
        }
        if let Some(ntp) = config.get("ntp") {
            self.ntp.merge(ntp);
        }
        if let Some(Value::Mapping(ldap)) = config.get("ldap") {
            for (k, v) in ldap {
                self.ldap.insert(k.clone(), v.clone());
            }
        }
    }

    pub fn to_value(&self) -> Value {
        let mut map = Mapping::new();
        map.insert(key("corridor"), sentinel_or(&self.corridor));
        map.insert(key("country"), sentinel_or(&self.country));
        map.insert(key("dns"), key(&self.dns.to_string()));
        map.insert(key("domain"), sentinel_or(&self.domain));
        map.insert(key("ldap"), Value::Mapping(self.ldap.clone()));
        map.insert(key("name"), key(&self.name));
        map.insert(key("ntp"), key(&self.ntp.to_string()));
        map.insert(
            key("physical_location_id"),
            self.physical_location_id
                .clone()
                .unwrap_or_else(|| Value::String(DATA_DEFAULT.to_string())),
        );
        map.insert(key("sitetype"), sentinel_or(&self.sitetype));
        map.insert(key("state"), sentinel_or(&self.state));
        Value::Mapping(map)
    }
}

/// Aggregate root for all data describing one site
#[derive(Debug, Clone, PartialEq)]
pub struct SiteDocumentData {
    pub site_info: SiteInfo,
    pub network: Network,
    /// Racks in extraction order; rule evaluation re-sorts by name where
    /// determinism requires it
    pub baremetal: Vec<Rack>,
    pub storage: Option<Mapping>,
}

impl SiteDocumentData {
    /// Build the aggregate from a nested mapping shaped like the
    /// intermediary document
    pub fn from_value(value: &Value) -> Result<Self, ModelError> {
        let Value::Mapping(map) = value else {
            return Err(ModelError::NotAMapping);
        };

        let site_info = map
            .get("site_info")
            .map(SiteInfo::from_value)
            .ok_or(ModelError::MissingSection("site_info"))?;
        let network = map
            .get("network")
            .map(Network::from_value)
            .ok_or(ModelError::MissingSection("network"))?;

        let mut baremetal = Vec::new();
        let racks = map
            .get("baremetal")
            .ok_or(ModelError::MissingSection("baremetal"))?;
        if let Value::Mapping(racks) = racks {
            for (rack_name, rack_value) in racks {
                if let Some(rack_name) = rack_name.as_str() {
                    baremetal.push(Rack::from_value(rack_name, rack_value));
                }
            }
        }

        let storage = match map.get("storage") {
            Some(Value::Mapping(storage)) => Some(storage.clone()),
            _ => None,
        };

        Ok(SiteDocumentData {
            site_info,
            network,
            baremetal,
            storage,
        })
    }

    pub fn rack_by_name(&self, name: &str) -> Option<&Rack> {
        self.baremetal.iter().find(|rack| rack.name == name)
    }

    /// All hosts across the site with the given type
    pub fn hosts_by_type(&self, host_type: &str) -> Vec<&Host> {
        self.baremetal
            .iter()
            .flat_map(|rack| rack.hosts.iter())
            .filter(|host| host.host_type.as_deref() == Some(host_type))
            .collect()
    }

    pub fn merge_additional_data(&mut self, config: &Value) {
        let Value::Mapping(config) = config else {
            warn!("Additional configuration is not a mapping; nothing merged.");
            return;
        };
        if let Some(Value::Mapping(site_info)) = config.get("site_info") {
            self.site_info.merge_additional_data(site_info);
        }
        if let Some(Value::Mapping(storage)) = config.get("storage") {
            match &mut self.storage {
                Some(existing) => {
                    for (k, v) in storage {
                        existing.insert(k.clone(), v.clone());
                    }
                }
                None => self.storage = Some(storage.clone()),
            }
        }
        if let Some(Value::Mapping(network)) = config.get("network") {
            self.network.merge_additional_data(network);
        }
        if let Some(Value::Mapping(racks)) = config.get("baremetal") {
            for (rack_name, rack_value) in racks {
                let Some(rack_name) = rack_name.as_str() else {
                    continue;
                };
                match self
                    .baremetal
                    .iter_mut()
                    .find(|rack| rack.name == rack_name)
                {
                    Some(rack) => {
                        if let Value::Mapping(rack_config) = rack_value {
                            rack.merge_additional_data(rack_config);
                        }
                    }
                    None => self.baremetal.push(Rack::from_value(rack_name, rack_value)),
                }
            }
        }
    }

    /// Serialize into the nested mapping consumed by templates and
    /// written to the intermediary file
    pub fn to_value(&self) -> Value {
        let mut baremetal = Mapping::new();
        for rack in &self.baremetal {
            baremetal.insert(key(&rack.name), rack.to_value());
        }

        let mut map = Mapping::new();
        map.insert(key("baremetal"), Value::Mapping(baremetal));
        map.insert(key("network"), self.network.to_value());
        map.insert(key("site_info"), self.site_info.to_value());
        map.insert(
            key("storage"),
            match &self.storage {
                Some(storage) => Value::Mapping(storage.clone()),
                None => Value::Null,
            },
        );
        Value::Mapping(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_parse_ip_canonical_and_passthrough() {
        assert_eq!("10.0.220.1", parse_ip("10.0.220.1"));
        assert_eq!("fd00:900::1", parse_ip("fd00:0900:0000::1"));
        assert_eq!("not-an-address", parse_ip("not-an-address"));
    }

    #[test]
    fn test_server_list_round_trip() {
        let servers = ["8.8.8.8", "8.8.4.4", "1.1.1.1"];
        let list = ServerList::new(servers);
        assert_eq!("8.8.8.8,8.8.4.4,1.1.1.1", list.to_string());
    }

    #[test]
    fn test_server_list_merge_accepts_string_and_sequence() {
        let mut list = ServerList::new(["8.8.8.8"]);
        list.merge(&yaml(r#""9.9.9.9,1.0.0.1""#));
        list.merge(&yaml("[4.2.2.2]"));
        list.merge(&yaml("servers: 5.5.5.5"));
        assert_eq!("8.8.8.8,9.9.9.9,1.0.0.1,4.2.2.2,5.5.5.5", list.to_string());
    }

    #[test]
    fn test_server_list_repeated_merge_duplicates_entries() {
        // Merging appends unconditionally; running the same merge twice
        // doubles the list. Current behavior, asserted on purpose.
        let mut list = ServerList::new(["8.8.8.8"]);
        let overrides = yaml(r#""9.9.9.9""#);
        list.merge(&overrides);
        list.merge(&overrides);
        assert_eq!("8.8.8.8,9.9.9.9,9.9.9.9", list.to_string());
    }

    #[test]
    fn test_ip_list_set_by_role() {
        let mut ip = IPList::default();
        ip.set_by_role("oam", "10.0.220.10");
        assert_eq!(Some("10.0.220.10"), ip.get("oam"));

        // Unknown roles are ignored
        ip.set_by_role("mgmt", "10.0.220.11");
        assert_eq!(None, ip.get("mgmt"));
        assert_eq!(vec!["oam"], ip.roles_present());
    }

    #[test]
    fn test_ip_list_serializes_placeholder_for_unset() {
        let mut ip = IPList::default();
        ip.set_by_role("pxe", "30.30.4.20");
        let value = ip.to_value();
        let map = value.as_mapping().unwrap();
        assert_eq!(
            DATA_DEFAULT,
            map.get("oob").unwrap().as_str().unwrap()
        );
        assert_eq!(
            "30.30.4.20",
            map.get("pxe").unwrap().as_str().unwrap()
        );
    }

    #[test]
    fn test_ip_list_from_value_treats_placeholder_as_unset() {
        let ip = IPList::from_value(&yaml("{oam: 10.0.220.10, oob: '#CHANGE_ME'}"));
        assert_eq!(Some("10.0.220.10"), ip.get("oam"));
        assert_eq!(None, ip.get("oob"));
    }

    #[test]
    fn test_host_merge_overwrites_and_delegates() {
        let mut host = Host::from_value(
            "cab2r01c12",
            "cab2",
            &yaml("{host_profile: dp-r720, type: compute, ip: {oam: 10.0.220.10}}"),
        );
        let overrides = yaml("{type: controller, ip: {oam: 10.0.220.20}, fixup: extra}");
        host.merge_additional_data(overrides.as_mapping().unwrap());

        assert_eq!(Some("controller"), host.host_type.as_deref());
        assert_eq!(Some("dp-r720"), host.host_profile.as_deref());
        assert_eq!(Some("10.0.220.20"), host.ip.get("oam"));
        assert!(host.extra.contains_key("fixup"));
    }

    #[test]
    fn test_rack_merge_appends_unknown_host() {
        let mut rack = Rack::from_value(
            "cab2",
            &yaml("{cab2r01c12: {host_profile: cp-r720}}"),
        );
        let overrides = yaml("{cab2r01c13: {host_profile: dp-r720}}");
        rack.merge_additional_data(overrides.as_mapping().unwrap());

        assert_eq!(2, rack.hosts.len());
        let added = rack.host_by_name("cab2r01c13").unwrap();
        assert_eq!(Some("dp-r720"), added.host_profile.as_deref());
        assert_eq!("cab2", added.rack_name);
    }

    #[test]
    fn test_vlan_merge_appends_subnets_overwrites_ranges() {
        let mut vlan = VLANNetworkData::from_value(
            "oam",
            &yaml("{subnet: [10.0.220.0/26], vlan: 21, static_start: 10.0.220.5}"),
        );
        let overrides = yaml("{subnet: [10.0.221.0/26], vlan: 22, static_start: 10.0.220.9}");
        vlan.merge_additional_data(overrides.as_mapping().unwrap());

        assert_eq!(vec!["10.0.220.0/26", "10.0.221.0/26"], vlan.subnet);
        assert_eq!(Some(22), vlan.vlan.as_ref().and_then(|v| v.as_u64()));
        assert_eq!(Some("10.0.220.9"), vlan.static_start.as_deref());
    }

    #[test]
    fn test_vlan_to_value_elides_incomplete_pairs() {
        let mut vlan = VLANNetworkData::new("pxe");
        vlan.subnet.push("30.30.4.0/25".to_string());
        vlan.dhcp_start = Some("30.30.4.64".to_string());
        // dhcp_end missing, so neither dhcp field may serialize
        let (role, value) = vlan.to_value();
        assert_eq!("pxe", role.as_str().unwrap());
        let map = value.as_mapping().unwrap();
        assert!(!map.contains_key("dhcp_start"));
        assert!(map.contains_key("subnet"));
    }

    #[test]
    fn test_network_merge_by_name_or_append() {
        let mut network = Network::from_value(&yaml(
            "{vlan_network_data: {oam: {subnet: [10.0.220.0/26]}}}",
        ));
        network.merge_additional_data(
            yaml("{bgp: {asnumber: 64671}, vlan_network_data: {oam: {vlan: 21}, ingress: {subnet: [10.0.222.0/26]}}}")
                .as_mapping()
                .unwrap(),
        );

        assert_eq!(2, network.vlan_network_data.len());
        assert!(network.vlan_by_name("ingress").is_some());
        assert_eq!(
            Some(21),
            network
                .vlan_by_name("oam")
                .and_then(|v| v.vlan.as_ref())
                .and_then(|v| v.as_u64())
        );
        assert_eq!(
            Some(64671),
            network
                .bgp
                .get("asnumber")
                .and_then(|v| v.as_u64())
        );
    }

    #[test]
    fn test_site_info_serializes_server_lists_joined() {
        let info = SiteInfo::from_value(&yaml(
            "{name: test-site, sitetype: foundry, dns: {servers: '8.8.8.8,8.8.4.4'}, ntp: {servers: [10.0.0.1]}}",
        ));
        let value = info.to_value();
        let map = value.as_mapping().unwrap();
        assert_eq!(
            "8.8.8.8,8.8.4.4",
            map.get("dns").unwrap().as_str().unwrap()
        );
        assert_eq!(
            "10.0.0.1",
            map.get("ntp").unwrap().as_str().unwrap()
        );
        assert_eq!(
            DATA_DEFAULT,
            map.get("country").unwrap().as_str().unwrap()
        );
    }

    #[test]
    fn test_site_document_round_trip_shape() {
        let document = yaml(
            r#"
site_info:
  name: test-site
  sitetype: foundry
network:
  vlan_network_data:
    oam:
      subnet: [10.0.220.0/26]
baremetal:
  cab2:
    cab2r01c12:
      host_profile: cp-r720
      ip:
        oam: 10.0.220.10
storage:
  ceph:
    controller:
      osd_count: 6
"#,
        );
        let data = SiteDocumentData::from_value(&document).unwrap();
        assert_eq!("test-site", data.site_info.name);
        assert_eq!(1, data.baremetal.len());

        let out = data.to_value();
        let map = out.as_mapping().unwrap();
        for section in ["baremetal", "network", "site_info", "storage"] {
            assert!(map.contains_key(section));
        }
    }

    #[test]
    fn test_site_document_missing_section() {
        let err = SiteDocumentData::from_value(&yaml("{site_info: {name: x}}"));
        assert!(err.is_err());
    }

    #[test]
    fn test_site_document_merge_appends_rack() {
        let mut data = SiteDocumentData::from_value(&yaml(
            r#"
site_info: {name: test-site}
network: {vlan_network_data: {}}
baremetal:
  cab2:
    cab2r01c12: {host_profile: cp-r720}
"#,
        ))
        .unwrap();
        data.merge_additional_data(&yaml(
            "{baremetal: {cab3: {cab3r01c12: {host_profile: dp-r720}}}, storage: {ceph: {}}}",
        ));

        assert_eq!(2, data.baremetal.len());
        assert!(data.rack_by_name("cab3").is_some());
        assert!(data.storage.is_some());
    }
}
