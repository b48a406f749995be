//! Intermediary document processing.
//!
//! This module coordinates the overall document generation process for
//! one site: applying the design rules to the extracted data, capturing
//! the genesis node, gating on the optional schema, and serializing the
//! result as the intermediary document handed to manifest rendering.

use crate::models::{Host, IPList, SiteDocumentData};
use crate::rules::{self, RulesConfig};
use crate::validator;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{debug, info};
use serde_yaml::Value;
use std::path::{Path, PathBuf};

/// Identity of the bootstrap host, exposed for downstream tooling
#[derive(Debug, Clone, PartialEq)]
pub struct GenesisNode {
    pub name: String,
    pub ip: IPList,
}

impl From<&Host> for GenesisNode {
    fn from(host: &Host) -> Self {
        GenesisNode {
            name: host.name.clone(),
            ip: host.ip.clone(),
        }
    }
}

/// Applies design rules to one site's extracted data and produces the
/// intermediary document
#[derive(Debug)]
pub struct IntermediaryProcessor {
    region_name: String,
    data: SiteDocumentData,
    genesis_node: Option<GenesisNode>,
}

impl IntermediaryProcessor {
    pub fn new(region_name: &str, data: SiteDocumentData) -> Self {
        IntermediaryProcessor {
            region_name: region_name.to_string(),
            data,
            genesis_node: None,
        }
    }

    pub fn region_name(&self) -> &str {
        &self.region_name
    }

    pub fn data(&self) -> &SiteDocumentData {
        &self.data
    }

    /// The genesis node captured by the last `generate_intermediary` run
    pub fn genesis_node(&self) -> Option<&GenesisNode> {
        self.genesis_node.as_ref()
    }

    /// Apply the design rules and, when a schema is supplied, validate
    /// the resulting document before it goes anywhere.
    ///
    /// Any rule or validation failure aborts with no partial output.
    pub fn generate_intermediary(
        &mut self,
        rules: &RulesConfig,
        schema: Option<&serde_json::Value>,
    ) -> Result<()> {
        info!("Start: generate intermediary");
        rules::apply_design_rules(&mut self.data, rules)?;

        self.genesis_node = self
            .data
            .hosts_by_type("genesis")
            .first()
            .map(|host| GenesisNode::from(*host));
        match &self.genesis_node {
            Some(genesis) => debug!("Genesis node: {}", genesis.name),
            None => debug!("No genesis node in site data"),
        }

        if let Some(schema) = schema {
            info!("Validating intermediary data");
            validator::validate_intermediary(&self.to_document(), schema)?;
        }
        Ok(())
    }

    /// Serialized intermediary document with the region name stamped in
    pub fn to_document(&self) -> Value {
        let mut document = self.data.to_value();
        if let Value::Mapping(map) = &mut document {
            map.insert(
                Value::String("region_name".to_string()),
                Value::String(self.region_name.clone()),
            );
        }
        document
    }

    /// Write `<region_name>_intermediary.yaml` into the given directory
    /// and return the file's path
    pub fn dump_intermediary_file(&self, intermediary_dir: &Path) -> Result<PathBuf> {
        let file_name = format!("{}_intermediary.yaml", self.region_name);
        let outfile = intermediary_dir.join(file_name);
        info!("Writing intermediary file: {}", outfile.display());

        let yaml = serde_yaml::to_string(&self.to_document())?;
        std::fs::write(&outfile, yaml)
            .wrap_err_with(|| format!("Failed to write intermediary file '{}'", outfile.display()))?;
        Ok(outfile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SiteDocumentData;

    fn site_yaml() -> &'static str {
        r#"
site_info:
  name: test-site
  sitetype: foundry
network:
  vlan_network_data:
    oam:
      subnet: [10.0.220.0/26]
    oob:
      subnet: [10.0.220.128/27]
    calico:
      subnet: [30.29.1.0/25]
    overlay:
      subnet: [30.19.0.0/25]
    pxe:
      subnet: [30.30.4.0/25]
    storage:
      subnet: [30.31.1.0/25]
    ingress:
      subnet: [10.0.221.0/26]
baremetal:
  cab1:
    cab1r01c12:
      host_profile: cp-r720
      ip:
        oam: '#CHANGE_ME'
        pxe: '#CHANGE_ME'
    cab1r01c13:
      host_profile: dp-r720
      ip:
        oam: '#CHANGE_ME'
"#
    }

    fn processor() -> IntermediaryProcessor {
        let value: Value = serde_yaml::from_str(site_yaml()).unwrap();
        let data = SiteDocumentData::from_value(&value).unwrap();
        IntermediaryProcessor::new("test", data)
    }

    #[test]
    fn test_generate_intermediary_captures_genesis() {
        let mut processor = processor();
        let rules = RulesConfig::load_default().unwrap();
        processor.generate_intermediary(&rules, None).unwrap();

        let genesis = processor.genesis_node().unwrap();
        assert_eq!("cab1r01c12", genesis.name);
        assert_eq!(Some("10.0.220.10"), genesis.ip.get("oam"));
    }

    #[test]
    fn test_document_carries_region_name() {
        let processor = processor();
        let document = processor.to_document();
        assert_eq!(
            Some("test"),
            document.get("region_name").and_then(Value::as_str)
        );
        assert!(document.get("baremetal").is_some());
    }

    #[test]
    fn test_dump_intermediary_file_naming() {
        let dir = tempfile::tempdir().unwrap();
        let mut processor = processor();
        let rules = RulesConfig::load_default().unwrap();
        processor.generate_intermediary(&rules, None).unwrap();

        let outfile = processor.dump_intermediary_file(dir.path()).unwrap();
        assert_eq!(
            Some("test_intermediary.yaml"),
            outfile.file_name().and_then(|name| name.to_str())
        );

        let written: Value =
            serde_yaml::from_str(&std::fs::read_to_string(&outfile).unwrap()).unwrap();
        assert_eq!(
            Some("test"),
            written.get("region_name").and_then(Value::as_str)
        );
    }

    #[test]
    fn test_validation_gate_failure_aborts() {
        let mut processor = processor();
        let rules = RulesConfig::load_default().unwrap();
        let schema = serde_json::json!({
            "type": "object",
            "properties": {
                "site_info": {
                    "type": "object",
                    "required": ["name", "sitetype", "domain_name"]
                }
            }
        });
        assert!(processor
            .generate_intermediary(&rules, Some(&schema))
            .is_err());
    }
}
