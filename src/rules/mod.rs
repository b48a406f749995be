//! Design rule engine.
//!
//! Applies a fixed, ordered pipeline of named rules to a populated site
//! document: hardware-profile classification first, then IP allocation
//! offsets. Each rule consumes its own configuration block. Rules run
//! sequentially and unconditionally; the first failure aborts the run
//! with no partial-application recovery.
//!
//! Rule names in the configuration file resolve to a closed set of
//! handlers here. An unrecognized rule name is a configuration error.

pub mod hardware_profile;
pub mod ip_alloc;

pub use hardware_profile::{HardwareProfile, ProfileName};
pub use ip_alloc::IpAllocOffsets;

use crate::ip::SubnetError;
use crate::models::SiteDocumentData;
use log::info;
use serde_yaml::Value;
use std::collections::HashMap;

/// Rule configuration packaged with the binary
const DEFAULT_RULES: &str = include_str!("../../config/rules.yaml");

/// Errors raised while loading or applying design rules
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("failed to parse rules configuration: {0}")]
    InvalidRules(#[from] serde_yaml::Error),
    #[error("failed to read rules file: {0}")]
    UnreadableRules(#[from] std::io::Error),
    #[error("rule entry '{0}' has no name")]
    UnnamedRule(String),
    #[error("rule '{0}' is missing its configuration block")]
    MissingBlock(String),
    #[error("unknown design rule '{0}'")]
    UnknownRule(String),
    #[error("rules configuration does not define rule '{0}'")]
    MissingRule(&'static str),
    #[error("no hardware profile defined for site type '{0}'")]
    UnknownSiteType(String),
    #[error("network '{0}' has no subnet defined")]
    MissingSubnet(String),
    #[error("no '{0}' network is defined for the site")]
    MissingNetwork(String),
    #[error(transparent)]
    Subnet(#[from] SubnetError),
}

/// Parsed rule configuration: one block per recognized rule
#[derive(Debug, Clone)]
pub struct RulesConfig {
    pub hardware_profile: HashMap<String, HardwareProfile>,
    pub ip_alloc_offset: IpAllocOffsets,
}

impl RulesConfig {
    /// Rules packaged with the binary
    pub fn load_default() -> Result<Self, RuleError> {
        Self::parse(DEFAULT_RULES)
    }

    /// Rules from a user-supplied file
    pub fn from_file(path: &std::path::Path) -> Result<Self, RuleError> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Parse a rules document.
    ///
    /// Each top-level entry carries a `name` and a block keyed by that
    /// name. Names resolve to the closed set of rules this engine knows;
    /// both rules must be present.
    pub fn parse(text: &str) -> Result<Self, RuleError> {
        let doc: serde_yaml::Mapping = serde_yaml::from_str(text)?;

        let mut hardware_profile = None;
        let mut ip_alloc_offset = None;
        for (entry_key, entry) in &doc {
            let entry_key = entry_key.as_str().unwrap_or("<non-string>");
            let name = entry
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| RuleError::UnnamedRule(entry_key.to_string()))?;
            let block = entry
                .get(name)
                .ok_or_else(|| RuleError::MissingBlock(name.to_string()))?;
            match name {
                "hardware_profile" => {
                    hardware_profile = Some(serde_yaml::from_value(block.clone())?);
                }
                "ip_alloc_offset" => {
                    ip_alloc_offset = Some(serde_yaml::from_value(block.clone())?);
                }
                other => return Err(RuleError::UnknownRule(other.to_string())),
            }
        }

        Ok(RulesConfig {
            hardware_profile: hardware_profile
                .ok_or(RuleError::MissingRule("hardware_profile"))?,
            ip_alloc_offset: ip_alloc_offset.ok_or(RuleError::MissingRule("ip_alloc_offset"))?,
        })
    }
}

/// Apply the full rule pipeline to the site document, in place
pub fn apply_design_rules(
    data: &mut SiteDocumentData,
    rules: &RulesConfig,
) -> Result<(), RuleError> {
    info!("Applying rule: hardware_profile");
    hardware_profile::apply(data, &rules.hardware_profile)?;
    info!("Applying rule: ip_alloc_offset");
    ip_alloc::apply(data, &rules.ip_alloc_offset)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_rules() {
        let rules = RulesConfig::load_default().unwrap();
        assert!(rules.hardware_profile.contains_key("foundry"));
        assert_eq!(10, rules.ip_alloc_offset.default);
        assert_eq!(-2, rules.ip_alloc_offset.static_ip_end);
    }

    #[test]
    fn test_parse_rejects_unknown_rule() {
        let text = r#"
rule_power_budget:
  name: power_budget
  power_budget:
    watts: 1200
"#;
        match RulesConfig::parse(text) {
            Err(RuleError::UnknownRule(name)) => assert_eq!("power_budget", name),
            other => panic!("expected UnknownRule, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_requires_both_rules() {
        let text = r#"
rule_hardware_profile:
  name: hardware_profile
  hardware_profile:
    foundry:
      profile_name:
        ctrl: cp-r720
        compute: dp-r720
"#;
        match RulesConfig::parse(text) {
            Err(RuleError::MissingRule(name)) => assert_eq!("ip_alloc_offset", name),
            other => panic!("expected MissingRule, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_requires_rule_block() {
        let text = r#"
rule_hardware_profile:
  name: hardware_profile
"#;
        assert!(matches!(
            RulesConfig::parse(text),
            Err(RuleError::MissingBlock(_))
        ));
    }

    #[test]
    fn test_parse_requires_offset_keys() {
        // A block missing required offsets is a configuration error
        let text = r#"
rule_hardware_profile:
  name: hardware_profile
  hardware_profile:
    foundry:
      profile_name:
        ctrl: cp-r720
        compute: dp-r720
rule_ip_alloc_offset:
  name: ip_alloc_offset
  ip_alloc_offset:
    default: 10
"#;
        assert!(matches!(
            RulesConfig::parse(text),
            Err(RuleError::InvalidRules(_))
        ));
    }
}
