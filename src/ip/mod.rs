//! IP subnet addressing module.
//!
//! This module handles CIDR subnet parsing and address-at-index arithmetic
//! for the design rule engine. Address ranges (reserved, static, DHCP) are
//! carved out of a subnet by indexing into its ordered address list.

pub mod subnet;

// Re-export commonly used types
pub use subnet::{Subnet, SubnetError};
