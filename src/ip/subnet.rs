//! CIDR subnet parsing and indexing.
//!
//! A parsed subnet behaves like the ordered list of every address it
//! contains: index 0 is the network address, the last index is the
//! broadcast (or final) address. Negative indexes count back from the end
//! of the list, so `-1` is the last address of the subnet.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Errors produced while parsing or indexing a subnet
#[derive(Debug, thiserror::Error)]
pub enum SubnetError {
    #[error("'{0}' is not a valid CIDR subnet")]
    InvalidCidr(String),
    #[error("address index {index} is out of range for subnet {cidr} ({size} addresses)")]
    IndexOutOfRange { cidr: String, index: i128, size: u128 },
}

/// A parsed CIDR subnet with address-at-index semantics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subnet {
    cidr: String,
    base: u128,
    size: u128,
    is_v4: bool,
}

impl Subnet {
    /// Parse a CIDR string such as "10.0.220.0/26" or "fd00::/64".
    ///
    /// Host bits set in the address part are masked off, so
    /// "10.0.220.5/26" covers the same range as "10.0.220.0/26". The
    /// original string is kept for error messages and display.
    pub fn parse(cidr: &str) -> Result<Self, SubnetError> {
        let invalid = || SubnetError::InvalidCidr(cidr.to_string());

        let (addr_part, prefix_part) = cidr.trim().split_once('/').ok_or_else(invalid)?;
        let addr: IpAddr = addr_part.trim().parse().map_err(|_| invalid())?;
        let prefix: u32 = prefix_part.trim().parse().map_err(|_| invalid())?;

        let (raw, bits, is_v4) = match addr {
            IpAddr::V4(v4) => (u128::from(u32::from(v4)), 32, true),
            IpAddr::V6(v6) => (u128::from(v6), 128, false),
        };
        if prefix > bits {
            return Err(invalid());
        }
        let host_bits = bits - prefix;
        if host_bits >= 128 {
            // A ::/0 subnet has 2^128 addresses, which nothing here can
            // meaningfully index into.
            return Err(invalid());
        }
        let size = 1u128 << host_bits;
        let base = raw & !(size - 1);

        Ok(Subnet {
            cidr: cidr.trim().to_string(),
            base,
            size,
            is_v4,
        })
    }

    /// The CIDR string this subnet was parsed from
    pub fn cidr(&self) -> &str {
        &self.cidr
    }

    /// Total number of addresses in the subnet, network and broadcast
    /// addresses included
    pub fn size(&self) -> u128 {
        self.size
    }

    /// Address at the given index in the subnet's ordered address list.
    ///
    /// Negative indexes count from the end: `-1` is the last address.
    /// Indexing outside the subnet in either direction is an error.
    pub fn address_at(&self, index: i128) -> Result<IpAddr, SubnetError> {
        let out_of_range = || SubnetError::IndexOutOfRange {
            cidr: self.cidr.clone(),
            index,
            size: self.size,
        };

        let offset = if index < 0 {
            let back = index.unsigned_abs();
            if back > self.size {
                return Err(out_of_range());
            }
            self.size - back
        } else {
            let forward = index as u128;
            if forward >= self.size {
                return Err(out_of_range());
            }
            forward
        };

        let raw = self.base + offset;
        let addr = if self.is_v4 {
            IpAddr::V4(Ipv4Addr::from(raw as u32))
        } else {
            IpAddr::V6(Ipv6Addr::from(raw))
        };
        Ok(addr)
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cidr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_index() {
        let subnet = Subnet::parse("10.0.220.0/26").unwrap();
        assert_eq!(64, subnet.size());
        assert_eq!("10.0.220.0", subnet.address_at(0).unwrap().to_string());
        assert_eq!("10.0.220.1", subnet.address_at(1).unwrap().to_string());
        assert_eq!("10.0.220.63", subnet.address_at(63).unwrap().to_string());
    }

    #[test]
    fn test_host_bits_masked() {
        let subnet = Subnet::parse("10.0.220.130/27").unwrap();
        assert_eq!("10.0.220.128", subnet.address_at(0).unwrap().to_string());
        assert_eq!(32, subnet.size());
    }

    #[test]
    fn test_negative_index_counts_from_end() {
        let subnet = Subnet::parse("30.30.4.0/25").unwrap();
        assert_eq!(128, subnet.size());
        assert_eq!("30.30.4.127", subnet.address_at(-1).unwrap().to_string());
        assert_eq!("30.30.4.126", subnet.address_at(-2).unwrap().to_string());
    }

    #[test]
    fn test_index_out_of_range() {
        let subnet = Subnet::parse("192.168.0.0/30").unwrap();
        assert!(subnet.address_at(4).is_err());
        assert!(subnet.address_at(-5).is_err());
        assert!(subnet.address_at(3).is_ok());
        assert!(subnet.address_at(-4).is_ok());
    }

    #[test]
    fn test_parse_ipv6() {
        let subnet = Subnet::parse("fd00:900::/120").unwrap();
        assert_eq!(256, subnet.size());
        assert_eq!("fd00:900::ff", subnet.address_at(-1).unwrap().to_string());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Subnet::parse("not-a-subnet").is_err());
        assert!(Subnet::parse("10.0.0.0").is_err());
        assert!(Subnet::parse("10.0.0.0/33").is_err());
        assert!(Subnet::parse("::/0").is_err());
    }
}
