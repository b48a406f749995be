//! # Siteforge - Site inventory processing utility for deployment manifest generation
//!
//! This library converts heterogeneous site-inventory data into a
//! normalized intermediary document, applies network and IP-allocation
//! design rules to it, and renders deployment manifests from
//! user-supplied templates.
//!
//! ## Overview
//!
//! Site engineering data arrives from different sources (spreadsheet
//! parsers, REST inventory services) as a common nested-mapping shape.
//! Siteforge turns that shape into a typed site model, deterministically
//! fills in host roles, IP addresses and network ranges according to
//! fixed design rules, and hands the finished document to template
//! rendering.
//!
//! ## Key Features
//!
//! - **Typed site model**: racks, hosts, VLAN networks and site services
//!   with in-place override merging
//! - **Design rules**: hardware-profile host classification and
//!   offset-based IP range allocation, applied as a fixed pipeline
//! - **Deterministic genesis selection**: the lexicographically first
//!   controller-profile host bootstraps the site
//! - **Schema gate**: optional JSON-Schema validation of the finished
//!   document before anything is rendered
//! - **All-or-nothing rendering**: partially written manifests are
//!   removed when any template fails
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `models`: typed site document entities and merge semantics
//! - `ip`: CIDR subnet parsing and address-at-index arithmetic
//! - `rules`: the design rule engine and its configuration
//! - `processor`: intermediary generation orchestration
//! - `validator`: JSON-Schema validation gate
//! - `renderer`: manifest template rendering
//! - `extractor`: data-source seam and the YAML-file plugin
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use siteforge::extractor::{DataExtractor, YamlFileExtractor};
//! use siteforge::processor::IntermediaryProcessor;
//! use siteforge::rules::RulesConfig;
//! use std::path::Path;
//!
//! let extractor = YamlFileExtractor::new("region1", Path::new("region1.yaml"));
//! let data = extractor.extract()?;
//!
//! let rules = RulesConfig::load_default()?;
//! let mut processor = IntermediaryProcessor::new("region1", data);
//! processor.generate_intermediary(&rules, None)?;
//! processor.dump_intermediary_file(Path::new("."))?;
//! # Ok::<(), color_eyre::eyre::Error>(())
//! ```
//!
//! ## Intermediary Format
//!
//! The generated document is a nested mapping:
//!
//! ```yaml
//! region_name: region1
//! site_info:
//!   name: region1
//!   sitetype: foundry
//!   dns: "8.8.8.8,8.8.4.4"
//! network:
//!   bgp:
//!     ingress_vip: 10.0.221.1
//!   vlan_network_data:
//!     oam:
//!       subnet: [10.0.220.0/26]
//!       gateway: 10.0.220.1
//! baremetal:
//!   cab1:
//!     cab1r01c12:
//!       type: genesis
//!       host_profile: cp-r720
//! storage: ~
//! ```
//!
//! ## Error Handling
//!
//! Modules expose typed errors via `thiserror`; the binary converts them
//! into a user-facing report with `color_eyre`. Rule application and
//! validation are one-shot: the first failure aborts the run. Malformed
//! IP addresses in source data are the one exception, logged as warnings
//! and passed through untouched.

pub mod extractor;
pub mod ip;
pub mod models;
pub mod processor;
pub mod renderer;
pub mod rules;
pub mod validator;
