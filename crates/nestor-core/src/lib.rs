//! Nestor Core Library
//!
//! Core types, configuration and errors shared by the Nestor directory
//! membership engine.

pub mod config;
pub mod error;
pub mod types;

pub use config::NestorConfig;
pub use error::{Error, Result};

/// Nestor version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default plain LDAP port
pub const DEFAULT_LDAP_PORT: u16 = 389;

/// Default LDAPS port
pub const DEFAULT_LDAPS_PORT: u16 = 636;

/// Active Directory Global Catalog port
pub const GLOBAL_CATALOG_PORT: u16 = 3268;

/// Default maximum nesting depth for recursive strategies
pub const DEFAULT_MAX_DEPTH: usize = 9;

/// ActiveDirectory LDAP_MATCHING_RULE_IN_CHAIN
pub const IN_CHAIN_MATCHING_RULE_OID: &str = "1.2.840.113556.1.4.1941";
