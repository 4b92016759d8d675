// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # zonereg - DNS zone registry
//!
//! zonereg stores hosts, addresses and DNS records and keeps the derived state
//! consistent on every mutation: the zone each name belongs to, the dirty flag and
//! serial of every affected zone, and the PTR overrides of addresses shared by
//! several hosts.
//!
//! ## Modules
//!
//! - [`registry`] - The registry tables and every consistency-maintaining operation
//! - [`service`] - Task-safe shared handle with operation metrics
//! - [`model`] - Entity rows, requests and the persisted snapshot
//! - [`zones`] - Longest-suffix zone resolution
//! - [`reverse`] - Reverse zone names and pointer names
//! - [`network`] - Network arithmetic and usage reports
//! - [`ptr`] - PTR override rules for shared addresses
//! - [`serial`] - `YYYYMMDDnn` serial computation
//! - [`validators`] - Field validation
//! - [`config`] - Registry configuration
//! - [`audit`] - Change log sinks
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use zonereg::config::RegistryConfig;
//! use zonereg::model::{NewHost, NewZone};
//! use zonereg::registry::Registry;
//!
//! # fn main() -> zonereg::registry_errors::Result<()> {
//! let mut registry = Registry::new(RegistryConfig::default());
//! registry.create_zone(NewZone {
//!     name: "example.org".to_string(),
//!     email: "hostmaster@example.org".to_string(),
//!     nameservers: vec!["ns1.example.org".to_string()],
//!     ..Default::default()
//! })?;
//!
//! let host = registry.create_host(NewHost {
//!     name: "www.example.org".to_string(),
//!     ip: Some("10.0.0.10".parse().unwrap()),
//!     ..Default::default()
//! })?;
//!
//! assert_eq!(registry.resolve_zone(&host.name).map(|z| z.name.as_str()), Some("example.org"));
//! assert!(registry.zone("example.org").is_some_and(|z| z.updated));
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod clock;
pub mod config;
pub mod constants;
pub mod metrics;
pub mod model;
pub mod network;
pub mod ptr;
pub mod registry;
pub mod registry_errors;
pub mod reverse;
pub mod serial;
pub mod service;
pub mod validators;
pub mod zones;

#[cfg(test)]
mod model_tests;
#[cfg(test)]
mod ptr_tests;
