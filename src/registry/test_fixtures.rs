// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared fixtures for registry unit tests.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::audit::MemoryAuditSink;
use crate::clock::FixedClock;
use crate::config::RegistryConfig;
use crate::model::{Host, NewHost, NewZone, Zone};
use crate::registry::Registry;

pub(crate) struct Fixture {
    pub registry: Registry,
    pub clock: Arc<FixedClock>,
    pub audit: Arc<MemoryAuditSink>,
}

pub(crate) fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
}

pub(crate) fn fixture_with(config: RegistryConfig) -> Fixture {
    let clock = Arc::new(FixedClock::new(start_time()));
    let audit = Arc::new(MemoryAuditSink::new());
    let registry = Registry::new(config)
        .with_clock(clock.clone())
        .with_audit_sink(audit.clone());
    Fixture {
        registry,
        clock,
        audit,
    }
}

pub(crate) fn fixture() -> Fixture {
    fixture_with(RegistryConfig::default())
}

pub(crate) fn ip(value: &str) -> IpAddr {
    value.parse().unwrap()
}

pub(crate) fn new_zone(name: &str) -> NewZone {
    NewZone {
        name: name.to_string(),
        email: "hostmaster@example.org".to_string(),
        nameservers: vec!["ns1.example.org".to_string(), "ns2.example.org".to_string()],
        ..Default::default()
    }
}

pub(crate) fn zone(registry: &mut Registry, name: &str) -> Zone {
    registry.create_zone(new_zone(name)).unwrap()
}

pub(crate) fn host(registry: &mut Registry, name: &str, address: Option<&str>) -> Host {
    registry
        .create_host(NewHost {
            name: name.to_string(),
            contact: "ops@example.org".to_string(),
            ip: address.map(ip),
            ..Default::default()
        })
        .unwrap()
}

/// Publishes every dirty zone so later assertions only see new dirt.
pub(crate) fn publish_all(registry: &mut Registry) {
    let names: Vec<String> = registry.zones().map(|z| z.name.clone()).collect();
    for name in names {
        registry.publish_zone(&name).unwrap();
    }
}

pub(crate) fn is_dirty(registry: &Registry, name: &str) -> bool {
    registry.zone(name).unwrap().updated
}
