// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use zonereg::audit::MemoryAuditSink;
use zonereg::clock::FixedClock;
use zonereg::config::RegistryConfig;
use zonereg::model::{Host, NewHost, NewZone, Zone};
use zonereg::registry::Registry;

/// Registry wired to a manual clock and an in-memory audit log.
pub struct TestRegistry {
    pub registry: Registry,
    pub clock: Arc<FixedClock>,
    pub audit: Arc<MemoryAuditSink>,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap()
}

pub fn test_registry() -> TestRegistry {
    test_registry_with(RegistryConfig::default())
}

pub fn test_registry_with(config: RegistryConfig) -> TestRegistry {
    let clock = Arc::new(FixedClock::new(start_time()));
    let audit = Arc::new(MemoryAuditSink::new());
    let registry = Registry::new(config)
        .with_clock(clock.clone())
        .with_audit_sink(audit.clone());
    TestRegistry {
        registry,
        clock,
        audit,
    }
}

pub fn ip(value: &str) -> IpAddr {
    value.parse().unwrap()
}

pub fn create_zone(registry: &mut Registry, name: &str) -> Zone {
    registry
        .create_zone(NewZone {
            name: name.to_string(),
            email: "hostmaster@example.org".to_string(),
            nameservers: vec![
                "ns1.example.org".to_string(),
                "ns2.example.org".to_string(),
            ],
            ..Default::default()
        })
        .unwrap()
}

pub fn create_host(registry: &mut Registry, name: &str, address: Option<&str>) -> Host {
    registry
        .create_host(NewHost {
            name: name.to_string(),
            contact: "ops@example.org".to_string(),
            ip: address.map(ip),
            ..Default::default()
        })
        .unwrap()
}

/// Publishes every dirty zone so that later dirty marks are observable.
pub fn publish_all(registry: &mut Registry) {
    let dirty: Vec<String> = registry
        .zones()
        .filter(|z| z.updated)
        .map(|z| z.name.clone())
        .collect();
    for name in dirty {
        registry.publish_zone(&name).unwrap();
    }
}

pub fn is_dirty(registry: &Registry, zone: &str) -> bool {
    registry.zone(zone).unwrap().updated
}

/// Small deterministic generator for operation sequences.
pub struct Sequence(u64);

impl Sequence {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn next_below(&mut self, bound: usize) -> usize {
        // xorshift64
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 % bound as u64) as usize
    }
}
