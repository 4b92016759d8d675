// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Invariant checker.
//!
//! Recomputes every derived fact from the stored tables alone, without trusting the
//! in-memory indexes, and reports each disagreement. Intended for tests, snapshot
//! loading and the `check` command.
//!
//! "Two or more owners imply an override pointing at the earliest owner" is not
//! checked: when the override holder gives up the address, the override is kept
//! as-is while any other owner remains.

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;

use ipnet::IpNet;
use thiserror::Error;

use super::Registry;
use crate::model::{HostId, NameServerId, PtrOverride, ZoneId};
use crate::zones::ZoneIndex;

/// One broken invariant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// More than one PTR override exists for an address
    #[error("Address {ip} has {count} PTR overrides")]
    DuplicatePtrOverride { ip: IpAddr, count: usize },

    /// An automatic override outlived the sharing it was created for: no owner is
    /// left, or its own host is the only one
    #[error("Address {ip} has a stale automatic PTR override with {owners} owner(s)")]
    StaleAutoOverride { ip: IpAddr, owners: usize },

    /// Two stored networks intersect
    #[error("Network {first} overlaps network {second}")]
    NetworkOverlap { first: IpNet, second: IpNet },

    /// A stored zone back-reference differs from longest-suffix resolution
    #[error("{table} '{name}' is stored in zone {stored:?} but resolves to {expected:?}")]
    WrongZone {
        table: &'static str,
        name: String,
        stored: Option<ZoneId>,
        expected: Option<ZoneId>,
    },

    /// A row references a missing row
    #[error("{table} row {row} references missing {target}")]
    DanglingReference {
        table: &'static str,
        row: u64,
        target: String,
    },

    /// A zone's primary nameserver is not among its nameservers
    #[error("Zone '{zone}' primary nameserver '{primary}' is not in its nameserver list")]
    PrimaryNotListed { zone: String, primary: String },
}

impl Registry {
    /// Checks the stored state against the registry invariants.
    ///
    /// Returns an empty list when the state is consistent.
    #[must_use]
    pub fn verify(&self) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();
        self.verify_ptr_overrides(&mut violations);
        self.verify_networks(&mut violations);
        self.verify_zone_membership(&mut violations);
        self.verify_references(&mut violations);
        violations
    }

    fn verify_ptr_overrides(&self, violations: &mut Vec<InvariantViolation>) {
        let mut owners: HashMap<IpAddr, Vec<HostId>> = HashMap::new();
        for row in self.state.ipaddresses.values() {
            owners.entry(row.ip).or_default().push(row.host);
        }

        let mut by_ip: BTreeMap<IpAddr, Vec<&PtrOverride>> = BTreeMap::new();
        for ptr in self.state.ptr_overrides.values() {
            by_ip.entry(ptr.ip).or_default().push(ptr);
        }

        for (ip, overrides) in by_ip {
            if overrides.len() > 1 {
                violations.push(InvariantViolation::DuplicatePtrOverride {
                    ip,
                    count: overrides.len(),
                });
            }
            let holders = owners.get(&ip).map(Vec::as_slice).unwrap_or_default();
            let stale = overrides.iter().any(|ptr| {
                ptr.is_auto()
                    && match holders {
                        [] => true,
                        [sole] => *sole == ptr.host,
                        _ => false,
                    }
            });
            if stale {
                violations.push(InvariantViolation::StaleAutoOverride {
                    ip,
                    owners: holders.len(),
                });
            }
        }
    }

    fn verify_networks(&self, violations: &mut Vec<InvariantViolation>) {
        let mut ranges: Vec<IpNet> = self.state.networks.values().map(|n| n.network).collect();
        ranges.sort_by_key(|range| (range.network(), range.prefix_len()));
        for pair in ranges.windows(2) {
            let (first, second) = (pair[0], pair[1]);
            if first.contains(&second.network()) {
                violations.push(InvariantViolation::NetworkOverlap { first, second });
            }
        }
    }

    fn verify_zone_membership(&self, violations: &mut Vec<InvariantViolation>) {
        let mut index = ZoneIndex::new();
        for zone in self.state.zones.values() {
            index.insert(&zone.name, zone.kind, zone.id);
        }

        let mut check = |table: &'static str, name: &str, stored: Option<ZoneId>| {
            let expected = index.resolve_name(name);
            if stored != expected {
                violations.push(InvariantViolation::WrongZone {
                    table,
                    name: name.to_string(),
                    stored,
                    expected,
                });
            }
        };
        for host in self.state.hosts.values() {
            check("Host", &host.name, host.zone);
        }
        for cname in self.state.cnames.values() {
            check("Cname", &cname.name, cname.zone);
        }
        for srv in self.state.srvs.values() {
            check("Srv", &srv.name, srv.zone);
        }
    }

    fn verify_references(&self, violations: &mut Vec<InvariantViolation>) {
        let state = &self.state;
        let mut dangling = |table: &'static str, row: u64, target: String| {
            violations.push(InvariantViolation::DanglingReference { table, row, target });
        };

        for row in state.ipaddresses.values() {
            if !state.hosts.contains_key(&row.host) {
                dangling("Ipaddress", row.id.0, format!("host {}", row.host));
            }
        }
        for ptr in state.ptr_overrides.values() {
            if !state.hosts.contains_key(&ptr.host) {
                dangling("PtrOverride", ptr.id.0, format!("host {}", ptr.host));
            }
        }
        for cname in state.cnames.values() {
            if !state.hosts.contains_key(&cname.host) {
                dangling("Cname", cname.id.0, format!("host {}", cname.host));
            }
        }
        for txt in state.txts.values() {
            if !state.hosts.contains_key(&txt.host) {
                dangling("Txt", txt.id.0, format!("host {}", txt.host));
            }
        }
        for naptr in state.naptrs.values() {
            if !state.hosts.contains_key(&naptr.host) {
                dangling("Naptr", naptr.id.0, format!("host {}", naptr.host));
            }
        }
        for mx in state.mxs.values() {
            if !state.hosts.contains_key(&mx.host) {
                dangling("Mx", mx.id.0, format!("host {}", mx.host));
            }
        }
        for host in state.hosts.values() {
            if let Some(preset) = host.hinfo {
                if !state.hinfo_presets.contains_key(&preset) {
                    dangling("Host", host.id.0, format!("HINFO preset {preset}"));
                }
            }
        }
        for delegation in state.delegations.values() {
            if !state.zones.contains_key(&delegation.zone) {
                dangling("Delegation", delegation.id.0, format!("zone {}", delegation.zone));
            }
        }

        let missing_nameserver = |id: &NameServerId| !state.nameservers.contains_key(id);
        for zone in state.zones.values() {
            for id in zone.nameservers.iter().filter(|id| missing_nameserver(id)) {
                dangling("Zone", zone.id.0, format!("nameserver {id}"));
            }
        }
        for delegation in state.delegations.values() {
            for id in delegation.nameservers.iter().filter(|id| missing_nameserver(id)) {
                dangling("Delegation", delegation.id.0, format!("nameserver {id}"));
            }
        }

        for zone in state.zones.values() {
            let listed = zone
                .nameservers
                .iter()
                .filter_map(|id| state.nameservers.get(id))
                .any(|ns| ns.name == zone.primary_ns);
            if !listed {
                violations.push(InvariantViolation::PrimaryNotListed {
                    zone: zone.name.clone(),
                    primary: zone.primary_ns.clone(),
                });
            }
        }
    }
}
