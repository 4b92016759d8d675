// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The registry: stored entities, their derived indexes and every CRUD operation.
//!
//! Every mutating operation follows the same two phases:
//!
//! 1. **Validate** - all checks that can fail run against the current state
//! 2. **Apply** - infallible writes collect their side effects in a transaction
//!
//! The transaction is committed at the end of the apply phase: touched zones are
//! marked dirty, metrics are recorded and audit entries are handed to the sink. A
//! rejected mutation therefore never leaves a trace.
//!
//! # Operations
//!
//! ## Hosts and addresses
//!
//! - [`Registry::create_host`], [`Registry::update_host`], [`Registry::delete_host`]
//! - [`Registry::create_ipaddress`], [`Registry::update_ipaddress`],
//!   [`Registry::delete_ipaddress`]
//! - [`Registry::create_ptr_override`], [`Registry::update_ptr_override`],
//!   [`Registry::delete_ptr_override`]
//!
//! ## Records
//!
//! - CNAME, TXT, NAPTR, SRV, MX and HINFO preset create/delete (plus CNAME and TXT
//!   update)
//!
//! ## Zones
//!
//! - [`Registry::create_zone`], [`Registry::update_zone`], [`Registry::delete_zone`]
//! - [`Registry::set_nameservers`], [`Registry::set_nameserver_ttl`]
//! - [`Registry::create_delegation`], [`Registry::delete_delegation`]
//! - [`Registry::publish_zone`], [`Registry::zone_contents`]
//!
//! ## Networks
//!
//! - [`Registry::create_network`], [`Registry::update_network`],
//!   [`Registry::delete_network`]
//! - [`Registry::find_network`], [`Registry::network_usage`],
//!   [`Registry::network_report`]
//!
//! # Example
//!
//! ```rust
//! use zonereg::config::RegistryConfig;
//! use zonereg::model::{NewHost, NewZone};
//! use zonereg::registry::Registry;
//!
//! let mut registry = Registry::new(RegistryConfig::default());
//! registry
//!     .create_zone(NewZone {
//!         name: "example.org".to_string(),
//!         email: "hostmaster@example.org".to_string(),
//!         nameservers: vec!["ns1.example.org".to_string()],
//!         ..Default::default()
//!     })
//!     .unwrap();
//!
//! let host = registry
//!     .create_host(NewHost {
//!         name: "www.example.org".to_string(),
//!         ip: Some("10.0.0.10".parse().unwrap()),
//!         ..Default::default()
//!     })
//!     .unwrap();
//! assert_eq!(registry.resolve_zone("www.example.org").map(|z| z.id), host.zone);
//! ```

mod addresses;
mod hosts;
mod networks;
mod records;
mod verify;
mod zones;

#[cfg(test)]
mod addresses_tests;
#[cfg(test)]
mod hosts_tests;
#[cfg(test)]
mod mod_tests;
#[cfg(test)]
mod test_fixtures;

pub use networks::NetworkReport;
pub use verify::InvariantViolation;
pub use zones::{DelegationContents, HostRecords, PtrRecord, ZoneContents};

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::audit::{AuditSink, ChangeAction, ChangeLogEntry, NullAuditSink};
use crate::clock::{Clock, SystemClock};
use crate::config::RegistryConfig;
use crate::constants::{
    TABLE_CNAMES, TABLE_DELEGATIONS, TABLE_HINFO_PRESETS, TABLE_HOSTS, TABLE_IPADDRESSES,
    TABLE_MXS, TABLE_NAMESERVERS, TABLE_NAPTRS, TABLE_NETWORKS, TABLE_PTR_OVERRIDES,
    TABLE_SRVS, TABLE_TXTS, TABLE_ZONES,
};
use crate::metrics;
use crate::model::{
    Cname, CnameId, Host, HostId, Ipaddress, IpaddressId, Network, NetworkId, Provenance,
    PtrOverride, PtrOverrideId, RegistryState, Zone, ZoneId,
};
use crate::network::NetworkIndex;
use crate::ptr::{self, AddressIndex, Owner, PtrAction};
use crate::registry_errors::{RegistryError, Result, ValidationError};
use crate::validators::{normalize_name, validate_hostname};
use crate::zones::{mark_dirty, ZoneIndex};

/// In-memory DNS registry.
///
/// Owns the [`RegistryState`] snapshot plus the indexes derived from it. The
/// registry itself is single-threaded; share it through
/// [`RegistryService`](crate::service::RegistryService).
pub struct Registry {
    state: RegistryState,
    zone_index: ZoneIndex,
    network_index: NetworkIndex,
    addresses: AddressIndex,
    host_names: HashMap<String, HostId>,
    cname_names: HashMap<String, CnameId>,
    zone_names: HashMap<String, ZoneId>,
    config: RegistryConfig,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("hosts", &self.state.hosts.len())
            .field("ipaddresses", &self.state.ipaddresses.len())
            .field("zones", &self.state.zones.len())
            .field("networks", &self.state.networks.len())
            .finish_non_exhaustive()
    }
}

/// Scope inside which a MAC address must be unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BroadcastDomain {
    Vlan { vlan: u16, v4: bool },
    Network(NetworkId),
    Global { v4: bool },
}

/// Audit row collected during the apply phase.
struct Change {
    table: &'static str,
    row: u64,
    data: serde_json::Value,
    action: ChangeAction,
}

/// Side effects of one mutation, applied by [`Registry::commit`].
struct Tx {
    now: DateTime<Utc>,
    dirty: BTreeSet<ZoneId>,
    changes: Vec<Change>,
    ptr_created: u64,
    ptr_removed: u64,
}

impl Tx {
    fn touch(&mut self, zone: Option<ZoneId>) {
        if let Some(id) = zone {
            self.dirty.insert(id);
        }
    }

    fn saved<T: Serialize>(&mut self, table: &'static str, row: impl Into<u64>, data: &T) {
        self.record(table, row.into(), data, ChangeAction::Saved);
    }

    fn deleted<T: Serialize>(&mut self, table: &'static str, row: impl Into<u64>, data: &T) {
        self.record(table, row.into(), data, ChangeAction::Deleted);
    }

    fn record<T: Serialize>(&mut self, table: &'static str, row: u64, data: &T, action: ChangeAction) {
        self.changes.push(Change {
            table,
            row,
            data: serde_json::to_value(data).unwrap_or_default(),
            action,
        });
    }
}

fn last_key<K: Copy + Into<u64>, V>(map: &BTreeMap<K, V>) -> u64 {
    map.keys().next_back().map_or(0, |key| (*key).into())
}

impl Registry {
    /// Creates an empty registry using the wall clock and no audit sink.
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            state: RegistryState::default(),
            zone_index: ZoneIndex::new(),
            network_index: NetworkIndex::new(),
            addresses: AddressIndex::new(),
            host_names: HashMap::new(),
            cname_names: HashMap::new(),
            zone_names: HashMap::new(),
            config,
            clock: Arc::new(SystemClock),
            audit: Arc::new(NullAuditSink),
        }
    }

    /// Loads a persisted snapshot and rebuilds every derived index.
    ///
    /// The id and sequence counters are raised to the highest stored values, so a
    /// hand-edited snapshot cannot hand out an id twice.
    #[must_use]
    pub fn from_state(state: RegistryState, config: RegistryConfig) -> Self {
        let mut registry = Self::new(config);
        registry.state = state;
        registry.rebuild_indexes();
        registry
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    #[must_use]
    pub fn state(&self) -> &RegistryState {
        &self.state
    }

    #[must_use]
    pub fn into_state(self) -> RegistryState {
        self.state
    }

    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn rebuild_indexes(&mut self) {
        let state = &mut self.state;

        for zone in state.zones.values() {
            self.zone_index.insert(&zone.name, zone.kind, zone.id);
            self.zone_names.insert(zone.name.clone(), zone.id);
        }
        for network in state.networks.values() {
            self.network_index.insert(network.network, network.id);
        }
        for host in state.hosts.values() {
            self.host_names.insert(host.name.clone(), host.id);
        }
        for cname in state.cnames.values() {
            self.cname_names.insert(cname.name.clone(), cname.id);
        }
        for row in state.ipaddresses.values() {
            self.addresses.add_owner(
                row.ip,
                Owner {
                    acquired: row.acquired,
                    row: row.id,
                    host: row.host,
                },
            );
            if let Some(mac) = &row.mac {
                self.addresses.add_mac(mac, row.id);
            }
        }
        for ptr in state.ptr_overrides.values() {
            self.addresses.set_override(ptr.ip, ptr.id);
        }

        let highest_id = [
            last_key(&state.hosts),
            last_key(&state.ipaddresses),
            last_key(&state.ptr_overrides),
            last_key(&state.cnames),
            last_key(&state.txts),
            last_key(&state.naptrs),
            last_key(&state.srvs),
            last_key(&state.mxs),
            last_key(&state.hinfo_presets),
            last_key(&state.zones),
            last_key(&state.delegations),
            last_key(&state.nameservers),
            last_key(&state.networks),
        ]
        .into_iter()
        .max()
        .unwrap_or(0);
        state.last_id = state.last_id.max(highest_id);

        let highest_acquired = state
            .ipaddresses
            .values()
            .map(|row| row.acquired)
            .max()
            .unwrap_or(0);
        state.last_acquired = state.last_acquired.max(highest_acquired);

        debug!(
            hosts = state.hosts.len(),
            zones = state.zones.len(),
            networks = state.networks.len(),
            "rebuilt registry indexes"
        );
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    fn begin(&self) -> Tx {
        Tx {
            now: self.clock.now(),
            dirty: BTreeSet::new(),
            changes: Vec::new(),
            ptr_created: 0,
            ptr_removed: 0,
        }
    }

    fn commit(&mut self, operation: &'static str, tx: Tx) {
        let Tx {
            now,
            dirty,
            changes,
            ptr_created,
            ptr_removed,
        } = tx;

        let mut marked = 0u64;
        for id in &dirty {
            if let Some(zone) = self.state.zones.get_mut(id) {
                mark_dirty(zone, now);
                marked += 1;
            }
        }

        metrics::record_zones_dirty(marked);
        metrics::record_ptr_overrides(ptr_created, ptr_removed);
        self.record_inventory();

        let rows = changes.len();
        for change in changes {
            self.audit.record(ChangeLogEntry {
                table_name: change.table.to_string(),
                table_row: change.row,
                data: change.data,
                action: change.action,
                timestamp: now,
            });
        }

        info!(
            operation,
            rows,
            zones_dirty = marked,
            ptr_created,
            ptr_removed,
            "committed registry mutation"
        );
    }

    fn record_inventory(&self) {
        let state = &self.state;
        metrics::set_entities_active(TABLE_HOSTS, state.hosts.len());
        metrics::set_entities_active(TABLE_IPADDRESSES, state.ipaddresses.len());
        metrics::set_entities_active(TABLE_PTR_OVERRIDES, state.ptr_overrides.len());
        metrics::set_entities_active(TABLE_CNAMES, state.cnames.len());
        metrics::set_entities_active(TABLE_TXTS, state.txts.len());
        metrics::set_entities_active(TABLE_NAPTRS, state.naptrs.len());
        metrics::set_entities_active(TABLE_SRVS, state.srvs.len());
        metrics::set_entities_active(TABLE_MXS, state.mxs.len());
        metrics::set_entities_active(TABLE_HINFO_PRESETS, state.hinfo_presets.len());
        metrics::set_entities_active(TABLE_ZONES, state.zones.len());
        metrics::set_entities_active(TABLE_DELEGATIONS, state.delegations.len());
        metrics::set_entities_active(TABLE_NAMESERVERS, state.nameservers.len());
        metrics::set_entities_active(TABLE_NETWORKS, state.networks.len());
    }

    fn allocate_id(&mut self) -> u64 {
        self.state.last_id += 1;
        self.state.last_id
    }

    fn allocate_acquired(&mut self) -> u64 {
        self.state.last_acquired += 1;
        self.state.last_acquired
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    #[must_use]
    pub fn host(&self, id: HostId) -> Option<&Host> {
        self.state.hosts.get(&id)
    }

    /// Looks a host up by name; case and a trailing dot are ignored.
    #[must_use]
    pub fn host_by_name(&self, name: &str) -> Option<&Host> {
        self.host_names
            .get(&normalize_name(name))
            .and_then(|id| self.state.hosts.get(id))
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Host> + '_ {
        self.state.hosts.values()
    }

    #[must_use]
    pub fn ipaddress(&self, id: IpaddressId) -> Option<&Ipaddress> {
        self.state.ipaddresses.get(&id)
    }

    /// Address rows of one host, in id order.
    #[must_use]
    pub fn host_addresses(&self, host: HostId) -> Vec<&Ipaddress> {
        self.state
            .ipaddresses
            .values()
            .filter(|row| row.host == host)
            .collect()
    }

    /// Hosts holding `ip`, earliest owner first.
    #[must_use]
    pub fn address_owners(&self, ip: IpAddr) -> Vec<HostId> {
        self.addresses.owners(ip).iter().map(|o| o.host).collect()
    }

    #[must_use]
    pub fn ptr_override(&self, id: PtrOverrideId) -> Option<&PtrOverride> {
        self.state.ptr_overrides.get(&id)
    }

    #[must_use]
    pub fn ptr_override_for(&self, ip: IpAddr) -> Option<&PtrOverride> {
        self.addresses
            .override_for(ip)
            .and_then(|id| self.state.ptr_overrides.get(&id))
    }

    #[must_use]
    pub fn cname(&self, id: CnameId) -> Option<&Cname> {
        self.state.cnames.get(&id)
    }

    #[must_use]
    pub fn cname_by_name(&self, name: &str) -> Option<&Cname> {
        self.cname_names
            .get(&normalize_name(name))
            .and_then(|id| self.state.cnames.get(id))
    }

    #[must_use]
    pub fn zone(&self, name: &str) -> Option<&Zone> {
        self.zone_names
            .get(&normalize_name(name))
            .and_then(|id| self.state.zones.get(id))
    }

    #[must_use]
    pub fn zone_by_id(&self, id: ZoneId) -> Option<&Zone> {
        self.state.zones.get(&id)
    }

    pub fn zones(&self) -> impl Iterator<Item = &Zone> + '_ {
        self.state.zones.values()
    }

    /// Most specific zone containing `name`.
    ///
    /// Reverse pointer names resolve by numeric containment, so RFC 2317 zones take
    /// part in the lookup.
    #[must_use]
    pub fn resolve_zone(&self, name: &str) -> Option<&Zone> {
        self.zone_index
            .resolve_name(&normalize_name(name))
            .and_then(|id| self.state.zones.get(&id))
    }

    /// Most specific reverse zone containing `ip`.
    #[must_use]
    pub fn resolve_reverse_zone(&self, ip: IpAddr) -> Option<&Zone> {
        self.zone_index
            .resolve_ip(ip)
            .and_then(|id| self.state.zones.get(&id))
    }

    #[must_use]
    pub fn network(&self, id: NetworkId) -> Option<&Network> {
        self.state.networks.get(&id)
    }

    pub fn networks(&self) -> impl Iterator<Item = &Network> + '_ {
        self.state.networks.values()
    }

    fn require_host(&self, id: HostId) -> Result<&Host> {
        self.state
            .hosts
            .get(&id)
            .ok_or_else(|| RegistryError::not_found("Host", id))
    }

    fn require_zone(&self, name: &str) -> Result<&Zone> {
        self.zone(name)
            .ok_or_else(|| RegistryError::not_found("Zone", normalize_name(name)))
    }

    // ========================================================================
    // Shared validation
    // ========================================================================

    /// Validates a host name. A single label is accepted when it names a known zone.
    fn validate_owner_name(&self, name: &str) -> Result<String> {
        match validate_hostname(name) {
            Ok(name) => Ok(name),
            Err(ValidationError::SingleLabel { name }) if self.zone_names.contains_key(&name) => {
                Ok(name)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Rejects a host name already used by another host or by a CNAME.
    fn ensure_name_free(&self, name: &str, except: Option<HostId>) -> Result<()> {
        if let Some(id) = self.host_names.get(name) {
            if Some(*id) != except {
                return Err(RegistryError::conflict(
                    "Host",
                    name,
                    "name is already used by another host",
                ));
            }
        }
        if self.cname_names.contains_key(name) {
            return Err(RegistryError::conflict(
                "Host",
                name,
                "name is already used by a CNAME",
            ));
        }
        Ok(())
    }

    /// Rejects renaming a host onto a nameserver that a zone lists.
    fn ensure_not_zone_nameserver(&self, name: &str) -> Result<()> {
        let listed = self.nameserver(name).is_some_and(|ns| {
            self.state
                .zones
                .values()
                .any(|zone| zone.nameservers.contains(&ns.id))
        });
        if listed {
            return Err(RegistryError::conflict(
                "Host",
                name,
                "name is used as a zone nameserver",
            ));
        }
        Ok(())
    }

    /// Rejects mutations of an address inside a frozen network.
    fn check_frozen(&self, ip: IpAddr) -> Result<()> {
        match self.find_network(ip) {
            Some(network) if network.frozen => Err(RegistryError::forbidden(
                "Network",
                network.network.to_string(),
                format!("network is frozen, records for {ip} cannot be changed"),
            )),
            _ => Ok(()),
        }
    }

    fn broadcast_domain(&self, ip: IpAddr) -> BroadcastDomain {
        let v4 = ip.is_ipv4();
        match self.find_network(ip) {
            Some(Network {
                vlan: Some(vlan), ..
            }) if self.config.network.mac_scope_by_vlan => BroadcastDomain::Vlan { vlan: *vlan, v4 },
            Some(network) => BroadcastDomain::Network(network.id),
            None => BroadcastDomain::Global { v4 },
        }
    }

    /// Rejects a MAC address already used by another row in the same broadcast domain.
    fn check_mac(&self, mac: &str, ip: IpAddr, exclude: Option<IpaddressId>) -> Result<()> {
        let domain = self.broadcast_domain(ip);
        let clash = self
            .addresses
            .rows_with_mac(mac)
            .filter(|row| Some(*row) != exclude)
            .filter_map(|row| self.state.ipaddresses.get(&row))
            .find(|other| self.broadcast_domain(other.ip) == domain);

        match clash {
            Some(other) => Err(RegistryError::conflict(
                "Ipaddress",
                mac,
                format!(
                    "MAC address is already used by {} in the same broadcast domain",
                    other.ip
                ),
            )),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Address and PTR plumbing (apply phase only)
    // ========================================================================

    /// Inserts an address row and runs the PTR insert path for its address.
    fn attach_address(
        &mut self,
        tx: &mut Tx,
        host: HostId,
        ip: IpAddr,
        mac: Option<String>,
    ) -> Ipaddress {
        let id = IpaddressId(self.allocate_id());
        let acquired = self.allocate_acquired();
        let row = Ipaddress {
            id,
            host,
            ip,
            mac,
            acquired,
            created_at: tx.now,
            updated_at: tx.now,
        };

        self.addresses.add_owner(
            ip,
            Owner {
                acquired,
                row: id,
                host,
            },
        );
        if let Some(mac) = &row.mac {
            self.addresses.add_mac(mac, id);
        }
        self.state.ipaddresses.insert(id, row.clone());
        tx.saved(TABLE_IPADDRESSES, id, &row);

        tx.touch(self.state.hosts.get(&host).and_then(|h| h.zone));
        tx.touch(self.zone_index.resolve_ip(ip));
        self.ptr_after_insert(tx, ip);
        row
    }

    /// Removes an address row and runs the PTR delete path for its address.
    fn detach_address(&mut self, tx: &mut Tx, id: IpaddressId) {
        let Some(row) = self.state.ipaddresses.remove(&id) else {
            return;
        };
        self.addresses.remove_owner(row.ip, id);
        if let Some(mac) = &row.mac {
            self.addresses.remove_mac(mac, id);
        }
        tx.deleted(TABLE_IPADDRESSES, id, &row);

        tx.touch(self.state.hosts.get(&row.host).and_then(|h| h.zone));
        tx.touch(self.zone_index.resolve_ip(row.ip));
        self.ptr_after_delete(tx, row.ip);
    }

    fn ptr_after_insert(&mut self, tx: &mut Tx, ip: IpAddr) {
        let existing = self.ptr_override_for(ip);
        let action = ptr::after_insert(self.addresses.owners(ip), existing);
        if let PtrAction::CreateAuto { host } = action {
            let id = PtrOverrideId(self.allocate_id());
            let ptr = PtrOverride {
                id,
                host,
                ip,
                provenance: Provenance::Auto,
                created_at: tx.now,
            };
            debug!(%ip, host = %host, "creating automatic PTR override");
            self.addresses.set_override(ip, id);
            self.state.ptr_overrides.insert(id, ptr.clone());
            tx.saved(TABLE_PTR_OVERRIDES, id, &ptr);
            tx.touch(self.zone_index.resolve_ip(ip));
            tx.ptr_created += 1;
        }
    }

    fn ptr_after_delete(&mut self, tx: &mut Tx, ip: IpAddr) {
        let remaining = self.addresses.owners(ip);
        let existing = self.ptr_override_for(ip);
        if let PtrAction::RemoveAuto { id } = ptr::after_delete(remaining, existing) {
            debug!(%ip, remaining = remaining.len(), "removing automatic PTR override");
            self.remove_ptr_override(tx, id);
            tx.ptr_removed += 1;
        }
    }

    fn remove_ptr_override(&mut self, tx: &mut Tx, id: PtrOverrideId) {
        if let Some(ptr) = self.state.ptr_overrides.remove(&id) {
            self.addresses.clear_override(ptr.ip);
            tx.deleted(TABLE_PTR_OVERRIDES, id, &ptr);
            tx.touch(self.zone_index.resolve_ip(ptr.ip));
        }
    }
}
