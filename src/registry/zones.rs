// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone administration, delegations, nameservers and publishing.
//!
//! Creating or deleting a zone changes which zone is the most specific one for
//! existing names. Both operations re-home the hosts, CNAMEs and SRV records that
//! were (or are about to be) covered by the zone and mark the parent zone dirty.
//!
//! Nameservers are shared rows. They are created on first use and removed once no
//! zone or delegation lists them.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::net::IpAddr;

use ipnet::IpNet;
use serde::Serialize;
use tracing::{debug, info};

use super::{Registry, Tx};
use crate::constants::{
    MAX_TTL_SECS, TABLE_CNAMES, TABLE_DELEGATIONS, TABLE_HOSTS, TABLE_NAMESERVERS, TABLE_SRVS,
    TABLE_ZONES,
};
use crate::metrics;
use crate::model::{
    Cname, Delegation, DelegationId, HinfoPreset, Host, HostId, Ipaddress, Mx, NameServer,
    NameServerId, Naptr, NewDelegation, NewZone, Srv, Txt, Zone, ZoneId, ZoneKind, ZoneUpdate,
};
use crate::registry_errors::{RegistryError, Result, ValidationError};
use crate::reverse::{is_reverse_name, parse_reverse_name, pointer_name_in};
use crate::serial::next_serial;
use crate::validators::{
    normalize_name, validate_dns_name, validate_email, validate_nameservers,
    validate_reverse_zone_name, validate_serial, validate_ttl, validate_zone_name,
};
use crate::zones::{advance_serial, is_within};

// ============================================================================
// Rendered zone contents
// ============================================================================

/// Everything a zone file renderer needs for one zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneContents {
    pub zone: Zone,
    /// Nameservers in zone order; the first one is the primary
    pub nameservers: Vec<NameServer>,
    /// Delegations ordered by name
    pub delegations: Vec<DelegationContents>,
    /// Hosts ordered by name, with their attached records
    pub hosts: Vec<HostRecords>,
    pub cnames: Vec<Cname>,
    pub srvs: Vec<Srv>,
    /// PTR records of a reverse zone, ordered by address
    pub ptrs: Vec<PtrRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationContents {
    pub delegation: Delegation,
    pub nameservers: Vec<NameServer>,
}

/// A host and the records rendered at its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRecords {
    pub host: Host,
    pub addresses: Vec<Ipaddress>,
    pub txts: Vec<Txt>,
    pub mxs: Vec<Mx>,
    pub naptrs: Vec<Naptr>,
    pub hinfo: Option<HinfoPreset>,
}

/// One PTR record: the pointer name of `ip` and the host name it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PtrRecord {
    pub ip: IpAddr,
    pub name: String,
    pub target: String,
}

// ============================================================================
// Helpers
// ============================================================================

fn check_soa_timer(value: u32) -> std::result::Result<u32, ValidationError> {
    if value == 0 || value > MAX_TTL_SECS {
        return Err(ValidationError::InvalidTtl {
            value: i64::from(value),
        });
    }
    Ok(value)
}

/// Detects the kind of a zone from its name and validates it accordingly.
fn parse_zone_name(name: &str) -> Result<(String, ZoneKind)> {
    let normalized = normalize_name(name);
    if is_reverse_name(&normalized) {
        let name = validate_reverse_zone_name(&normalized)?;
        let network = parse_reverse_name(&name)?;
        Ok((name, ZoneKind::Reverse { network }))
    } else {
        Ok((validate_zone_name(&normalized)?, ZoneKind::Forward))
    }
}

fn same_family(a: IpNet, b: IpNet) -> bool {
    matches!(
        (a, b),
        (IpNet::V4(_), IpNet::V4(_)) | (IpNet::V6(_), IpNet::V6(_))
    )
}

impl Registry {
    /// Zone that would contain `name` (or `kind`'s range) if no zone of that exact
    /// name existed.
    fn parent_zone(&self, name: &str, kind: ZoneKind) -> Option<ZoneId> {
        match kind {
            ZoneKind::Forward => self
                .zone_index
                .resolve_name(name)
                .filter(|id| self.state.zones.get(id).is_some_and(|z| z.name != name)),
            ZoneKind::Reverse { network } => self
                .zone_index
                .resolve_range(network)
                .filter(|id| {
                    self.state
                        .zones
                        .get(id)
                        .is_some_and(|z| z.kind.network() != Some(network))
                }),
        }
    }

    fn nameserver_named(&self, name: &str) -> Option<&NameServer> {
        self.state.nameservers.values().find(|ns| ns.name == name)
    }

    fn nameservers_of(&self, ids: &[NameServerId]) -> Vec<NameServer> {
        ids.iter()
            .filter_map(|id| self.state.nameservers.get(id))
            .cloned()
            .collect()
    }

    /// Returns the ids of `names`, creating missing nameserver rows.
    fn intern_nameservers(&mut self, tx: &mut Tx, names: &[String]) -> Vec<NameServerId> {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            if let Some(existing) = self.nameserver_named(name) {
                ids.push(existing.id);
                continue;
            }
            let ns = NameServer {
                id: NameServerId(self.allocate_id()),
                name: name.clone(),
                ttl: None,
            };
            tx.saved(TABLE_NAMESERVERS, ns.id, &ns);
            ids.push(ns.id);
            self.state.nameservers.insert(ns.id, ns);
        }
        ids
    }

    /// Removes nameserver rows no zone or delegation references.
    fn collect_nameservers(&mut self, tx: &mut Tx) {
        let referenced: HashSet<NameServerId> = self
            .state
            .zones
            .values()
            .flat_map(|z| z.nameservers.iter().copied())
            .chain(
                self.state
                    .delegations
                    .values()
                    .flat_map(|d| d.nameservers.iter().copied()),
            )
            .collect();
        let orphans: Vec<NameServerId> = self
            .state
            .nameservers
            .keys()
            .filter(|id| !referenced.contains(id))
            .copied()
            .collect();
        for id in orphans {
            if let Some(ns) = self.state.nameservers.remove(&id) {
                debug!(nameserver = %ns.name, "removing unreferenced nameserver");
                tx.deleted(TABLE_NAMESERVERS, id, &ns);
            }
        }
    }

    /// Recomputes the zone of every host, CNAME and SRV record currently in `from`.
    fn rehome(&mut self, tx: &mut Tx, from: Option<ZoneId>) {
        let zone_index = &self.zone_index;

        for host in self.state.hosts.values_mut().filter(|h| h.zone == from) {
            let zone = zone_index.resolve_name(&host.name);
            if zone != host.zone {
                debug!(host = %host.name, from = ?host.zone, to = ?zone, "re-homing host");
                host.zone = zone;
                host.updated_at = tx.now;
                tx.touch(zone);
                tx.saved(TABLE_HOSTS, host.id, &*host);
            }
        }
        for cname in self.state.cnames.values_mut().filter(|c| c.zone == from) {
            let zone = zone_index.resolve_name(&cname.name);
            if zone != cname.zone {
                debug!(cname = %cname.name, from = ?cname.zone, to = ?zone, "re-homing CNAME");
                cname.zone = zone;
                tx.touch(zone);
                tx.saved(TABLE_CNAMES, cname.id, &*cname);
            }
        }
        for srv in self.state.srvs.values_mut().filter(|s| s.zone == from) {
            let zone = zone_index.resolve_name(&srv.name);
            if zone != srv.zone {
                debug!(srv = %srv.name, from = ?srv.zone, to = ?zone, "re-homing SRV record");
                srv.zone = zone;
                tx.touch(zone);
                tx.saved(TABLE_SRVS, srv.id, &*srv);
            }
        }
    }

    // ========================================================================
    // Zones
    // ========================================================================

    /// Creates a forward or reverse zone; the kind is detected from the name.
    ///
    /// The new zone starts dirty with serial `today00`. Names it now covers move into
    /// it and its parent zone is marked dirty.
    ///
    /// # Errors
    ///
    /// * `Validation` - malformed name, e-mail, nameserver list or SOA timer
    /// * `Conflict` - a zone with this name (or the same reverse range) exists
    /// * `Forbidden` - `primary_ns` is not in the nameserver list
    /// * `SerialOverflow` - today's date cannot be encoded as a serial
    pub fn create_zone(&mut self, request: NewZone) -> Result<Zone> {
        let (name, kind) = parse_zone_name(&request.name)?;
        if self.zone_names.contains_key(&name) {
            return Err(RegistryError::conflict("Zone", name, "zone already exists"));
        }
        if let ZoneKind::Reverse { network } = kind {
            let duplicate = self
                .zone_index
                .resolve_range(network)
                .and_then(|id| self.state.zones.get(&id))
                .filter(|z| z.kind.network() == Some(network));
            if let Some(existing) = duplicate {
                return Err(RegistryError::conflict(
                    "Zone",
                    name,
                    format!("zone '{}' already covers {network}", existing.name),
                ));
            }
        }
        let email = validate_email(&request.email)?;
        let nameservers = validate_nameservers(&request.nameservers)?;
        let primary_ns = match &request.primary_ns {
            Some(primary) => {
                let primary = normalize_name(primary);
                if !nameservers.contains(&primary) {
                    return Err(RegistryError::forbidden(
                        "Zone",
                        name,
                        format!("primary nameserver '{primary}' is not in the nameserver list"),
                    ));
                }
                primary
            }
            None => nameservers
                .first()
                .cloned()
                .ok_or(ValidationError::EmptyNameserverList)?,
        };
        let soa = &self.config.soa;
        let refresh = check_soa_timer(request.refresh.unwrap_or(soa.refresh))?;
        let retry = check_soa_timer(request.retry.unwrap_or(soa.retry))?;
        let expire = check_soa_timer(request.expire.unwrap_or(soa.expire))?;
        let ttl = check_soa_timer(request.ttl.unwrap_or(soa.ttl))?;

        let mut tx = self.begin();
        let serialno = next_serial(tx.now.date_naive(), None)?;
        let parent = self.parent_zone(&name, kind);

        let nameserver_ids = self.intern_nameservers(&mut tx, &nameservers);
        let zone = Zone {
            id: ZoneId(self.allocate_id()),
            name,
            kind,
            primary_ns,
            email,
            serialno,
            serialno_updated_at: tx.now,
            refresh,
            retry,
            expire,
            ttl,
            nameservers: nameserver_ids,
            updated: true,
            updated_at: tx.now,
            created_at: tx.now,
        };
        self.zone_index.insert(&zone.name, zone.kind, zone.id);
        self.zone_names.insert(zone.name.clone(), zone.id);
        self.state.zones.insert(zone.id, zone.clone());
        tx.saved(TABLE_ZONES, zone.id, &zone);
        tx.touch(parent);
        self.rehome(&mut tx, parent);

        self.commit("create_zone", tx);
        info!(zone = %zone.name, id = %zone.id, reverse = zone.kind.is_reverse(), "created zone");
        Ok(zone)
    }

    /// Updates SOA fields of a zone and marks it dirty.
    ///
    /// # Errors
    ///
    /// * `NotFound` - unknown zone
    /// * `Forbidden` - a different name, or a primary nameserver outside the list
    /// * `Validation` - malformed e-mail, serial or SOA timer
    pub fn update_zone(&mut self, name: &str, update: ZoneUpdate) -> Result<Zone> {
        let current = self.require_zone(name)?.clone();
        if let Some(new_name) = &update.name {
            if normalize_name(new_name) != current.name {
                return Err(RegistryError::forbidden(
                    "Zone",
                    current.name,
                    "zone name is immutable",
                ));
            }
        }
        let primary_ns = match &update.primary_ns {
            Some(primary) => {
                let primary = normalize_name(primary);
                let listed = self
                    .nameservers_of(&current.nameservers)
                    .iter()
                    .any(|ns| ns.name == primary);
                if !listed {
                    return Err(RegistryError::forbidden(
                        "Zone",
                        current.name,
                        format!("primary nameserver '{primary}' is not in the nameserver list"),
                    ));
                }
                primary
            }
            None => current.primary_ns.clone(),
        };
        let email = update
            .email
            .as_deref()
            .map(validate_email)
            .transpose()?
            .unwrap_or_else(|| current.email.clone());
        let serialno = update.serialno.map(validate_serial).transpose()?;
        let refresh = update.refresh.map(check_soa_timer).transpose()?;
        let retry = update.retry.map(check_soa_timer).transpose()?;
        let expire = update.expire.map(check_soa_timer).transpose()?;
        let ttl = update.ttl.map(check_soa_timer).transpose()?;

        let mut tx = self.begin();
        let mut zone = current;
        zone.primary_ns = primary_ns;
        zone.email = email;
        if let Some(serialno) = serialno {
            zone.serialno = serialno;
            zone.serialno_updated_at = tx.now;
        }
        zone.refresh = refresh.unwrap_or(zone.refresh);
        zone.retry = retry.unwrap_or(zone.retry);
        zone.expire = expire.unwrap_or(zone.expire);
        zone.ttl = ttl.unwrap_or(zone.ttl);

        self.state.zones.insert(zone.id, zone.clone());
        tx.saved(TABLE_ZONES, zone.id, &zone);
        tx.touch(Some(zone.id));

        self.commit("update_zone", tx);
        info!(zone = %zone.name, "updated zone");
        Ok(self.state.zones.get(&zone.id).cloned().unwrap_or(zone))
    }

    /// Replaces the nameserver list of a zone. The first entry becomes primary.
    ///
    /// # Errors
    ///
    /// * `NotFound` - unknown zone
    /// * `Validation` - empty list, duplicates or malformed names
    pub fn set_nameservers<S: AsRef<str>>(&mut self, name: &str, nameservers: &[S]) -> Result<Zone> {
        let id = self.require_zone(name)?.id;
        let names = validate_nameservers(nameservers)?;
        let primary_ns = names
            .first()
            .cloned()
            .ok_or(ValidationError::EmptyNameserverList)?;

        let mut tx = self.begin();
        let ids = self.intern_nameservers(&mut tx, &names);
        if let Some(zone) = self.state.zones.get_mut(&id) {
            zone.nameservers = ids;
            zone.primary_ns = primary_ns;
            tx.saved(TABLE_ZONES, id, &*zone);
        }
        tx.touch(Some(id));
        self.collect_nameservers(&mut tx);

        self.commit("set_nameservers", tx);
        info!(zone = %name, nameservers = ?names, "replaced zone nameservers");
        self.require_zone(name).cloned()
    }

    /// Deletes a zone together with its delegations.
    ///
    /// CNAME and SRV records inside the zone move to the next enclosing zone, if any.
    ///
    /// # Errors
    ///
    /// * `NotFound` - unknown zone
    /// * `Forbidden` - hosts still belong to the zone
    pub fn delete_zone(&mut self, name: &str) -> Result<()> {
        let zone = self.require_zone(name)?.clone();
        let hosts = self
            .state
            .hosts
            .values()
            .filter(|h| h.zone == Some(zone.id))
            .count();
        if hosts > 0 {
            return Err(RegistryError::forbidden(
                "Zone",
                zone.name,
                format!("zone still has {hosts} host(s)"),
            ));
        }

        let mut tx = self.begin();
        let delegations: Vec<DelegationId> = self
            .state
            .delegations
            .values()
            .filter(|d| d.zone == zone.id)
            .map(|d| d.id)
            .collect();
        for id in delegations {
            if let Some(delegation) = self.state.delegations.remove(&id) {
                tx.deleted(TABLE_DELEGATIONS, id, &delegation);
            }
        }

        self.zone_index.remove(&zone.name, zone.kind);
        self.zone_names.remove(&zone.name);
        self.state.zones.remove(&zone.id);
        tx.deleted(TABLE_ZONES, zone.id, &zone);

        let parent = self.parent_zone(&zone.name, zone.kind);
        tx.touch(parent);
        self.rehome(&mut tx, Some(zone.id));
        self.collect_nameservers(&mut tx);

        self.commit("delete_zone", tx);
        info!(zone = %zone.name, "deleted zone");
        Ok(())
    }

    // ========================================================================
    // Delegations
    // ========================================================================

    /// Delegates a sub-name of a zone to external nameservers.
    ///
    /// Forward delegations must be strict sub-domains of the zone. Reverse
    /// delegations must use the zone's address family and cover a strictly smaller
    /// range inside it.
    ///
    /// # Errors
    ///
    /// * `NotFound` - unknown zone
    /// * `Validation(NotSubdomain)`, `Validation(AddressFamilyMismatch)`,
    ///   `Validation(NotContained)` - the name is outside the zone
    /// * `Validation` - malformed name or nameserver list
    /// * `Conflict` - the delegation already exists
    pub fn create_delegation(&mut self, zone_name: &str, request: NewDelegation) -> Result<Delegation> {
        let zone = self.require_zone(zone_name)?.clone();
        let (name, kind) = match zone.kind {
            ZoneKind::Forward => {
                let name = validate_dns_name(&request.name)?;
                if name == zone.name || !is_within(&name, &zone.name) {
                    return Err(ValidationError::NotSubdomain {
                        name,
                        zone: zone.name,
                    }
                    .into());
                }
                (name, ZoneKind::Forward)
            }
            ZoneKind::Reverse { network } => {
                let name = validate_reverse_zone_name(&request.name)?;
                let range = parse_reverse_name(&name)?;
                if !same_family(network, range) {
                    return Err(ValidationError::AddressFamilyMismatch {
                        name,
                        zone: zone.name,
                    }
                    .into());
                }
                if !network.contains(&range) || range.prefix_len() <= network.prefix_len() {
                    return Err(ValidationError::NotContained {
                        name,
                        zone: zone.name,
                    }
                    .into());
                }
                (name, ZoneKind::Reverse { network: range })
            }
        };
        if self.state.delegations.values().any(|d| d.name == name) {
            return Err(RegistryError::conflict(
                "Delegation",
                name,
                "delegation already exists",
            ));
        }
        let nameservers = validate_nameservers(&request.nameservers)?;
        let comment = request
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let mut tx = self.begin();
        let nameserver_ids = self.intern_nameservers(&mut tx, &nameservers);
        let delegation = Delegation {
            id: DelegationId(self.allocate_id()),
            zone: zone.id,
            name,
            kind,
            nameservers: nameserver_ids,
            comment,
        };
        self.state.delegations.insert(delegation.id, delegation.clone());
        tx.saved(TABLE_DELEGATIONS, delegation.id, &delegation);
        tx.touch(Some(zone.id));

        self.commit("create_delegation", tx);
        info!(zone = %zone.name, delegation = %delegation.name, "created delegation");
        Ok(delegation)
    }

    /// # Errors
    ///
    /// Returns `NotFound` for an unknown zone or delegation.
    pub fn delete_delegation(&mut self, zone_name: &str, name: &str) -> Result<()> {
        let zone_id = self.require_zone(zone_name)?.id;
        let name = normalize_name(name);
        let id = self
            .state
            .delegations
            .values()
            .find(|d| d.zone == zone_id && d.name == name)
            .map(|d| d.id)
            .ok_or_else(|| RegistryError::not_found("Delegation", &name))?;

        let mut tx = self.begin();
        if let Some(delegation) = self.state.delegations.remove(&id) {
            tx.deleted(TABLE_DELEGATIONS, id, &delegation);
        }
        tx.touch(Some(zone_id));
        self.collect_nameservers(&mut tx);

        self.commit("delete_delegation", tx);
        info!(delegation = %name, "deleted delegation");
        Ok(())
    }

    /// Delegations of one zone, ordered by name.
    #[must_use]
    pub fn delegations(&self, zone: ZoneId) -> Vec<&Delegation> {
        let mut delegations: Vec<&Delegation> = self
            .state
            .delegations
            .values()
            .filter(|d| d.zone == zone)
            .collect();
        delegations.sort_by(|a, b| a.name.cmp(&b.name));
        delegations
    }

    // ========================================================================
    // Nameservers
    // ========================================================================

    #[must_use]
    pub fn nameserver(&self, name: &str) -> Option<&NameServer> {
        self.nameserver_named(&normalize_name(name))
    }

    /// Sets the glue TTL of a nameserver and dirties every zone that lists it.
    ///
    /// # Errors
    ///
    /// * `NotFound` - unknown nameserver
    /// * `Validation(InvalidTtl)` - TTL out of range
    pub fn set_nameserver_ttl(&mut self, name: &str, ttl: Option<i64>) -> Result<NameServer> {
        let id = self
            .nameserver(name)
            .map(|ns| ns.id)
            .ok_or_else(|| RegistryError::not_found("NameServer", normalize_name(name)))?;
        let ttl = ttl.map(validate_ttl).transpose()?;

        let mut tx = self.begin();
        let zones: BTreeSet<ZoneId> = self
            .state
            .zones
            .values()
            .filter(|z| z.nameservers.contains(&id))
            .map(|z| z.id)
            .chain(
                self.state
                    .delegations
                    .values()
                    .filter(|d| d.nameservers.contains(&id))
                    .map(|d| d.zone),
            )
            .collect();
        for zone in zones {
            tx.touch(Some(zone));
        }
        let Some(ns) = self.state.nameservers.get_mut(&id) else {
            return Err(RegistryError::not_found("NameServer", id));
        };
        ns.ttl = ttl;
        let ns = ns.clone();
        tx.saved(TABLE_NAMESERVERS, id, &ns);

        self.commit("set_nameserver_ttl", tx);
        Ok(ns)
    }

    // ========================================================================
    // Publishing
    // ========================================================================

    /// Advances the serial of a dirty zone, clears its dirty flag and returns its
    /// contents. A clean zone is returned unchanged.
    ///
    /// # Errors
    ///
    /// * `NotFound` - unknown zone
    /// * `SerialOverflow` - the serial cannot be advanced today; the zone stays dirty
    pub fn publish_zone(&mut self, name: &str) -> Result<ZoneContents> {
        let mut zone = self.require_zone(name)?.clone();
        let mut tx = self.begin();
        let previous = zone.serialno;
        if advance_serial(&mut zone, tx.now.date_naive(), tx.now)? {
            self.state.zones.insert(zone.id, zone.clone());
            tx.saved(TABLE_ZONES, zone.id, &zone);
            metrics::record_zone_published();
            self.commit("publish_zone", tx);
            info!(zone = %zone.name, from = previous, to = zone.serialno, "published zone");
        } else {
            debug!(zone = %zone.name, serial = zone.serialno, "zone is clean, serial unchanged");
        }
        self.zone_contents(&zone.name)
    }

    /// Collects everything rendered into one zone.
    ///
    /// Forward zones list their hosts with attached records. Reverse zones list one
    /// PTR record per address whose most specific reverse zone is this one; the
    /// record points at the override host if there is one, else at the earliest
    /// owner.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown zone.
    pub fn zone_contents(&self, name: &str) -> Result<ZoneContents> {
        let zone = self.require_zone(name)?;
        let state = &self.state;

        let delegations: Vec<DelegationContents> = self
            .delegations(zone.id)
            .into_iter()
            .map(|d| DelegationContents {
                delegation: d.clone(),
                nameservers: self.nameservers_of(&d.nameservers),
            })
            .collect();

        let mut members: Vec<&Host> = state
            .hosts
            .values()
            .filter(|h| h.zone == Some(zone.id))
            .collect();
        members.sort_by(|a, b| a.name.cmp(&b.name));

        let mut records: HashMap<HostId, HostRecords> = members
            .iter()
            .map(|host| {
                (
                    host.id,
                    HostRecords {
                        host: (*host).clone(),
                        addresses: Vec::new(),
                        txts: Vec::new(),
                        mxs: Vec::new(),
                        naptrs: Vec::new(),
                        hinfo: host
                            .hinfo
                            .and_then(|id| state.hinfo_presets.get(&id))
                            .cloned(),
                    },
                )
            })
            .collect();
        for row in state.ipaddresses.values() {
            if let Some(entry) = records.get_mut(&row.host) {
                entry.addresses.push(row.clone());
            }
        }
        for txt in state.txts.values() {
            if let Some(entry) = records.get_mut(&txt.host) {
                entry.txts.push(txt.clone());
            }
        }
        for mx in state.mxs.values() {
            if let Some(entry) = records.get_mut(&mx.host) {
                entry.mxs.push(mx.clone());
            }
        }
        for naptr in state.naptrs.values() {
            if let Some(entry) = records.get_mut(&naptr.host) {
                entry.naptrs.push(naptr.clone());
            }
        }
        let hosts: Vec<HostRecords> = members
            .iter()
            .filter_map(|host| records.remove(&host.id))
            .map(|mut entry| {
                entry.addresses.sort_by_key(|row| row.ip);
                entry.mxs.sort_by(|a, b| (a.priority, &a.mx).cmp(&(b.priority, &b.mx)));
                entry.naptrs.sort_by_key(|n| (n.order, n.preference));
                entry
            })
            .collect();

        let mut cnames: Vec<Cname> = state
            .cnames
            .values()
            .filter(|c| c.zone == Some(zone.id))
            .cloned()
            .collect();
        cnames.sort_by(|a, b| a.name.cmp(&b.name));

        let mut srvs: Vec<Srv> = state
            .srvs
            .values()
            .filter(|s| s.zone == Some(zone.id))
            .cloned()
            .collect();
        srvs.sort_by(|a, b| {
            (&a.name, a.priority, a.weight, a.port, &a.target)
                .cmp(&(&b.name, b.priority, b.weight, b.port, &b.target))
        });

        Ok(ZoneContents {
            zone: zone.clone(),
            nameservers: self.nameservers_of(&zone.nameservers),
            delegations,
            hosts,
            cnames,
            srvs,
            ptrs: self.ptr_records(zone),
        })
    }

    fn ptr_records(&self, zone: &Zone) -> Vec<PtrRecord> {
        let Some(network) = zone.kind.network() else {
            return Vec::new();
        };
        let range = network.network()..=network.broadcast();
        let mut ips: BTreeSet<IpAddr> = self.addresses.owned_in(range.clone()).collect();
        ips.extend(self.addresses.overridden_in(range).map(|(ip, _)| ip));

        ips.into_iter()
            .filter(|ip| self.zone_index.resolve_ip(*ip) == Some(zone.id))
            .filter_map(|ip| {
                let target = self
                    .ptr_override_for(ip)
                    .map(|ptr| ptr.host)
                    .or_else(|| self.addresses.owners(ip).first().map(|o| o.host))?;
                let host = self.state.hosts.get(&target)?;
                Some(PtrRecord {
                    ip,
                    name: pointer_name_in(ip, &zone.name),
                    target: host.name.clone(),
                })
            })
            .collect()
    }
}
