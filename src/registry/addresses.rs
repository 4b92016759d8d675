// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Address rows and PTR overrides.
//!
//! Every address change runs through the PTR engine for the exact address that was
//! added or removed; an address change on an existing row is a delete of the old
//! address followed by an insert of the new one.

use std::net::IpAddr;

use tracing::{debug, info};

use super::Registry;
use crate::constants::{TABLE_IPADDRESSES, TABLE_PTR_OVERRIDES};
use crate::model::{
    HostId, Ipaddress, IpaddressId, IpaddressUpdate, NewIpaddress, Provenance, PtrOverride,
    PtrOverrideId,
};
use crate::ptr::Owner;
use crate::registry_errors::{RegistryError, Result};
use crate::validators::validate_mac;

impl Registry {
    /// Assigns an address to a host.
    ///
    /// Another host may already hold the same address; when the address gains its
    /// second owner an automatic PTR override pointing at the earliest owner is
    /// created.
    ///
    /// # Errors
    ///
    /// * `NotFound` - unknown host
    /// * `Conflict` - the host already holds the address, or the MAC address is used
    ///   in the same broadcast domain
    /// * `Forbidden` - the address lies in a frozen network
    /// * `Validation` - malformed MAC address
    pub fn create_ipaddress(&mut self, request: NewIpaddress) -> Result<Ipaddress> {
        let host_name = self.require_host(request.host)?.name.clone();
        if self.addresses.holds(request.ip, request.host) {
            return Err(RegistryError::conflict(
                "Ipaddress",
                request.ip.to_string(),
                format!("host '{host_name}' already holds this address"),
            ));
        }
        self.check_frozen(request.ip)?;
        let mac = request.mac.as_deref().map(validate_mac).transpose()?;
        if let Some(mac) = &mac {
            self.check_mac(mac, request.ip, None)?;
        }

        let mut tx = self.begin();
        let row = self.attach_address(&mut tx, request.host, request.ip, mac);
        self.commit("create_ipaddress", tx);
        info!(host = %host_name, ip = %row.ip, id = %row.id, "assigned address");
        Ok(row)
    }

    /// Changes the address or MAC address of a row.
    ///
    /// An address change removes the row from its old address (PTR delete path) and
    /// adds it to the new one as its newest owner (PTR insert path).
    ///
    /// # Errors
    ///
    /// * `NotFound` - unknown row
    /// * `Conflict` - the host already holds the new address, or the MAC address is used
    ///   in the same broadcast domain
    /// * `Forbidden` - the old or the new address lies in a frozen network
    pub fn update_ipaddress(&mut self, id: IpaddressId, update: IpaddressUpdate) -> Result<Ipaddress> {
        let current = self
            .state
            .ipaddresses
            .get(&id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found("Ipaddress", id))?;

        let ip = update.ip.unwrap_or(current.ip);
        let ip_changed = ip != current.ip;
        if ip_changed && self.addresses.holds(ip, current.host) {
            return Err(RegistryError::conflict(
                "Ipaddress",
                ip.to_string(),
                "host already holds this address",
            ));
        }
        self.check_frozen(current.ip)?;
        if ip_changed {
            self.check_frozen(ip)?;
        }
        let mac = match &update.mac {
            Some(mac) => mac.as_deref().map(validate_mac).transpose()?,
            None => current.mac.clone(),
        };
        if let Some(mac) = &mac {
            if ip_changed || current.mac.as_ref() != Some(mac) {
                self.check_mac(mac, ip, Some(id))?;
            }
        }

        let mut tx = self.begin();
        let mut row = current.clone();
        row.mac = mac;
        row.updated_at = tx.now;

        if let Some(old) = &current.mac {
            self.addresses.remove_mac(old, id);
        }
        if let Some(new) = &row.mac {
            self.addresses.add_mac(new, id);
        }

        if ip_changed {
            debug!(from = %current.ip, to = %ip, row = %id, "moving address row");
            self.addresses.remove_owner(current.ip, id);
            tx.touch(self.zone_index.resolve_ip(current.ip));
            self.ptr_after_delete(&mut tx, current.ip);

            row.ip = ip;
            row.acquired = self.allocate_acquired();
            self.addresses.add_owner(
                ip,
                Owner {
                    acquired: row.acquired,
                    row: id,
                    host: row.host,
                },
            );
            self.state.ipaddresses.insert(id, row.clone());
            tx.touch(self.zone_index.resolve_ip(ip));
            tx.touch(self.state.hosts.get(&row.host).and_then(|h| h.zone));
            self.ptr_after_insert(&mut tx, ip);
        } else {
            self.state.ipaddresses.insert(id, row.clone());
        }
        tx.saved(TABLE_IPADDRESSES, id, &row);

        self.commit("update_ipaddress", tx);
        info!(ip = %row.ip, id = %id, "updated address");
        Ok(row)
    }

    /// Removes an address row.
    ///
    /// An automatic PTR override is removed once at most one owner is left. With two
    /// or more owners left the override is kept, even if it points at the departed
    /// host.
    ///
    /// # Errors
    ///
    /// * `NotFound` - unknown row
    /// * `Forbidden` - the address lies in a frozen network
    pub fn delete_ipaddress(&mut self, id: IpaddressId) -> Result<()> {
        let ip = self
            .state
            .ipaddresses
            .get(&id)
            .map(|row| row.ip)
            .ok_or_else(|| RegistryError::not_found("Ipaddress", id))?;
        self.check_frozen(ip)?;

        let mut tx = self.begin();
        self.detach_address(&mut tx, id);
        self.commit("delete_ipaddress", tx);
        info!(%ip, id = %id, "removed address");
        Ok(())
    }

    // ========================================================================
    // PTR overrides
    // ========================================================================

    /// Sets an explicit PTR override for `ip`.
    ///
    /// An automatic override on the same address is claimed: it is re-pointed at
    /// `host` and becomes explicit.
    ///
    /// # Errors
    ///
    /// * `NotFound` - unknown host
    /// * `Conflict` - the address already has an explicit override
    /// * `Forbidden` - the address lies in a frozen network
    pub fn create_ptr_override(&mut self, host: HostId, ip: IpAddr) -> Result<PtrOverride> {
        self.require_host(host)?;
        self.check_frozen(ip)?;
        let existing = self.ptr_override_for(ip).cloned();
        if let Some(existing) = &existing {
            if !existing.is_auto() {
                return Err(RegistryError::conflict(
                    "PtrOverride",
                    ip.to_string(),
                    "address already has an explicit PTR override",
                ));
            }
        }

        let mut tx = self.begin();
        let ptr = match existing {
            Some(mut ptr) => {
                debug!(%ip, from = %ptr.host, to = %host, "claiming automatic PTR override");
                ptr.host = host;
                ptr.provenance = Provenance::Explicit;
                ptr
            }
            None => PtrOverride {
                id: PtrOverrideId(self.allocate_id()),
                host,
                ip,
                provenance: Provenance::Explicit,
                created_at: tx.now,
            },
        };
        self.addresses.set_override(ip, ptr.id);
        self.state.ptr_overrides.insert(ptr.id, ptr.clone());
        tx.saved(TABLE_PTR_OVERRIDES, ptr.id, &ptr);
        tx.touch(self.zone_index.resolve_ip(ip));

        self.commit("create_ptr_override", tx);
        info!(%ip, host = %host, "set explicit PTR override");
        Ok(ptr)
    }

    /// Re-points an override at another host. The override becomes explicit.
    ///
    /// # Errors
    ///
    /// * `NotFound` - unknown override or host
    /// * `Forbidden` - the address lies in a frozen network
    pub fn update_ptr_override(&mut self, id: PtrOverrideId, host: HostId) -> Result<PtrOverride> {
        let current = self
            .state
            .ptr_overrides
            .get(&id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found("PtrOverride", id))?;
        self.require_host(host)?;
        self.check_frozen(current.ip)?;

        let mut tx = self.begin();
        let mut ptr = current;
        ptr.host = host;
        ptr.provenance = Provenance::Explicit;
        self.state.ptr_overrides.insert(id, ptr.clone());
        tx.saved(TABLE_PTR_OVERRIDES, id, &ptr);
        tx.touch(self.zone_index.resolve_ip(ptr.ip));

        self.commit("update_ptr_override", tx);
        info!(ip = %ptr.ip, host = %host, "updated PTR override");
        Ok(ptr)
    }

    /// Removes an override of either provenance. No replacement is synthesized.
    ///
    /// # Errors
    ///
    /// * `NotFound` - unknown override
    /// * `Forbidden` - the address lies in a frozen network
    pub fn delete_ptr_override(&mut self, id: PtrOverrideId) -> Result<()> {
        let ip = self
            .state
            .ptr_overrides
            .get(&id)
            .map(|ptr| ptr.ip)
            .ok_or_else(|| RegistryError::not_found("PtrOverride", id))?;
        self.check_frozen(ip)?;

        let mut tx = self.begin();
        self.remove_ptr_override(&mut tx, id);
        self.commit("delete_ptr_override", tx);
        info!(%ip, "removed PTR override");
        Ok(())
    }
}
