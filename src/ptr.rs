// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! PTR synchronization engine.
//!
//! An address held by more than one host needs a single authoritative reverse
//! mapping. The engine keeps two indexes over the stored rows:
//!
//! - owners per address, ordered by their `acquired` sequence
//! - the PTR override per address (at most one)
//!
//! and decides, after every insert or delete of an `(host, ip)` pair, whether an
//! automatic override must be created or removed. Explicit overrides are never
//! touched by these decisions.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::IpAddr;
use std::ops::RangeInclusive;

use crate::model::{HostId, IpaddressId, PtrOverride, PtrOverrideId};

/// One row owning an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub acquired: u64,
    pub row: IpaddressId,
    pub host: HostId,
}

/// Outcome of a PTR decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PtrAction {
    /// Nothing to do
    Keep,
    /// Create an automatic override pointing at `host`
    CreateAuto { host: HostId },
    /// Remove the automatic override `id`
    RemoveAuto { id: PtrOverrideId },
}

/// Decides what happens after an owner was added to an address.
///
/// `owners` is the full owner list after the insert, ordered by `acquired`. When two or
/// more owners share the address and no override exists, the earliest owner gets one.
#[must_use]
pub fn after_insert(owners: &[Owner], existing: Option<&PtrOverride>) -> PtrAction {
    match (owners.first(), existing) {
        (Some(first), None) if owners.len() >= 2 => PtrAction::CreateAuto { host: first.host },
        _ => PtrAction::Keep,
    }
}

/// Decides what happens after an owner was removed from an address.
///
/// `remaining` is the owner list after the delete. An automatic override is dropped
/// when no owner is left, or when the single remaining owner is the host it points
/// at. With two or more owners left the override is kept as-is, even if it points at
/// the departed owner.
#[must_use]
pub fn after_delete(remaining: &[Owner], existing: Option<&PtrOverride>) -> PtrAction {
    let Some(ptr) = existing.filter(|p| p.is_auto()) else {
        return PtrAction::Keep;
    };
    match remaining {
        [] => PtrAction::RemoveAuto { id: ptr.id },
        [sole] if sole.host == ptr.host => PtrAction::RemoveAuto { id: ptr.id },
        _ => PtrAction::Keep,
    }
}

/// Address-side indexes: owners, overrides and MAC addresses.
#[derive(Debug, Default, Clone)]
pub struct AddressIndex {
    owners: BTreeMap<IpAddr, Vec<Owner>>,
    overrides: BTreeMap<IpAddr, PtrOverrideId>,
    macs: HashMap<String, BTreeSet<IpaddressId>>,
}

impl AddressIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an owner, keeping the list ordered by `acquired`.
    pub fn add_owner(&mut self, ip: IpAddr, owner: Owner) {
        let owners = self.owners.entry(ip).or_default();
        let position = owners
            .binary_search_by_key(&owner.acquired, |o| o.acquired)
            .unwrap_or_else(|pos| pos);
        owners.insert(position, owner);
    }

    /// Removes an owner row and returns the number of owners left.
    pub fn remove_owner(&mut self, ip: IpAddr, row: IpaddressId) -> usize {
        let Some(owners) = self.owners.get_mut(&ip) else {
            return 0;
        };
        owners.retain(|o| o.row != row);
        let remaining = owners.len();
        if remaining == 0 {
            self.owners.remove(&ip);
        }
        remaining
    }

    /// Owners of `ip`, earliest first.
    #[must_use]
    pub fn owners(&self, ip: IpAddr) -> &[Owner] {
        self.owners.get(&ip).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns true if `host` already holds `ip`.
    #[must_use]
    pub fn holds(&self, ip: IpAddr, host: HostId) -> bool {
        self.owners(ip).iter().any(|o| o.host == host)
    }

    pub fn set_override(&mut self, ip: IpAddr, id: PtrOverrideId) {
        self.overrides.insert(ip, id);
    }

    pub fn clear_override(&mut self, ip: IpAddr) {
        self.overrides.remove(&ip);
    }

    #[must_use]
    pub fn override_for(&self, ip: IpAddr) -> Option<PtrOverrideId> {
        self.overrides.get(&ip).copied()
    }

    /// Addresses with at least one owner inside `range`, ascending.
    pub fn owned_in(&self, range: RangeInclusive<IpAddr>) -> impl Iterator<Item = IpAddr> + '_ {
        self.owners.range(range).map(|(ip, _)| *ip)
    }

    /// Addresses with an override inside `range`, ascending.
    pub fn overridden_in(
        &self,
        range: RangeInclusive<IpAddr>,
    ) -> impl Iterator<Item = (IpAddr, PtrOverrideId)> + '_ {
        self.overrides.range(range).map(|(ip, id)| (*ip, *id))
    }

    pub fn add_mac(&mut self, mac: &str, row: IpaddressId) {
        self.macs.entry(mac.to_string()).or_default().insert(row);
    }

    pub fn remove_mac(&mut self, mac: &str, row: IpaddressId) {
        if let Some(rows) = self.macs.get_mut(mac) {
            rows.remove(&row);
            if rows.is_empty() {
                self.macs.remove(mac);
            }
        }
    }

    /// Rows carrying `mac`.
    pub fn rows_with_mac<'a>(&'a self, mac: &str) -> impl Iterator<Item = IpaddressId> + 'a {
        self.macs.get(mac).into_iter().flatten().copied()
    }
}
