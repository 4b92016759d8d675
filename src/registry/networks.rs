// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Network CRUD and address usage reports.

use std::net::IpAddr;

use ipnet::IpNet;
use serde::Serialize;
use tracing::info;

use super::Registry;
use crate::constants::TABLE_NETWORKS;
use crate::model::{Network, NetworkId, NetworkUpdate, NewNetwork};
use crate::network::{address_count, ensure_canonical, validate_reserved, NetworkUsage};
use crate::registry_errors::{RegistryError, Result};

/// Address usage of one network.
///
/// `unused_list` is capped at the configured `maxUnusedList`; `unused_count` is
/// always exact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkReport {
    pub network: Network,
    pub address_count: u128,
    pub used_count: usize,
    pub used_list: Vec<IpAddr>,
    pub unused_count: u128,
    pub unused_list: Vec<IpAddr>,
    pub first_unused: Option<IpAddr>,
    pub reserved_list: Vec<IpAddr>,
    pub ptr_override_list: Vec<IpAddr>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Registry {
    /// Network containing `ip`, if any.
    #[must_use]
    pub fn find_network(&self, ip: IpAddr) -> Option<&Network> {
        self.network_index
            .find(ip)
            .and_then(|(_, id)| self.state.networks.get(&id))
    }

    #[must_use]
    pub fn network_by_range(&self, range: IpNet) -> Option<&Network> {
        self.find_network(range.network())
            .filter(|network| network.network == range)
    }

    fn require_network(&self, id: NetworkId) -> Result<&Network> {
        self.state
            .networks
            .get(&id)
            .ok_or_else(|| RegistryError::not_found("Network", id))
    }

    /// Creates a network. `reserved` defaults to the configured count.
    ///
    /// # Errors
    ///
    /// * `Validation(InvalidNetwork)` - host bits are set or the reserved count is too large
    /// * `Overlap` - the range intersects a stored network
    pub fn create_network(&mut self, request: NewNetwork) -> Result<Network> {
        let range = ensure_canonical(request.network)?;
        let reserved = validate_reserved(
            range,
            request.reserved.unwrap_or(self.config.network.reserved),
        )?;
        self.network_index.check_overlap(range, None)?;

        let mut tx = self.begin();
        let network = Network {
            id: NetworkId(self.allocate_id()),
            network: range,
            vlan: request.vlan,
            category: trimmed(request.category),
            location: trimmed(request.location),
            description: trimmed(request.description),
            frozen: request.frozen,
            reserved,
        };
        self.network_index.insert(range, network.id);
        self.state.networks.insert(network.id, network.clone());
        tx.saved(TABLE_NETWORKS, network.id, &network);

        self.commit("create_network", tx);
        info!(network = %range, id = %network.id, "created network");
        Ok(network)
    }

    /// Updates a network. A new range is checked against every other network.
    ///
    /// # Errors
    ///
    /// * `NotFound` - unknown network
    /// * `Validation(InvalidNetwork)` - host bits are set or the reserved count is too large
    /// * `Overlap` - the new range intersects another network
    pub fn update_network(&mut self, id: NetworkId, update: NetworkUpdate) -> Result<Network> {
        let current = self.require_network(id)?.clone();
        let range = match update.network {
            Some(range) => {
                let range = ensure_canonical(range)?;
                self.network_index.check_overlap(range, Some(id))?;
                range
            }
            None => current.network,
        };
        let reserved = validate_reserved(range, update.reserved.unwrap_or(current.reserved))?;

        let mut tx = self.begin();
        let network = Network {
            id,
            network: range,
            vlan: update.vlan.unwrap_or(current.vlan),
            category: update.category.map_or(current.category, trimmed),
            location: update.location.map_or(current.location, trimmed),
            description: update.description.map_or(current.description, trimmed),
            frozen: update.frozen.unwrap_or(current.frozen),
            reserved,
        };
        if range != current.network {
            self.network_index.remove(current.network);
            self.network_index.insert(range, id);
        }
        self.state.networks.insert(id, network.clone());
        tx.saved(TABLE_NETWORKS, id, &network);

        self.commit("update_network", tx);
        info!(network = %range, id = %id, frozen = network.frozen, "updated network");
        Ok(network)
    }

    /// Deletes a network that has no used addresses.
    ///
    /// # Errors
    ///
    /// * `NotFound` - unknown network
    /// * `NetworkInUse` - an address inside the range is held or overridden
    pub fn delete_network(&mut self, id: NetworkId) -> Result<()> {
        let usage = self.network_usage(id)?;
        if usage.used_count() > 0 {
            return Err(RegistryError::NetworkInUse {
                network: usage.range(),
                used: usage.used_count(),
            });
        }

        let mut tx = self.begin();
        if let Some(network) = self.state.networks.remove(&id) {
            self.network_index.remove(network.network);
            tx.deleted(TABLE_NETWORKS, id, &network);
        }
        self.commit("delete_network", tx);
        info!(network = %usage.range(), "deleted network");
        Ok(())
    }

    /// Used addresses of a network: every address held by a host or carrying a PTR
    /// override.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown network.
    pub fn network_usage(&self, id: NetworkId) -> Result<NetworkUsage> {
        let network = self.require_network(id)?;
        let range = network.network.network()..=network.network.broadcast();
        let used = self
            .addresses
            .owned_in(range.clone())
            .chain(self.addresses.overridden_in(range).map(|(ip, _)| ip));
        Ok(NetworkUsage::new(network.network, network.reserved, used))
    }

    /// Full usage report of a network.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown network.
    pub fn network_report(&self, id: NetworkId) -> Result<NetworkReport> {
        let network = self.require_network(id)?.clone();
        let usage = self.network_usage(id)?;
        let range = network.network.network()..=network.network.broadcast();

        Ok(NetworkReport {
            address_count: address_count(network.network),
            used_count: usage.used_count(),
            used_list: usage.used().iter().copied().collect(),
            unused_count: usage.unused_count(),
            unused_list: usage.unused_list(self.config.network.max_unused_list),
            first_unused: usage.first_unused(),
            reserved_list: usage.reserved_list(),
            ptr_override_list: self
                .addresses
                .overridden_in(range)
                .map(|(ip, _)| ip)
                .collect(),
            network,
        })
    }
}
