// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Network/subnet engine.
//!
//! Keeps stored ranges in a [`BTreeMap`] keyed by network address. Because stored
//! ranges never overlap, the containing network of an address is always the
//! greatest entry whose key is not above the address, which makes both lookups and
//! overlap checks logarithmic.
//!
//! Address arithmetic is done on `u128` so IPv4 and IPv6 share one code path. Counts
//! for an IPv6 `/0` saturate at `u128::MAX`.

use std::collections::{BTreeMap, BTreeSet};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::IpNet;
use tracing::debug;

use crate::constants::MAX_NETWORK_RESERVED;
use crate::model::NetworkId;
use crate::registry_errors::{RegistryError, ValidationError};

/// Index of stored networks, ordered by network address.
#[derive(Debug, Default, Clone)]
pub struct NetworkIndex {
    ranges: BTreeMap<IpAddr, (IpNet, NetworkId)>,
}

impl NetworkIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, range: IpNet, id: NetworkId) {
        self.ranges.insert(range.network(), (range, id));
    }

    pub fn remove(&mut self, range: IpNet) {
        self.ranges.remove(&range.network());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Returns the network containing `ip`, if any.
    #[must_use]
    pub fn find(&self, ip: IpAddr) -> Option<(IpNet, NetworkId)> {
        self.ranges
            .range(..=ip)
            .next_back()
            .map(|(_, entry)| *entry)
            .filter(|(range, _)| range.contains(&ip))
    }

    /// Checks `candidate` against every stored range except `exclude`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Overlap`] naming the first intersecting range.
    pub fn check_overlap(&self, candidate: IpNet, exclude: Option<NetworkId>) -> Result<(), RegistryError> {
        let keep = |(_, (_, id)): &(&IpAddr, &(IpNet, NetworkId))| Some(*id) != exclude;

        let predecessor = self
            .ranges
            .range(..=candidate.network())
            .rev()
            .find(keep)
            .filter(|(_, (range, _))| range.contains(&candidate.network()));

        let inside = self
            .ranges
            .range(candidate.network()..=candidate.broadcast())
            .find(keep);

        match predecessor.or(inside) {
            Some((_, (existing, _))) => {
                debug!(candidate = %candidate, existing = %existing, "network overlap detected");
                Err(RegistryError::Overlap {
                    candidate,
                    existing: *existing,
                })
            }
            None => Ok(()),
        }
    }

    /// Iterates over every stored range in address order.
    pub fn iter(&self) -> impl Iterator<Item = (IpNet, NetworkId)> + '_ {
        self.ranges.values().copied()
    }
}

/// Checks that a range is in canonical form (no host bits set).
///
/// # Errors
///
/// Returns [`ValidationError::InvalidNetwork`] when host bits are set.
pub fn ensure_canonical(range: IpNet) -> Result<IpNet, ValidationError> {
    if range.trunc() == range {
        Ok(range)
    } else {
        Err(ValidationError::InvalidNetwork {
            value: range.to_string(),
            reason: format!("host bits are set, did you mean {}?", range.trunc()),
        })
    }
}

/// Parses and validates a CIDR string.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidNetwork`] if the string does not parse or is not
/// canonical.
pub fn parse_network(value: &str) -> Result<IpNet, ValidationError> {
    let range: IpNet = value
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidNetwork {
            value: value.to_string(),
            reason: "not a CIDR range".to_string(),
        })?;
    ensure_canonical(range)
}

// ============================================================================
// Address arithmetic
// ============================================================================

pub(crate) fn to_u128(ip: IpAddr) -> u128 {
    match ip {
        IpAddr::V4(v4) => u128::from(u32::from(v4)),
        IpAddr::V6(v6) => u128::from(v6),
    }
}

pub(crate) fn from_u128(value: u128, v4: bool) -> IpAddr {
    if v4 {
        // Callers only pass values derived from IPv4 ranges.
        IpAddr::V4(Ipv4Addr::from(u32::try_from(value).unwrap_or(u32::MAX)))
    } else {
        IpAddr::V6(Ipv6Addr::from(value))
    }
}

/// Number of addresses in a range, saturating at `u128::MAX`.
#[must_use]
pub fn address_count(range: IpNet) -> u128 {
    let host_bits = u32::from(range.max_prefix_len() - range.prefix_len());
    1u128.checked_shl(host_bits).unwrap_or(u128::MAX)
}

/// Reserved addresses of a range: the lowest `reserved` addresses plus the top one.
///
/// The result is ascending and never larger than the range.
#[must_use]
pub fn reserved_addresses(range: IpNet, reserved: u32) -> Vec<IpAddr> {
    let v4 = matches!(range, IpNet::V4(_));
    let first = to_u128(range.network());
    let last = to_u128(range.broadcast());
    let size = address_count(range);

    let low = u128::from(reserved).min(size);
    let mut out: Vec<IpAddr> = (0..low).map(|offset| from_u128(first + offset, v4)).collect();
    if low < size {
        out.push(from_u128(last, v4));
    }
    out
}

/// Checks a reserved count against [`MAX_NETWORK_RESERVED`].
///
/// Counts above the size of the range are accepted; they reserve the whole range.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidNetwork`] when the count is above the limit.
pub fn validate_reserved(range: IpNet, reserved: u32) -> Result<u32, ValidationError> {
    if reserved > MAX_NETWORK_RESERVED {
        return Err(ValidationError::InvalidNetwork {
            value: range.to_string(),
            reason: format!("reserved count {reserved} exceeds {MAX_NETWORK_RESERVED}"),
        });
    }
    Ok(reserved)
}

/// Number of reserved addresses in a range without enumerating them.
#[must_use]
pub fn reserved_count(range: IpNet, reserved: u32) -> u128 {
    let size = address_count(range);
    let low = u128::from(reserved).min(size);
    if low < size {
        low + 1
    } else {
        low
    }
}

fn is_reserved(range: IpNet, reserved: u32, ip: IpAddr) -> bool {
    let offset = to_u128(ip) - to_u128(range.network());
    offset < u128::from(reserved) || ip == range.broadcast()
}

// ============================================================================
// Usage report
// ============================================================================

/// Address usage of a single network.
#[derive(Debug, Clone)]
pub struct NetworkUsage {
    range: IpNet,
    reserved: u32,
    used: BTreeSet<IpAddr>,
}

impl NetworkUsage {
    /// Builds a report from the used addresses found inside `range`.
    ///
    /// Addresses outside the range are ignored.
    pub fn new(range: IpNet, reserved: u32, used: impl IntoIterator<Item = IpAddr>) -> Self {
        let used = used.into_iter().filter(|ip| range.contains(ip)).collect();
        Self {
            range,
            reserved,
            used,
        }
    }

    #[must_use]
    pub fn range(&self) -> IpNet {
        self.range
    }

    /// Used addresses in ascending order.
    #[must_use]
    pub fn used(&self) -> &BTreeSet<IpAddr> {
        &self.used
    }

    #[must_use]
    pub fn used_count(&self) -> usize {
        self.used.len()
    }

    #[must_use]
    pub fn reserved_list(&self) -> Vec<IpAddr> {
        reserved_addresses(self.range, self.reserved)
    }

    /// Number of addresses neither used nor reserved.
    #[must_use]
    pub fn unused_count(&self) -> u128 {
        let used_outside_reserved = self
            .used
            .iter()
            .filter(|ip| !is_reserved(self.range, self.reserved, **ip))
            .count() as u128;
        address_count(self.range)
            .saturating_sub(reserved_count(self.range, self.reserved))
            .saturating_sub(used_outside_reserved)
    }

    /// Lazily yields unused addresses in ascending order.
    #[must_use]
    pub fn unused(&self) -> UnusedAddresses<'_> {
        let first = to_u128(self.range.network());
        let last = to_u128(self.range.broadcast());
        let start = first.saturating_add(u128::from(self.reserved));
        UnusedAddresses {
            next: (start <= last).then_some(start),
            last,
            v4: matches!(self.range, IpNet::V4(_)),
            used: &self.used,
        }
    }

    /// Unused addresses, capped at `limit` entries.
    #[must_use]
    pub fn unused_list(&self, limit: usize) -> Vec<IpAddr> {
        self.unused().take(limit).collect()
    }

    #[must_use]
    pub fn first_unused(&self) -> Option<IpAddr> {
        self.unused().next()
    }
}

/// Iterator over the unused addresses of a network.
///
/// Skips the reserved low block, the top address and every used address.
#[derive(Debug)]
pub struct UnusedAddresses<'a> {
    next: Option<u128>,
    last: u128,
    v4: bool,
    used: &'a BTreeSet<IpAddr>,
}

impl Iterator for UnusedAddresses<'_> {
    type Item = IpAddr;

    fn next(&mut self) -> Option<IpAddr> {
        loop {
            let current = self.next?;
            // The top address is reserved, so iteration ends before reaching it.
            if current >= self.last {
                self.next = None;
                return None;
            }
            self.next = Some(current + 1);
            let ip = from_u128(current, self.v4);
            if !self.used.contains(&ip) {
                return Some(ip);
            }
        }
    }
}
