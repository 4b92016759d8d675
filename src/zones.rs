// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone membership and dirty tracking.
//!
//! [`ZoneIndex`] answers "which zone owns this name" without scanning every zone:
//!
//! - forward names walk their labels from longest to shortest through a suffix map
//! - reverse names and addresses are resolved by numeric containment, trying each
//!   stored prefix length from most to least specific
//!
//! The free functions at the bottom operate on the SOA fields shared by forward and
//! reverse zones.

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;

use chrono::{DateTime, NaiveDate, Utc};
use ipnet::IpNet;
use tracing::debug;

use crate::model::{Zone, ZoneId, ZoneKind};
use crate::reverse::{is_reverse_name, parse_reverse_name};
use crate::serial::{next_serial, SerialError};

/// Lookup structure for zone resolution.
#[derive(Debug, Default, Clone)]
pub struct ZoneIndex {
    forward: HashMap<String, ZoneId>,
    reverse: BTreeMap<u8, HashMap<IpNet, ZoneId>>,
}

impl ZoneIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, kind: ZoneKind, id: ZoneId) {
        match kind {
            ZoneKind::Forward => {
                self.forward.insert(name.to_string(), id);
            }
            ZoneKind::Reverse { network } => {
                self.reverse
                    .entry(network.prefix_len())
                    .or_default()
                    .insert(network, id);
            }
        }
    }

    pub fn remove(&mut self, name: &str, kind: ZoneKind) {
        match kind {
            ZoneKind::Forward => {
                self.forward.remove(name);
            }
            ZoneKind::Reverse { network } => {
                if let Some(zones) = self.reverse.get_mut(&network.prefix_len()) {
                    zones.remove(&network);
                    if zones.is_empty() {
                        self.reverse.remove(&network.prefix_len());
                    }
                }
            }
        }
    }

    /// Returns the most specific zone containing `name`, if any.
    ///
    /// The name must be normalized. A name equal to a zone resolves to that zone.
    ///
    /// # Examples
    ///
    /// ```
    /// use zonereg::model::{ZoneId, ZoneKind};
    /// use zonereg::zones::ZoneIndex;
    ///
    /// let mut index = ZoneIndex::new();
    /// index.insert("example.org", ZoneKind::Forward, ZoneId(1));
    /// assert_eq!(index.resolve_name("www.example.org"), Some(ZoneId(1)));
    /// assert_eq!(index.resolve_name("www.example.net"), None);
    /// ```
    #[must_use]
    pub fn resolve_name(&self, name: &str) -> Option<ZoneId> {
        if is_reverse_name(name) {
            return parse_reverse_name(name)
                .ok()
                .and_then(|range| self.resolve_range(range));
        }

        let mut candidate = name;
        loop {
            if let Some(id) = self.forward.get(candidate) {
                return Some(*id);
            }
            candidate = candidate.split_once('.')?.1;
        }
    }

    /// Returns the most specific reverse zone containing `ip`.
    #[must_use]
    pub fn resolve_ip(&self, ip: IpAddr) -> Option<ZoneId> {
        self.resolve_range(IpNet::from(ip))
    }

    /// Returns the most specific reverse zone whose range contains `range`.
    #[must_use]
    pub fn resolve_range(&self, range: IpNet) -> Option<ZoneId> {
        self.reverse
            .range(..=range.prefix_len())
            .rev()
            .find_map(|(len, zones)| {
                let key = IpNet::new(range.network(), *len).ok()?.trunc();
                zones.get(&key).copied()
            })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.forward.len() + self.reverse.values().map(HashMap::len).sum::<usize>()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Marks a zone as changed since its last publish.
pub fn mark_dirty(zone: &mut Zone, now: DateTime<Utc>) {
    if !zone.updated {
        debug!(zone = %zone.name, "zone marked dirty");
    }
    zone.updated = true;
    zone.updated_at = now;
}

/// Advances the serial of a dirty zone and clears its dirty flag.
///
/// Returns `Ok(false)` without touching the zone when it is clean.
///
/// # Errors
///
/// Returns the [`SerialError`] from [`next_serial`]; the zone is left unchanged.
pub fn advance_serial(
    zone: &mut Zone,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<bool, SerialError> {
    if !zone.updated {
        return Ok(false);
    }
    let serial = next_serial(today, Some(zone.serialno))?;
    debug!(zone = %zone.name, from = zone.serialno, to = serial, "advancing zone serial");
    zone.serialno = serial;
    zone.serialno_updated_at = now;
    zone.updated = false;
    Ok(true)
}

/// Returns true if `name` is `zone` or a name below it.
#[must_use]
pub fn is_within(name: &str, zone: &str) -> bool {
    name == zone
        || name
            .strip_suffix(zone)
            .is_some_and(|head| head.ends_with('.'))
}
