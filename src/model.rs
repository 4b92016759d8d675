// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Registry data model.
//!
//! Stored entities, their identifiers and the request types used to create and
//! update them. Entities reference each other by id; names are only used for
//! lookups and uniqueness checks.
//!
//! # Example
//!
//! ```rust
//! use zonereg::model::NewHost;
//!
//! let host = NewHost {
//!     name: "www.example.org".to_string(),
//!     contact: "hostmaster@example.org".to_string(),
//!     ttl: Some(3600),
//!     ip: Some("10.0.0.10".parse().unwrap()),
//!     ..Default::default()
//! };
//! assert!(host.loc.is_none());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }
    };
}

entity_id!(
    /// Identifier of a [`Host`]
    HostId
);
entity_id!(
    /// Identifier of an [`Ipaddress`]
    IpaddressId
);
entity_id!(
    /// Identifier of a [`PtrOverride`]
    PtrOverrideId
);
entity_id!(
    /// Identifier of a [`Cname`]
    CnameId
);
entity_id!(
    /// Identifier of a [`Txt`]
    TxtId
);
entity_id!(
    /// Identifier of a [`Naptr`]
    NaptrId
);
entity_id!(
    /// Identifier of a [`Srv`]
    SrvId
);
entity_id!(
    /// Identifier of an [`Mx`]
    MxId
);
entity_id!(
    /// Identifier of a [`HinfoPreset`]
    HinfoPresetId
);
entity_id!(
    /// Identifier of a [`Zone`]
    ZoneId
);
entity_id!(
    /// Identifier of a [`Delegation`]
    DelegationId
);
entity_id!(
    /// Identifier of a [`NameServer`]
    NameServerId
);
entity_id!(
    /// Identifier of a [`Network`]
    NetworkId
);

// ============================================================================
// Hosts and addresses
// ============================================================================

/// A named machine with a contact and optional metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    pub id: HostId,
    /// Fully qualified name, lowercase, without trailing dot
    pub name: String,
    /// Contact e-mail address
    pub contact: String,
    pub ttl: Option<u32>,
    /// RFC 1876 LOC string
    pub loc: Option<String>,
    pub comment: Option<String>,
    pub hinfo: Option<HinfoPresetId>,
    /// Most specific zone containing the name, maintained by the registry
    pub zone: Option<ZoneId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An address held by a host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ipaddress {
    pub id: IpaddressId,
    pub host: HostId,
    pub ip: IpAddr,
    /// Lowercase colon-separated MAC address
    pub mac: Option<String>,
    /// Monotonic sequence assigned when the row acquired its current address.
    ///
    /// The owner with the lowest value is the earliest owner of the address.
    pub acquired: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How a PTR override came to exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Created by the PTR engine when an address gained a second owner
    Auto,
    /// Created or claimed by an operator
    Explicit,
}

/// Authoritative reverse mapping for an address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PtrOverride {
    pub id: PtrOverrideId,
    pub host: HostId,
    pub ip: IpAddr,
    pub provenance: Provenance,
    pub created_at: DateTime<Utc>,
}

impl PtrOverride {
    #[must_use]
    pub fn is_auto(&self) -> bool {
        self.provenance == Provenance::Auto
    }
}

// ============================================================================
// Records
// ============================================================================

/// Alias name pointing at a host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cname {
    pub id: CnameId,
    pub name: String,
    pub host: HostId,
    pub ttl: Option<u32>,
    pub zone: Option<ZoneId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Txt {
    pub id: TxtId,
    pub host: HostId,
    pub txt: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Naptr {
    pub id: NaptrId,
    pub host: HostId,
    pub preference: u16,
    pub order: u16,
    /// One of `a`, `s`, `u`, `p`, or empty
    pub flag: String,
    pub service: String,
    pub regex: String,
    pub replacement: String,
}

/// Service record. Relates to hosts by target name only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Srv {
    pub id: SrvId,
    /// Owner name in the form `_service._proto.domain`
    pub name: String,
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub ttl: Option<u32>,
    pub target: String,
    pub zone: Option<ZoneId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mx {
    pub id: MxId,
    pub host: HostId,
    pub priority: u16,
    /// Mail exchange host name
    pub mx: String,
}

/// Reusable HINFO CPU/OS pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HinfoPreset {
    pub id: HinfoPresetId,
    pub cpu: String,
    pub os: String,
}

// ============================================================================
// Zones
// ============================================================================

/// Forward or reverse flavour of a zone or delegation.
///
/// Reverse variants carry the address range the name covers, so RFC 2317 classless
/// names take part in numeric containment checks like any other range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ZoneKind {
    Forward,
    Reverse { network: IpNet },
}

impl ZoneKind {
    #[must_use]
    pub fn is_reverse(&self) -> bool {
        matches!(self, Self::Reverse { .. })
    }

    /// Address range of a reverse zone.
    #[must_use]
    pub fn network(&self) -> Option<IpNet> {
        match self {
            Self::Forward => None,
            Self::Reverse { network } => Some(*network),
        }
    }
}

/// An authoritative zone with its SOA fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    #[serde(flatten)]
    pub kind: ZoneKind,
    /// Primary nameserver; always a member of `nameservers`
    pub primary_ns: String,
    /// SOA contact address
    pub email: String,
    pub serialno: u32,
    pub serialno_updated_at: DateTime<Utc>,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub ttl: u32,
    pub nameservers: Vec<NameServerId>,
    /// Set when anything rendered into the zone changed since the last publish
    pub updated: bool,
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A sub-name of a zone handed to external nameservers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delegation {
    pub id: DelegationId,
    /// Parent zone
    pub zone: ZoneId,
    pub name: String,
    #[serde(flatten)]
    pub kind: ZoneKind,
    pub nameservers: Vec<NameServerId>,
    pub comment: Option<String>,
}

/// Nameserver shared by zones and delegations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameServer {
    pub id: NameServerId,
    pub name: String,
    pub ttl: Option<u32>,
}

// ============================================================================
// Networks
// ============================================================================

/// An address range with allocation metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub id: NetworkId,
    /// Canonical CIDR range
    pub network: IpNet,
    pub vlan: Option<u16>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    /// Blocks address and PTR override mutations inside the range
    pub frozen: bool,
    /// Number of lowest addresses withheld from allocation
    pub reserved: u32,
}

// ============================================================================
// Snapshot
// ============================================================================

/// Complete persisted state of a registry.
///
/// Derived indexes are not part of the snapshot; they are rebuilt on load.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistryState {
    /// Highest id handed out so far; ids are unique across every table
    pub last_id: u64,
    /// Highest [`Ipaddress::acquired`] sequence handed out so far
    pub last_acquired: u64,
    pub hosts: BTreeMap<HostId, Host>,
    pub ipaddresses: BTreeMap<IpaddressId, Ipaddress>,
    pub ptr_overrides: BTreeMap<PtrOverrideId, PtrOverride>,
    pub cnames: BTreeMap<CnameId, Cname>,
    pub txts: BTreeMap<TxtId, Txt>,
    pub naptrs: BTreeMap<NaptrId, Naptr>,
    pub srvs: BTreeMap<SrvId, Srv>,
    pub mxs: BTreeMap<MxId, Mx>,
    pub hinfo_presets: BTreeMap<HinfoPresetId, HinfoPreset>,
    pub zones: BTreeMap<ZoneId, Zone>,
    pub delegations: BTreeMap<DelegationId, Delegation>,
    pub nameservers: BTreeMap<NameServerId, NameServer>,
    pub networks: BTreeMap<NetworkId, Network>,
}

// ============================================================================
// Requests
// ============================================================================

/// Request to create a host, optionally with its first address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewHost {
    pub name: String,
    pub contact: String,
    pub ttl: Option<i64>,
    pub loc: Option<String>,
    pub comment: Option<String>,
    pub hinfo: Option<HinfoPresetId>,
    /// Address assigned in the same transaction
    pub ip: Option<IpAddr>,
}

/// Partial host update. `None` leaves a field untouched; `Some(None)` clears it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HostUpdate {
    pub name: Option<String>,
    pub contact: Option<String>,
    pub ttl: Option<Option<i64>>,
    pub loc: Option<Option<String>>,
    pub comment: Option<Option<String>>,
    pub hinfo: Option<Option<HinfoPresetId>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIpaddress {
    pub host: HostId,
    pub ip: IpAddr,
    #[serde(default)]
    pub mac: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IpaddressUpdate {
    pub ip: Option<IpAddr>,
    pub mac: Option<Option<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCname {
    pub name: String,
    pub host: HostId,
    #[serde(default)]
    pub ttl: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CnameUpdate {
    pub name: Option<String>,
    pub host: Option<HostId>,
    pub ttl: Option<Option<i64>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNaptr {
    pub host: HostId,
    pub preference: i64,
    pub order: i64,
    pub flag: String,
    pub service: String,
    pub regex: String,
    pub replacement: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSrv {
    pub name: String,
    pub priority: i64,
    pub weight: i64,
    pub port: i64,
    #[serde(default)]
    pub ttl: Option<i64>,
    pub target: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMx {
    pub host: HostId,
    pub priority: i64,
    pub mx: String,
}

/// Request to create a zone. The kind is detected from the name suffix.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewZone {
    pub name: String,
    pub email: String,
    /// Ordered nameserver list; the first entry becomes primary unless `primary_ns` is set
    pub nameservers: Vec<String>,
    pub primary_ns: Option<String>,
    pub refresh: Option<u32>,
    pub retry: Option<u32>,
    pub expire: Option<u32>,
    pub ttl: Option<u32>,
}

/// Partial SOA update.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ZoneUpdate {
    /// Zone names are immutable; any different value is rejected
    pub name: Option<String>,
    pub primary_ns: Option<String>,
    pub email: Option<String>,
    pub serialno: Option<u64>,
    pub refresh: Option<u32>,
    pub retry: Option<u32>,
    pub expire: Option<u32>,
    pub ttl: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewDelegation {
    pub name: String,
    pub nameservers: Vec<String>,
    pub comment: Option<String>,
}

/// Request to create a network. `reserved` falls back to the configured default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNetwork {
    pub network: IpNet,
    #[serde(default)]
    pub vlan: Option<u16>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub frozen: bool,
    #[serde(default)]
    pub reserved: Option<u32>,
}

impl NewNetwork {
    /// Creates a request for `network` with every optional field unset.
    #[must_use]
    pub fn new(network: IpNet) -> Self {
        Self {
            network,
            vlan: None,
            category: None,
            location: None,
            description: None,
            frozen: false,
            reserved: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NetworkUpdate {
    pub network: Option<IpNet>,
    pub vlan: Option<Option<u16>>,
    pub category: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub frozen: Option<bool>,
    pub reserved: Option<u32>,
}
