// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the zone registry.
//!
//! This module provides the error taxonomy shared by every engine in the crate:
//! - [`ValidationError`] - malformed field values, each with a stable reason code
//! - [`RegistryError`] - the composite error returned by every registry operation
//! - [`ErrorKind`] - the coarse classification consumed by transport adapters
//!
//! A registry operation that returns an error has not modified any state: no zone
//! was marked dirty, no PTR override was touched and nothing was written to the
//! audit sink.

use ipnet::IpNet;
use thiserror::Error;

use crate::serial::SerialError;

/// Result alias used by registry operations.
pub type Result<T, E = RegistryError> = std::result::Result<T, E>;

/// Field-level validation failures.
///
/// Every variant maps to a machine-checkable reason code via [`ValidationError::reason`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Hostname does not follow the DNS label grammar
    #[error("Invalid hostname '{name}': {reason}")]
    InvalidHostname {
        /// The rejected name
        name: String,
        /// Which rule was broken
        reason: String,
    },

    /// Hostname consists of a single label and is not a known zone apex
    #[error("Hostname '{name}' must contain at least two labels")]
    SingleLabel {
        /// The rejected name
        name: String,
    },

    /// Forward zone name is malformed or uses a reverse suffix
    #[error("Invalid zone name '{name}': {reason}")]
    InvalidZoneName {
        /// The rejected zone name
        name: String,
        /// Which rule was broken
        reason: String,
    },

    /// Reverse zone name is malformed
    #[error("Invalid reverse zone name '{name}': {reason}")]
    InvalidReverseZoneName {
        /// The rejected zone name
        name: String,
        /// Which rule was broken
        reason: String,
    },

    /// LOC string does not follow RFC 1876
    #[error("Invalid LOC '{value}': {reason}")]
    InvalidLoc {
        /// The rejected LOC string
        value: String,
        /// Which rule was broken
        reason: String,
    },

    /// MAC address is not six lowercase hex octets separated by colons
    #[error("Invalid MAC address '{value}'")]
    InvalidMacAddress {
        /// The rejected MAC address
        value: String,
    },

    /// NAPTR flag is not one of `a`, `s`, `u`, `p`
    #[error("Invalid NAPTR flag '{value}'")]
    InvalidNaptrFlag {
        /// The rejected flag
        value: String,
    },

    /// SRV name is not of the form `_service._proto.domain`
    #[error("Invalid SRV service name '{value}'")]
    InvalidSrvService {
        /// The rejected service name
        value: String,
    },

    /// Value does not fit in an unsigned 16-bit integer
    #[error("Field '{field}' must be within 0..=65535, got {value}")]
    OutOfRangeU16 {
        /// Field being validated
        field: &'static str,
        /// Offending value
        value: i64,
    },

    /// SOA serial is not of the form `YYYYMMDDnn`
    #[error("Invalid serial number {value}: {reason}")]
    InvalidSerial {
        /// The rejected serial
        value: u64,
        /// Which rule was broken
        reason: String,
    },

    /// TTL is neither 0 nor within the accepted range
    #[error("Invalid TTL {value}: must be 0 or within 15..=2147483647")]
    InvalidTtl {
        /// The rejected TTL
        value: i64,
    },

    /// Contact or SOA e-mail is malformed
    #[error("Invalid e-mail address '{value}'")]
    InvalidEmail {
        /// The rejected address
        value: String,
    },

    /// TXT payload is empty or too long
    #[error("Invalid TXT data: {reason}")]
    InvalidTxt {
        /// Which rule was broken
        reason: String,
    },

    /// Free-form text field is empty where a value is required
    #[error("Field '{field}' must not be empty")]
    EmptyField {
        /// Field being validated
        field: &'static str,
    },

    /// Network range is malformed or not in canonical form
    #[error("Invalid network '{value}': {reason}")]
    InvalidNetwork {
        /// The rejected range
        value: String,
        /// Which rule was broken
        reason: String,
    },

    /// CNAME name clashes with an existing host name
    #[error("Name '{name}' is already used by a host")]
    HostNameConflict {
        /// The clashing name
        name: String,
    },

    /// Name does not fall inside any known zone
    #[error("Name '{name}' is not inside any known zone")]
    NoZone {
        /// The orphaned name
        name: String,
    },

    /// Delegation name is not a strict sub-domain of its parent zone
    #[error("Delegation '{name}' is not a sub-domain of zone '{zone}'")]
    NotSubdomain {
        /// The delegation name
        name: String,
        /// The parent zone
        zone: String,
    },

    /// Reverse delegation range is not contained in its parent zone's range
    #[error("Delegation '{name}' is not contained in reverse zone '{zone}'")]
    NotContained {
        /// The delegation name
        name: String,
        /// The parent zone
        zone: String,
    },

    /// Reverse delegation uses a different address family than its parent
    #[error("Delegation '{name}' uses a different address family than zone '{zone}'")]
    AddressFamilyMismatch {
        /// The delegation name
        name: String,
        /// The parent zone
        zone: String,
    },

    /// Nameserver list is empty
    #[error("At least one nameserver is required")]
    EmptyNameserverList,

    /// Nameserver list names the same server twice
    #[error("Nameserver '{name}' is listed more than once")]
    DuplicateNameserver {
        /// The repeated nameserver
        name: String,
    },
}

impl ValidationError {
    /// Returns the machine-checkable reason code for this validation failure.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidHostname { .. } => "InvalidHostname",
            Self::SingleLabel { .. } => "SingleLabel",
            Self::InvalidZoneName { .. } => "InvalidZoneName",
            Self::InvalidReverseZoneName { .. } => "InvalidReverseZoneName",
            Self::InvalidLoc { .. } => "InvalidLoc",
            Self::InvalidMacAddress { .. } => "InvalidMacAddress",
            Self::InvalidNaptrFlag { .. } => "InvalidNaptrFlag",
            Self::InvalidSrvService { .. } => "InvalidSrvService",
            Self::OutOfRangeU16 { .. } => "OutOfRangeU16",
            Self::InvalidSerial { .. } => "InvalidSerial",
            Self::InvalidTtl { .. } => "InvalidTtl",
            Self::InvalidEmail { .. } => "InvalidEmail",
            Self::InvalidTxt { .. } => "InvalidTxt",
            Self::EmptyField { .. } => "EmptyField",
            Self::InvalidNetwork { .. } => "InvalidNetwork",
            Self::HostNameConflict { .. } => "HostNameConflict",
            Self::NoZone { .. } => "NoZone",
            Self::NotSubdomain { .. } => "NotSubdomain",
            Self::NotContained { .. } => "NotContained",
            Self::AddressFamilyMismatch { .. } => "AddressFamilyMismatch",
            Self::EmptyNameserverList => "EmptyNameserverList",
            Self::DuplicateNameserver { .. } => "DuplicateNameserver",
        }
    }
}

/// Coarse error classification handed to transport adapters.
///
/// The registry never produces protocol status codes; adapters map these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Overlap,
    NetworkInUse,
    NotFound,
    Forbidden,
    SerialOverflow,
}

impl ErrorKind {
    /// Label used in logs and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::Overlap => "overlap",
            Self::NetworkInUse => "network_in_use",
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::SerialOverflow => "serial_overflow",
        }
    }
}

/// Composite error type returned by every registry operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A field failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A uniqueness rule would be broken
    ///
    /// Returned for duplicate names, duplicate (host, ip) pairs, MAC addresses already
    /// used in the same broadcast domain and similar unique-constraint violations.
    #[error("{entity} '{key}' conflicts with existing data: {reason}")]
    Conflict {
        /// Kind of entity being written
        entity: &'static str,
        /// Natural key of the entity
        key: String,
        /// What it conflicts with
        reason: String,
    },

    /// A network range intersects an existing network
    #[error("Network {candidate} overlaps existing network {existing}")]
    Overlap {
        /// The rejected range
        candidate: IpNet,
        /// The stored range it intersects
        existing: IpNet,
    },

    /// A network cannot be deleted while addresses inside it are in use
    #[error("Network {network} still has {used} address(es) in use")]
    NetworkInUse {
        /// The network that was to be deleted
        network: IpNet,
        /// Number of used addresses found
        used: usize,
    },

    /// Referenced entity does not exist
    #[error("{entity} '{key}' not found")]
    NotFound {
        /// Kind of entity looked up
        entity: &'static str,
        /// Key used for the lookup
        key: String,
    },

    /// Mutation of a protected field or protected entity
    #[error("Operation on {entity} '{key}' is forbidden: {reason}")]
    Forbidden {
        /// Kind of entity being written
        entity: &'static str,
        /// Natural key of the entity
        key: String,
        /// Why the mutation is refused
        reason: String,
    },

    /// Zone serial cannot be advanced any further today
    #[error(transparent)]
    SerialOverflow(#[from] SerialError),
}

impl RegistryError {
    pub(crate) fn conflict(entity: &'static str, key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Conflict {
            entity,
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub(crate) fn forbidden(entity: &'static str, key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Forbidden {
            entity,
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Returns the coarse classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Overlap { .. } => ErrorKind::Overlap,
            Self::NetworkInUse { .. } => ErrorKind::NetworkInUse,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::SerialOverflow(_) => ErrorKind::SerialOverflow,
        }
    }

    /// Returns true if retrying the same operation later may succeed.
    ///
    /// Only serial exhaustion is time-dependent: the counter resets on the next day.
    /// Every other error is permanent for the given input and state.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SerialOverflow(SerialError::Overflow { .. }))
    }

    /// Returns a stable CamelCase reason code for this error.
    ///
    /// Validation errors report their specific reason; every other kind reports the
    /// kind itself.
    #[must_use]
    pub fn status_reason(&self) -> &'static str {
        match self {
            Self::Validation(err) => err.reason(),
            Self::Conflict { .. } => "Conflict",
            Self::Overlap { .. } => "NetworkOverlap",
            Self::NetworkInUse { .. } => "NetworkInUse",
            Self::NotFound { .. } => "NotFound",
            Self::Forbidden { .. } => "Forbidden",
            Self::SerialOverflow(SerialError::Overflow { .. }) => "SerialOverflow",
            Self::SerialOverflow(SerialError::DateOutOfRange { .. }) => "SerialDateOutOfRange",
        }
    }
}
