// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the zone registry.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// DNS Name Constants
// ============================================================================

/// Maximum length of a single DNS label
pub const MAX_LABEL_LENGTH: usize = 63;

/// Maximum length of a fully qualified domain name (without trailing dot)
pub const MAX_NAME_LENGTH: usize = 253;

/// Suffix of IPv4 reverse zones
pub const IPV4_REVERSE_SUFFIX: &str = "in-addr.arpa";

/// Suffix of IPv6 reverse zones
pub const IPV6_REVERSE_SUFFIX: &str = "ip6.arpa";

/// Maximum length of a TXT record payload
pub const MAX_TXT_LENGTH: usize = 255;

// ============================================================================
// TTL Constants
// ============================================================================

/// Smallest non-zero TTL accepted on hosts and records
pub const MIN_TTL_SECS: u32 = 15;

/// Largest TTL accepted on hosts and records (2^31 - 1)
pub const MAX_TTL_SECS: u32 = 2_147_483_647;

// ============================================================================
// SOA Defaults
// ============================================================================

/// Default SOA refresh interval (3 hours)
pub const DEFAULT_SOA_REFRESH_SECS: u32 = 10_800;

/// Default SOA retry interval (1 hour)
pub const DEFAULT_SOA_RETRY_SECS: u32 = 3600;

/// Default SOA expire time (3 weeks)
pub const DEFAULT_SOA_EXPIRE_SECS: u32 = 1_814_400;

/// Default zone TTL (12 hours)
pub const DEFAULT_ZONE_TTL_SECS: u32 = 43_200;

/// Highest sequence counter a serial can carry within a single day
pub const MAX_SERIAL_SEQUENCE: u32 = 99;

/// Multiplier separating the date prefix from the sequence counter
pub const SERIAL_SEQUENCE_BASE: u64 = 100;

// ============================================================================
// Network Constants
// ============================================================================

/// Default number of low addresses withheld from allocation in a new network
pub const DEFAULT_NETWORK_RESERVED: u32 = 3;

/// Upper bound on the reserved count of a network; reserved addresses are listed in reports
pub const MAX_NETWORK_RESERVED: u32 = 4096;

/// Default upper bound on addresses returned by an unused-address listing
pub const DEFAULT_MAX_UNUSED_LIST: usize = 65_536;

// ============================================================================
// Audit Table Names
// ============================================================================

/// Audit table name for hosts
pub const TABLE_HOSTS: &str = "hosts";

/// Audit table name for IP addresses
pub const TABLE_IPADDRESSES: &str = "ipaddresses";

/// Audit table name for PTR overrides
pub const TABLE_PTR_OVERRIDES: &str = "ptr_overrides";

/// Audit table name for CNAME records
pub const TABLE_CNAMES: &str = "cnames";

/// Audit table name for TXT records
pub const TABLE_TXTS: &str = "txts";

/// Audit table name for NAPTR records
pub const TABLE_NAPTRS: &str = "naptrs";

/// Audit table name for SRV records
pub const TABLE_SRVS: &str = "srvs";

/// Audit table name for MX records
pub const TABLE_MXS: &str = "mxs";

/// Audit table name for HINFO presets
pub const TABLE_HINFO_PRESETS: &str = "hinfo_presets";

/// Audit table name for zones
pub const TABLE_ZONES: &str = "zones";

/// Audit table name for delegations
pub const TABLE_DELEGATIONS: &str = "delegations";

/// Audit table name for nameservers
pub const TABLE_NAMESERVERS: &str = "nameservers";

/// Audit table name for networks
pub const TABLE_NETWORKS: &str = "networks";

// ============================================================================
// Logging Constants
// ============================================================================

/// Environment variable selecting the log output format (`text` or `json`)
pub const LOG_FORMAT_ENV: &str = "RUST_LOG_FORMAT";

/// Environment variable pointing at a configuration file
pub const CONFIG_PATH_ENV: &str = "ZONEREG_CONFIG";

/// Environment variable pointing at the JSON state snapshot
pub const STATE_PATH_ENV: &str = "ZONEREG_STATE";

/// State snapshot used when none is given
pub const DEFAULT_STATE_PATH: &str = "zonereg-state.json";
