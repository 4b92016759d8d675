// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reverse DNS name handling.
//!
//! Converts between reverse zone names (`in-addr.arpa` / `ip6.arpa`) and the address
//! ranges they cover. Classless IPv4 zones in the RFC 2317 form
//! `<low>/<prefixlen>.<c>.<b>.<a>.in-addr.arpa` map to the sub-/24 range they name,
//! which lets the zone engine resolve reverse names by numeric containment.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

use crate::constants::{IPV4_REVERSE_SUFFIX, IPV6_REVERSE_SUFFIX};
use crate::registry_errors::ValidationError;

/// Returns true if `name` ends with one of the reverse zone suffixes.
///
/// The name is expected to be normalized (lowercase, no trailing dot).
#[must_use]
pub fn is_reverse_name(name: &str) -> bool {
    has_suffix(name, IPV4_REVERSE_SUFFIX) || has_suffix(name, IPV6_REVERSE_SUFFIX)
}

fn has_suffix(name: &str, suffix: &str) -> bool {
    name == suffix
        || name
            .strip_suffix(suffix)
            .is_some_and(|head| head.ends_with('.'))
}

fn invalid(name: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidReverseZoneName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Parses a reverse name into the address range it covers.
///
/// A full pointer name such as `1.0.0.10.in-addr.arpa` yields a host route (`/32`
/// or `/128`).
///
/// # Errors
///
/// Returns [`ValidationError::InvalidReverseZoneName`] when the name is not a well-formed
/// reverse name.
///
/// # Examples
///
/// ```
/// use zonereg::reverse::parse_reverse_name;
///
/// let net = parse_reverse_name("128/25.0.0.10.in-addr.arpa").unwrap();
/// assert_eq!(net.to_string(), "10.0.0.128/25");
/// ```
pub fn parse_reverse_name(name: &str) -> Result<IpNet, ValidationError> {
    if let Some(head) = strip_reverse_suffix(name, IPV4_REVERSE_SUFFIX) {
        return parse_ipv4_labels(name, head).map(IpNet::V4);
    }
    if let Some(head) = strip_reverse_suffix(name, IPV6_REVERSE_SUFFIX) {
        return parse_ipv6_labels(name, head).map(IpNet::V6);
    }
    Err(invalid(name, "name does not end in in-addr.arpa or ip6.arpa"))
}

fn strip_reverse_suffix<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
    if name == suffix {
        return Some("");
    }
    name.strip_suffix(suffix)?.strip_suffix('.')
}

fn parse_octet(name: &str, label: &str) -> Result<u8, ValidationError> {
    if label.is_empty() || label.len() > 3 || !label.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(name, format!("'{label}' is not a decimal octet")));
    }
    label
        .parse::<u8>()
        .map_err(|_| invalid(name, format!("octet '{label}' is larger than 255")))
}

fn parse_ipv4_labels(name: &str, head: &str) -> Result<Ipv4Net, ValidationError> {
    if head.is_empty() {
        return Err(invalid(name, "at least one octet is required"));
    }
    let labels: Vec<&str> = head.split('.').collect();
    if labels.len() == 5 && labels[1].contains('/') {
        return parse_classless_pointer(name, &labels);
    }
    if labels.len() > 4 {
        return Err(invalid(name, "at most four octets are allowed"));
    }

    let mut octets = [0u8; 4];
    let mut prefix_len = u8::try_from(labels.len() * 8).unwrap_or(32);

    for (position, label) in labels.iter().rev().enumerate() {
        if position == 3 {
            if let Some((low, len)) = label.split_once('/') {
                let low = parse_octet(name, low)?;
                let len: u8 = len
                    .parse()
                    .map_err(|_| invalid(name, format!("'{len}' is not a prefix length")))?;
                if !(25..=32).contains(&len) {
                    return Err(invalid(name, "classless prefix length must be within 25..=32"));
                }
                let block = 1u16 << (32 - len);
                if u16::from(low) % block != 0 {
                    return Err(invalid(
                        name,
                        format!("{low} is not aligned to a /{len} boundary"),
                    ));
                }
                octets[3] = low;
                prefix_len = len;
                continue;
            }
        }
        octets[position] = parse_octet(name, label)?;
    }

    Ipv4Net::new(Ipv4Addr::from(octets), prefix_len)
        .map_err(|_| invalid(name, "invalid prefix length"))
}

/// Parses a pointer name inside an RFC 2317 zone, e.g.
/// `130.128/25.0.0.10.in-addr.arpa`, into a host route.
fn parse_classless_pointer(name: &str, labels: &[&str]) -> Result<Ipv4Net, ValidationError> {
    let host = parse_octet(name, labels[0])?;
    let block = parse_ipv4_labels(name, &labels[1..].join("."))?;
    let [a, b, c, _] = block.network().octets();
    let address = Ipv4Addr::new(a, b, c, host);
    if !block.contains(&address) {
        return Err(invalid(name, format!("{address} is outside {block}")));
    }
    Ipv4Net::new(address, 32).map_err(|_| invalid(name, "invalid prefix length"))
}

fn parse_ipv6_labels(name: &str, head: &str) -> Result<Ipv6Net, ValidationError> {
    if head.is_empty() {
        return Err(invalid(name, "at least one nibble is required"));
    }
    let labels: Vec<&str> = head.split('.').collect();
    if labels.len() > 32 {
        return Err(invalid(name, "at most 32 nibbles are allowed"));
    }

    let mut value: u128 = 0;
    for label in labels.iter().rev() {
        let mut chars = label.chars();
        let nibble = match (chars.next(), chars.next()) {
            (Some(c), None) => c
                .to_digit(16)
                .ok_or_else(|| invalid(name, format!("'{label}' is not a hex nibble")))?,
            _ => return Err(invalid(name, format!("'{label}' is not a hex nibble"))),
        };
        value = (value << 4) | u128::from(nibble);
    }

    let nibbles = labels.len();
    let addr = value << ((32 - nibbles) * 4);
    let prefix_len = u8::try_from(nibbles * 4).unwrap_or(128);

    Ipv6Net::new(Ipv6Addr::from(addr), prefix_len)
        .map_err(|_| invalid(name, "invalid prefix length"))
}

/// Pointer name of an address as published in the reverse zone `zone`.
///
/// Inside an RFC 2317 zone such as `128/25.0.0.10.in-addr.arpa` the record is named
/// under the zone (`130.128/25.0.0.10.in-addr.arpa`); everywhere else this is
/// [`pointer_name`].
#[must_use]
pub fn pointer_name_in(ip: IpAddr, zone: &str) -> String {
    match ip {
        IpAddr::V4(v4) if zone.contains('/') => format!("{}.{zone}", v4.octets()[3]),
        _ => pointer_name(ip),
    }
}

/// Returns the fully qualified pointer name for an address.
///
/// # Examples
///
/// ```
/// use zonereg::reverse::pointer_name;
///
/// assert_eq!(pointer_name("10.0.0.1".parse().unwrap()), "1.0.0.10.in-addr.arpa");
/// ```
#[must_use]
pub fn pointer_name(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, d] = v4.octets();
            format!("{d}.{c}.{b}.{a}.{IPV4_REVERSE_SUFFIX}")
        }
        IpAddr::V6(v6) => {
            let bits = u128::from(v6);
            let mut labels: Vec<String> = (0..32)
                .map(|i| format!("{:x}", (bits >> (i * 4)) & 0xf))
                .collect();
            labels.push(IPV6_REVERSE_SUFFIX.to_string());
            labels.join(".")
        }
    }
}
