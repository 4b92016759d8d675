// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Field validators.
//!
//! Every validator is a pure function: it either returns the normalized value or a
//! [`ValidationError`] carrying a machine-checkable reason code. None of them consult
//! registry state; rules that depend on stored data (a single-label hostname naming a
//! known zone apex, cross-record name clashes) are enforced by the registry itself.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::constants::{MAX_LABEL_LENGTH, MAX_NAME_LENGTH, MAX_TTL_SECS, MAX_TXT_LENGTH, MIN_TTL_SECS};
use crate::registry_errors::ValidationError;
use crate::reverse::{is_reverse_name, parse_reverse_name};

/// Lowercases a DNS name and strips surrounding whitespace and the trailing dot.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let trimmed = name.trim();
    trimmed
        .strip_suffix('.')
        .unwrap_or(trimmed)
        .to_ascii_lowercase()
}

fn hostname_error(name: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidHostname {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Checks the label grammar of a normalized name without any label-count rule.
fn check_labels(name: &str) -> Result<usize, ValidationError> {
    if name.is_empty() {
        return Err(hostname_error(name, "name is empty"));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(hostname_error(
            name,
            format!("name is longer than {MAX_NAME_LENGTH} characters"),
        ));
    }

    let mut count = 0;
    for label in name.split('.') {
        count += 1;
        if label.is_empty() {
            return Err(hostname_error(name, "empty label"));
        }
        if label.len() > MAX_LABEL_LENGTH {
            return Err(hostname_error(
                name,
                format!("label '{label}' is longer than {MAX_LABEL_LENGTH} characters"),
            ));
        }
        if let Some(bad) = label
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
        {
            return Err(hostname_error(
                name,
                format!("label '{label}' contains invalid character '{bad}'"),
            ));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(hostname_error(
                name,
                format!("label '{label}' starts or ends with a hyphen"),
            ));
        }
    }
    Ok(count)
}

/// Validates a DNS name that may consist of a single label.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidHostname`] if any label breaks the grammar.
pub fn validate_dns_name(name: &str) -> Result<String, ValidationError> {
    let normalized = normalize_name(name);
    check_labels(&normalized)?;
    Ok(normalized)
}

/// Validates a host name.
///
/// Labels are 1-63 characters of `[a-z0-9-]` without a leading or trailing hyphen, the
/// whole name is at most 253 characters and at least two labels are required.
///
/// # Arguments
///
/// * `name` - The name to validate; case and a trailing dot are normalized away
///
/// # Errors
///
/// * [`ValidationError::InvalidHostname`] for grammar violations
/// * [`ValidationError::SingleLabel`] for a single-label name
///
/// # Examples
///
/// ```
/// use zonereg::validators::validate_hostname;
///
/// assert_eq!(validate_hostname("WWW.Example.org.").unwrap(), "www.example.org");
/// assert!(validate_hostname("localhost").is_err());
/// ```
pub fn validate_hostname(name: &str) -> Result<String, ValidationError> {
    let normalized = normalize_name(name);
    if check_labels(&normalized)? < 2 {
        return Err(ValidationError::SingleLabel { name: normalized });
    }
    Ok(normalized)
}

/// Validates a forward zone name.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidZoneName`] for grammar violations or when the name
/// ends in a reverse suffix.
pub fn validate_zone_name(name: &str) -> Result<String, ValidationError> {
    let normalized = normalize_name(name);
    if is_reverse_name(&normalized) {
        return Err(ValidationError::InvalidZoneName {
            name: normalized,
            reason: "name is a reverse zone".to_string(),
        });
    }
    check_labels(&normalized).map_err(|err| ValidationError::InvalidZoneName {
        name: normalized.clone(),
        reason: match err {
            ValidationError::InvalidHostname { reason, .. } => reason,
            other => other.to_string(),
        },
    })?;
    Ok(normalized)
}

/// Validates a reverse zone name and returns it normalized.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidReverseZoneName`] if the name does not parse.
pub fn validate_reverse_zone_name(name: &str) -> Result<String, ValidationError> {
    let normalized = normalize_name(name);
    parse_reverse_name(&normalized)?;
    Ok(normalized)
}

// ============================================================================
// LOC (RFC 1876)
// ============================================================================

/// Components of a parsed LOC string. Sizes and altitude are in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Latitude in thousandths of an arc second, positive north
    pub latitude: i64,
    /// Longitude in thousandths of an arc second, positive east
    pub longitude: i64,
    pub altitude_cm: i64,
    pub size_cm: u64,
    pub horizontal_precision_cm: u64,
    pub vertical_precision_cm: u64,
}

const LOC_MAX_ALTITUDE_CM: i64 = 4_284_967_295;
const LOC_MIN_ALTITUDE_CM: i64 = -10_000_000;
const LOC_MAX_PRECISION_CM: u64 = 9_000_000_000;

fn loc_error(value: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidLoc {
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Parses a decimal with at most `scale` fraction digits into an integer scaled by
/// `10^scale`.
fn parse_scaled(token: &str, scale: u32) -> Option<i64> {
    let (negative, digits) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() || fraction.len() > scale as usize {
        return None;
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.ends_with('.') {
        return None;
    }
    let whole: i64 = whole.parse().ok()?;
    let mut frac: i64 = if fraction.is_empty() { 0 } else { fraction.parse().ok()? };
    for _ in fraction.len()..scale as usize {
        frac *= 10;
    }
    let value = whole.checked_mul(10_i64.pow(scale))?.checked_add(frac)?;
    Some(if negative { -value } else { value })
}

fn parse_meters(token: &str) -> Option<i64> {
    parse_scaled(token.strip_suffix('m').unwrap_or(token), 2)
}

/// Parses one coordinate `d [m [s]] H` and returns thousandths of an arc second.
fn parse_coordinate<'a>(
    value: &str,
    tokens: &mut impl Iterator<Item = &'a str>,
    max_degrees: i64,
    hemispheres: [char; 2],
) -> Result<i64, ValidationError> {
    let mut parts: Vec<&str> = Vec::with_capacity(3);
    let hemisphere = loop {
        let token = tokens
            .next()
            .ok_or_else(|| loc_error(value, "coordinate is incomplete"))?;
        let upper = token.to_ascii_uppercase();
        if upper.len() == 1 && hemispheres.iter().any(|h| upper.starts_with(*h)) {
            break upper;
        }
        if parts.len() == 3 {
            return Err(loc_error(
                value,
                format!("expected one of {}/{}", hemispheres[0], hemispheres[1]),
            ));
        }
        parts.push(token);
    };
    if parts.is_empty() {
        return Err(loc_error(value, "coordinate has no degrees"));
    }

    let degrees = parts[0]
        .parse::<u32>()
        .ok()
        .filter(|d| i64::from(*d) <= max_degrees)
        .ok_or_else(|| loc_error(value, format!("degrees '{}' out of range", parts[0])))?;
    let minutes = match parts.get(1) {
        Some(m) => m
            .parse::<u32>()
            .ok()
            .filter(|m| *m < 60)
            .ok_or_else(|| loc_error(value, format!("minutes '{m}' out of range")))?,
        None => 0,
    };
    let seconds = match parts.get(2) {
        Some(s) => parse_scaled(s, 3)
            .filter(|s| (0..60_000).contains(s))
            .ok_or_else(|| loc_error(value, format!("seconds '{s}' out of range")))?,
        None => 0,
    };

    let total = (i64::from(degrees) * 3600 + i64::from(minutes) * 60) * 1000 + seconds;
    if total > max_degrees * 3600 * 1000 {
        return Err(loc_error(value, "coordinate exceeds its maximum"));
    }
    Ok(if hemisphere.starts_with(hemispheres[1]) {
        -total
    } else {
        total
    })
}

/// Parses an RFC 1876 LOC string.
///
/// Grammar: `d1 [m1 [s1]] {N|S} d2 [m2 [s2]] {E|W} alt[m] [siz[m] [hp[m] [vp[m]]]]`.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidLoc`] describing the first violation.
pub fn parse_loc(value: &str) -> Result<Location, ValidationError> {
    let mut tokens = value.split_whitespace();

    let latitude = parse_coordinate(value, &mut tokens, 90, ['N', 'S'])?;
    let longitude = parse_coordinate(value, &mut tokens, 180, ['E', 'W'])?;

    let altitude_cm = tokens
        .next()
        .ok_or_else(|| loc_error(value, "altitude is required"))
        .and_then(|t| parse_meters(t).ok_or_else(|| loc_error(value, format!("invalid altitude '{t}'"))))?;
    if !(LOC_MIN_ALTITUDE_CM..=LOC_MAX_ALTITUDE_CM).contains(&altitude_cm) {
        return Err(loc_error(value, "altitude out of range"));
    }

    // Defaults from RFC 1876: 1m size, 10000m horizontal, 10m vertical precision.
    let mut precisions = [100_u64, 1_000_000, 1000];
    for (index, slot) in precisions.iter_mut().enumerate() {
        let Some(token) = tokens.next() else { break };
        let parsed = parse_meters(token)
            .filter(|v| *v >= 0)
            .and_then(|v| u64::try_from(v).ok())
            .filter(|v| *v <= LOC_MAX_PRECISION_CM)
            .ok_or_else(|| loc_error(value, format!("invalid precision field {} '{token}'", index + 1)))?;
        *slot = parsed;
    }

    if let Some(extra) = tokens.next() {
        return Err(loc_error(value, format!("unexpected trailing token '{extra}'")));
    }

    Ok(Location {
        latitude,
        longitude,
        altitude_cm,
        size_cm: precisions[0],
        horizontal_precision_cm: precisions[1],
        vertical_precision_cm: precisions[2],
    })
}

/// Validates an RFC 1876 LOC string and returns it with whitespace collapsed.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidLoc`] if the string does not parse.
pub fn validate_loc(value: &str) -> Result<String, ValidationError> {
    parse_loc(value)?;
    Ok(value.split_whitespace().collect::<Vec<_>>().join(" "))
}

// ============================================================================
// Record field validators
// ============================================================================

/// Validates a MAC address: six lowercase hex octets separated by `:`.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidMacAddress`] on any other form.
pub fn validate_mac(value: &str) -> Result<String, ValidationError> {
    let octets: Vec<&str> = value.split(':').collect();
    let valid = octets.len() == 6
        && octets.iter().all(|octet| {
            octet.len() == 2
                && octet
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        });
    if valid {
        Ok(value.to_string())
    } else {
        Err(ValidationError::InvalidMacAddress {
            value: value.to_string(),
        })
    }
}

/// Validates a NAPTR flag: empty, or one of `a`, `s`, `u`, `p` in either case.
///
/// Returns the flag lowercased.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidNaptrFlag`] for anything else.
pub fn validate_naptr_flag(value: &str) -> Result<String, ValidationError> {
    let lowered = value.to_ascii_lowercase();
    match lowered.as_str() {
        "" | "a" | "s" | "u" | "p" => Ok(lowered),
        _ => Err(ValidationError::InvalidNaptrFlag {
            value: value.to_string(),
        }),
    }
}

const SRV_PROTOCOLS: [&str; 4] = ["tcp", "udp", "tls", "sctp"];

/// Validates an SRV owner name of the form `_service._proto.domain`.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidSrvService`] when the name does not match.
pub fn validate_srv_service(value: &str) -> Result<String, ValidationError> {
    let normalized = normalize_name(value);
    let invalid = || ValidationError::InvalidSrvService {
        value: value.to_string(),
    };

    let mut parts = normalized.splitn(3, '.');
    let service = parts.next().ok_or_else(invalid)?;
    let proto = parts.next().ok_or_else(invalid)?;
    let domain = parts.next().ok_or_else(invalid)?;

    let service_ok = service.strip_prefix('_').is_some_and(|s| {
        !s.is_empty()
            && s.len() < MAX_LABEL_LENGTH
            && s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    });
    let proto_ok = proto
        .strip_prefix('_')
        .is_some_and(|p| SRV_PROTOCOLS.contains(&p));

    if !service_ok || !proto_ok || check_labels(domain).is_err() {
        return Err(invalid());
    }
    Ok(normalized)
}

/// Validates that a value fits in an unsigned 16-bit integer.
///
/// # Errors
///
/// Returns [`ValidationError::OutOfRangeU16`] if the value is negative or above 65535.
pub fn validate_u16(field: &'static str, value: i64) -> Result<u16, ValidationError> {
    u16::try_from(value).map_err(|_| ValidationError::OutOfRangeU16 { field, value })
}

/// Validates an SOA serial of the form `YYYYMMDDnn`.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidSerial`] if the value does not have ten digits,
/// does not fit in 32 bits or its date prefix is not a calendar date.
pub fn validate_serial(value: u64) -> Result<u32, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidSerial {
        value,
        reason: reason.to_string(),
    };
    if !(1_000_000_000..=u64::from(u32::MAX)).contains(&value) {
        return Err(invalid("serial must have ten digits and fit in 32 bits"));
    }
    let date = value / 100;
    let year = i32::try_from(date / 10_000).map_err(|_| invalid("year out of range"))?;
    let month = u32::try_from((date / 100) % 100).map_err(|_| invalid("month out of range"))?;
    let day = u32::try_from(date % 100).map_err(|_| invalid("day out of range"))?;
    if NaiveDate::from_ymd_opt(year, month, day).is_none() {
        return Err(invalid("date prefix is not a valid date"));
    }
    u32::try_from(value).map_err(|_| invalid("serial does not fit in 32 bits"))
}

/// Validates a TTL: 0, or within 15..=2147483647 seconds.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidTtl`] for any other value.
pub fn validate_ttl(value: i64) -> Result<u32, ValidationError> {
    match u32::try_from(value) {
        Ok(0) => Ok(0),
        Ok(ttl) if (MIN_TTL_SECS..=MAX_TTL_SECS).contains(&ttl) => Ok(ttl),
        _ => Err(ValidationError::InvalidTtl { value }),
    }
}

/// Validates an e-mail address with a local part and a multi-label domain.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidEmail`] on malformed addresses.
pub fn validate_email(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    let invalid = || ValidationError::InvalidEmail {
        value: value.to_string(),
    };
    let (local, domain) = trimmed.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || local.chars().any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(invalid());
    }
    let domain = validate_hostname(domain).map_err(|_| invalid())?;
    Ok(format!("{local}@{domain}"))
}

/// Validates TXT record data.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidTxt`] if the payload is empty or longer than 255
/// characters.
pub fn validate_txt(value: &str) -> Result<String, ValidationError> {
    let length = value.chars().count();
    if length == 0 {
        return Err(ValidationError::InvalidTxt {
            reason: "payload is empty".to_string(),
        });
    }
    if length > MAX_TXT_LENGTH {
        return Err(ValidationError::InvalidTxt {
            reason: format!("payload is {length} characters, maximum is {MAX_TXT_LENGTH}"),
        });
    }
    Ok(value.to_string())
}

/// Rejects empty or whitespace-only text.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyField`] when the value has no content.
pub fn validate_non_empty(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(trimmed.to_string())
}

/// Validates a nameserver list: non-empty, every entry a valid host name, no repeats.
///
/// Order is preserved; the first entry is the zone's primary.
///
/// # Errors
///
/// * [`ValidationError::EmptyNameserverList`] for an empty list
/// * [`ValidationError::DuplicateNameserver`] when a name appears twice
/// * Hostname errors for malformed entries
pub fn validate_nameservers<S: AsRef<str>>(names: &[S]) -> Result<Vec<String>, ValidationError> {
    if names.is_empty() {
        return Err(ValidationError::EmptyNameserverList);
    }
    let mut seen = HashSet::with_capacity(names.len());
    let mut normalized = Vec::with_capacity(names.len());
    for name in names {
        let name = validate_hostname(name.as_ref())?;
        if !seen.insert(name.clone()) {
            return Err(ValidationError::DuplicateNameserver { name });
        }
        normalized.push(name);
    }
    Ok(normalized)
}
