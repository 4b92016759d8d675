// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! SOA serial number generation.
//!
//! Serials follow the `YYYYMMDDnn` convention: an eight digit date prefix followed by a
//! two digit sequence counter that allows up to 100 publishes per day.

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

use crate::constants::{MAX_SERIAL_SEQUENCE, SERIAL_SEQUENCE_BASE};

/// Errors produced while computing a serial number.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SerialError {
    /// The sequence counter for the current day is exhausted
    #[error("Serial {previous} already carries the last sequence number for {date}")]
    Overflow {
        /// The serial that could not be advanced
        previous: u32,
        /// The day the serial was computed for
        date: NaiveDate,
    },

    /// The date cannot be encoded in 32 bits
    #[error("Date {date} cannot be encoded as a serial number")]
    DateOutOfRange {
        /// The date that was rejected
        date: NaiveDate,
    },
}

/// Returns `YYYYMMDD` for the given date.
fn date_prefix(date: NaiveDate) -> u64 {
    // Negative years encode as 0.
    let year = u64::try_from(date.year()).unwrap_or(0);
    year * 10_000 + u64::from(date.month()) * 100 + u64::from(date.day())
}

/// Computes the next SOA serial number.
///
/// # Arguments
///
/// * `today` - The current date in UTC
/// * `previous` - The serial currently published for the zone, if any
///
/// # Returns
///
/// * `today‖00` when there is no previous serial or its date prefix is older than today
/// * `previous + 1` when the date prefix is today or in the future
///
/// # Errors
///
/// * [`SerialError::Overflow`] if the counter would exceed 99
/// * [`SerialError::DateOutOfRange`] if `today‖00` does not fit in a `u32`
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use zonereg::serial::next_serial;
///
/// let today = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
/// assert_eq!(next_serial(today, None).unwrap(), 2024030900);
/// assert_eq!(next_serial(today, Some(2024030900)).unwrap(), 2024030901);
/// assert_eq!(next_serial(today, Some(2024030812)).unwrap(), 2024030900);
/// ```
pub fn next_serial(today: NaiveDate, previous: Option<u32>) -> Result<u32, SerialError> {
    let today_prefix = date_prefix(today);

    let next = match previous {
        Some(prev) if u64::from(prev) / SERIAL_SEQUENCE_BASE >= today_prefix => {
            let sequence = u64::from(prev) % SERIAL_SEQUENCE_BASE;
            if sequence >= u64::from(MAX_SERIAL_SEQUENCE) {
                return Err(SerialError::Overflow {
                    previous: prev,
                    date: today,
                });
            }
            u64::from(prev) + 1
        }
        _ => today_prefix * SERIAL_SEQUENCE_BASE,
    };

    u32::try_from(next).map_err(|_| SerialError::DateOutOfRange { date: today })
}

/// Splits a serial into its date prefix and sequence counter.
#[must_use]
pub fn split_serial(serial: u32) -> (u32, u32) {
    let base = SERIAL_SEQUENCE_BASE as u32;
    (serial / base, serial % base)
}
