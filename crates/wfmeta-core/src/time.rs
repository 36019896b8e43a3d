//! Timestamp normalization for raw epoch fields.
//!
//! Trace files store every instant as floating point seconds since the Unix
//! epoch. Optional instants (`begins`, `ends`, ...) are written as `NaN` or
//! left empty when the source had no value.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::event::EventError;
use crate::row::Row;

/// Largest magnitude (in seconds) we attempt to convert.
///
/// Comfortably inside chrono's representable range; anything beyond it is
/// garbage in the trace rather than a real instant.
const MAX_EPOCH_SECS: f64 = 8_000_000_000_000.0;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Errors from numeric and timestamp conversion.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimeError {
    /// The raw field is not a number.
    #[error("invalid number: {value:?}")]
    InvalidNumber { value: String },

    /// The number cannot be represented as a timestamp.
    #[error("timestamp out of range: {value}")]
    InvalidTimestamp { value: f64 },
}

/// Returns true for fields that encode "no value".
pub fn is_missing(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty()
        || ["nan", "none", "null"]
            .iter()
            .any(|sentinel| trimmed.eq_ignore_ascii_case(sentinel))
}

/// Parses a raw numeric field, mapping sentinels to `None`.
///
/// Infinities are rejected: they have no JSON representation, so a snapshot
/// holding one could not be loaded again.
pub fn parse_number(raw: &str) -> Result<Option<f64>, TimeError> {
    if is_missing(raw) {
        return Ok(None);
    }
    let invalid = || TimeError::InvalidNumber {
        value: raw.to_string(),
    };
    let value: f64 = raw.trim().parse().map_err(|_| invalid())?;
    if value.is_nan() {
        Ok(None)
    } else if value.is_infinite() {
        Err(invalid())
    } else {
        Ok(Some(value))
    }
}

/// Converts epoch seconds to a UTC timestamp. `NaN` yields `None`.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "both values are range-checked before the cast"
)]
pub fn epoch_to_datetime(secs: f64) -> Result<Option<DateTime<Utc>>, TimeError> {
    if secs.is_nan() {
        return Ok(None);
    }
    if !secs.is_finite() || secs.abs() > MAX_EPOCH_SECS {
        return Err(TimeError::InvalidTimestamp { value: secs });
    }

    let mut whole = secs.floor();
    let mut nanos = ((secs - whole) * NANOS_PER_SEC).round();
    if nanos >= NANOS_PER_SEC {
        whole += 1.0;
        nanos = 0.0;
    }

    DateTime::from_timestamp(whole as i64, nanos as u32)
        .map(Some)
        .ok_or(TimeError::InvalidTimestamp { value: secs })
}

/// Parses a raw epoch field into an optional timestamp.
pub fn parse_epoch(raw: &str) -> Result<Option<DateTime<Utc>>, TimeError> {
    match parse_number(raw)? {
        Some(secs) => epoch_to_datetime(secs),
        None => Ok(None),
    }
}

/// Converts a timestamp back to fractional epoch seconds.
#[expect(
    clippy::cast_precision_loss,
    reason = "trace timestamps are written as f64 seconds in the first place"
)]
pub fn epoch_seconds(ts: DateTime<Utc>) -> f64 {
    ts.timestamp() as f64 + f64::from(ts.timestamp_subsec_nanos()) / NANOS_PER_SEC
}

/// Folds a candidate into a running minimum.
///
/// An absent candidate carries no information and leaves `current` as is.
pub fn merge_lower_bound<T: Ord>(current: Option<T>, candidate: Option<T>) -> Option<T> {
    match (current, candidate) {
        (Some(current), Some(candidate)) => Some(current.min(candidate)),
        (current, None) => current,
        (None, candidate) => candidate,
    }
}

/// The observation time plus the optional interval reported by a transition row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventTimes {
    pub time: DateTime<Utc>,
    pub begins: Option<DateTime<Utc>>,
    pub ends: Option<DateTime<Utc>>,
}

impl EventTimes {
    /// Reads the mandatory `time` and the optional `begins`/`ends` columns.
    ///
    /// `begins` and `ends` may be missing from the row entirely.
    pub fn from_row(row: &Row) -> Result<Self, EventError> {
        let time = row.required_timestamp("time")?;
        let begins = row.optional_timestamp("begins")?;
        let ends = row.optional_timestamp("ends")?;

        tracing::trace!(%time, ?begins, ?ends, "normalized event times");

        Ok(Self { time, begins, ends })
    }
}
