// SPDX-License-Identifier: PMPL-1.0-or-later
//
// samplog recorder - Unit scaling
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw timestamps and values are divided by fixed per-logger divisors before
// they are encoded. The divisors are validated once, when the logger is
// opened, so the hot path is a plain integer division.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RecorderError, RecorderResult};

/// Divide `raw` by `divisor`, truncating toward zero.
///
/// `divisor` must be non-zero; [`Scales::new`] enforces that for every
/// divisor that reaches the record path.
#[inline]
pub fn scale(raw: u64, divisor: u64) -> u64 {
    raw / divisor
}

// ---------------------------------------------------------------------------
// Scales
// ---------------------------------------------------------------------------

/// The pair of divisors a logger applies to every sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scales {
    when: u64,
    data: u64,
}

impl Scales {
    /// Validate and build a divisor pair. Zero is rejected.
    pub fn new(when: u64, data: u64) -> RecorderResult<Self> {
        if when == 0 {
            return Err(RecorderError::InvalidConfiguration(
                "scale_when must be a positive integer".to_string(),
            ));
        }
        if data == 0 {
            return Err(RecorderError::InvalidConfiguration(
                "scale_data must be a positive integer".to_string(),
            ));
        }
        Ok(Self { when, data })
    }

    /// Build a divisor pair from time units, e.g. timestamps stored in
    /// milliseconds and values in microseconds.
    pub fn from_units(when: TimeUnit, data: TimeUnit) -> Self {
        Self {
            when: when.nanos(),
            data: data.nanos(),
        }
    }

    /// Divisor applied to timestamps.
    pub fn when(&self) -> u64 {
        self.when
    }

    /// Divisor applied to values.
    pub fn data(&self) -> u64 {
        self.data
    }

    /// Scale a raw timestamp.
    #[inline]
    pub fn scale_when(&self, raw: u64) -> u64 {
        scale(raw, self.when)
    }

    /// Scale a raw value.
    #[inline]
    pub fn scale_data(&self, raw: u64) -> u64 {
        scale(raw, self.data)
    }
}

impl Default for Scales {
    fn default() -> Self {
        Self { when: 1, data: 1 }
    }
}

// ---------------------------------------------------------------------------
// TimeUnit
// ---------------------------------------------------------------------------

/// A unit of time, expressed as a number of nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    #[serde(rename = "ns")]
    Nanoseconds,
    #[serde(rename = "us")]
    Microseconds,
    #[serde(rename = "ms")]
    Milliseconds,
    #[serde(rename = "s")]
    Seconds,
}

impl TimeUnit {
    /// Number of nanoseconds in one unit.
    pub fn nanos(self) -> u64 {
        match self {
            TimeUnit::Nanoseconds => 1,
            TimeUnit::Microseconds => 1_000,
            TimeUnit::Milliseconds => 1_000_000,
            TimeUnit::Seconds => 1_000_000_000,
        }
    }

    /// Short suffix used when parsing and printing.
    pub fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Nanoseconds => "ns",
            TimeUnit::Microseconds => "us",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Seconds => "s",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for TimeUnit {
    type Err = RecorderError;

    /// An empty string means nanoseconds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "ns" => Ok(TimeUnit::Nanoseconds),
            "us" => Ok(TimeUnit::Microseconds),
            "ms" => Ok(TimeUnit::Milliseconds),
            "s" => Ok(TimeUnit::Seconds),
            other => Err(RecorderError::InvalidConfiguration(format!(
                "unknown time unit {other:?} (expected ns, us, ms or s)"
            ))),
        }
    }
}

/// Parse a bucket width such as `"10ms"`, `"250us"` or `"s"` into
/// nanoseconds. A missing count means one unit; a zero count is rejected.
pub fn bucket_size(bucket: &str) -> RecorderResult<u64> {
    if bucket.is_empty() {
        return Err(RecorderError::InvalidConfiguration(
            "bucket size must not be empty".to_string(),
        ));
    }

    let split = bucket
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(bucket.len());
    let (count, unit) = bucket.split_at(split);

    let count = if count.is_empty() {
        1
    } else {
        count.parse::<u64>().map_err(|e| {
            RecorderError::InvalidConfiguration(format!("bad bucket count {count:?}: {e}"))
        })?
    };
    if count == 0 {
        return Err(RecorderError::InvalidConfiguration(format!(
            "bucket size {bucket:?} is zero"
        )));
    }
    let unit: TimeUnit = unit.parse()?;

    count.checked_mul(unit.nanos()).ok_or_else(|| {
        RecorderError::InvalidConfiguration(format!("bucket size {bucket:?} overflows u64"))
    })
}

/// A bucket is usable with a unit when it is positive and a whole number of
/// units wide.
pub fn validate_bucket_units(bucket_nanos: u64, unit_nanos: u64) -> bool {
    bucket_nanos > 0 && unit_nanos > 0 && bucket_nanos % unit_nanos == 0
}

/// The largest unit that `nanos` spans at least once.
pub fn autoscale(nanos: f64) -> TimeUnit {
    let value = nanos.abs();
    if value < 1e3 {
        TimeUnit::Nanoseconds
    } else if value < 1e6 {
        TimeUnit::Microseconds
    } else if value < 1e9 {
        TimeUnit::Milliseconds
    } else {
        TimeUnit::Seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_truncates() {
        assert_eq!(scale(2500, 1000), 2);
        assert_eq!(scale(999, 1000), 0);
        assert_eq!(scale(42, 1), 42);
        assert_eq!(scale(u64::MAX, u64::MAX), 1);
    }

    #[test]
    fn test_zero_divisors_rejected() {
        assert!(matches!(
            Scales::new(0, 1),
            Err(RecorderError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Scales::new(1, 0),
            Err(RecorderError::InvalidConfiguration(_))
        ));
        let scales = Scales::new(1000, 3).unwrap();
        assert_eq!(scales.scale_when(2500), 2);
        assert_eq!(scales.scale_data(10), 3);
    }

    #[test]
    fn test_from_units() {
        let scales = Scales::from_units(TimeUnit::Milliseconds, TimeUnit::Microseconds);
        assert_eq!(scales.when(), 1_000_000);
        assert_eq!(scales.data(), 1_000);
    }

    #[test]
    fn test_parse_units() {
        assert_eq!("".parse::<TimeUnit>().unwrap(), TimeUnit::Nanoseconds);
        assert_eq!("ns".parse::<TimeUnit>().unwrap(), TimeUnit::Nanoseconds);
        assert_eq!("us".parse::<TimeUnit>().unwrap(), TimeUnit::Microseconds);
        assert_eq!("ms".parse::<TimeUnit>().unwrap(), TimeUnit::Milliseconds);
        assert_eq!("s".parse::<TimeUnit>().unwrap(), TimeUnit::Seconds);
        assert!("min".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn test_unit_serde_uses_suffix() {
        let json = serde_json::to_string(&TimeUnit::Microseconds).unwrap();
        assert_eq!(json, "\"us\"");
        let unit: TimeUnit = serde_json::from_str("\"ms\"").unwrap();
        assert_eq!(unit, TimeUnit::Milliseconds);
    }

    #[test]
    fn test_bucket_size() {
        assert_eq!(bucket_size("10ms").unwrap(), 10_000_000);
        assert_eq!(bucket_size("250us").unwrap(), 250_000);
        assert_eq!(bucket_size("s").unwrap(), 1_000_000_000);
        assert_eq!(bucket_size("7").unwrap(), 7);
        assert!(bucket_size("").is_err());
        assert!(bucket_size("10h").is_err());
        assert!(bucket_size("0ms").is_err());
        assert!(bucket_size("99999999999999999999s").is_err());
    }

    #[test]
    fn test_validate_bucket_units() {
        assert!(validate_bucket_units(10_000_000, 1_000_000));
        assert!(!validate_bucket_units(1_500, 1_000));
        assert!(!validate_bucket_units(0, 1_000));
    }

    #[test]
    fn test_autoscale() {
        assert_eq!(autoscale(999.0), TimeUnit::Nanoseconds);
        assert_eq!(autoscale(1_000.0), TimeUnit::Microseconds);
        assert_eq!(autoscale(-2_500_000.0), TimeUnit::Milliseconds);
        assert_eq!(autoscale(3e9), TimeUnit::Seconds);
    }
}
