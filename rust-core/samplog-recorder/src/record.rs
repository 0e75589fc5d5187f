// SPDX-License-Identifier: PMPL-1.0-or-later
//
// samplog recorder - Record types and fixed-width codec
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// On-disk record format (all integers little-endian, 24 bytes, no framing):
//   [8 bytes: series (u64)]
//   [8 bytes: scaled timestamp (u64)]
//   [8 bytes: scaled value (u64)]
//
// A log is a plain concatenation of records, so its length is always
// `RECORD_SIZE * count` and any whole-record prefix decodes on its own.

use serde::{Deserialize, Serialize};

use crate::error::{RecorderError, RecorderResult};
use crate::scale::Scales;

/// Width in bytes of one encoded record.
pub const RECORD_SIZE: usize = 24;

/// A raw measurement as handed in by a producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sample {
    pub series: u64,
    pub timestamp: u64,
    pub value: u64,
}

impl Sample {
    pub fn new(series: u64, timestamp: u64, value: u64) -> Self {
        Self {
            series,
            timestamp,
            value,
        }
    }

    /// Apply both divisors.
    pub fn scaled(&self, scales: &Scales) -> ScaledSample {
        ScaledSample {
            series: self.series,
            timestamp: scales.scale_when(self.timestamp),
            value: scales.scale_data(self.value),
        }
    }
}

/// A sample after the logger's divisors have been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScaledSample {
    pub series: u64,
    pub timestamp: u64,
    pub value: u64,
}

impl ScaledSample {
    pub fn encode(&self) -> EncodedRecord {
        encode(self.series, self.timestamp, self.value)
    }
}

/// One record in its on-disk form.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodedRecord([u8; RECORD_SIZE]);

impl EncodedRecord {
    pub fn as_bytes(&self) -> &[u8; RECORD_SIZE] {
        &self.0
    }

    /// Decode back into the triple that was encoded.
    pub fn decode(&self) -> ScaledSample {
        let field = |at: usize| {
            let mut word = [0u8; 8];
            word.copy_from_slice(&self.0[at..at + 8]);
            u64::from_le_bytes(word)
        };
        ScaledSample {
            series: field(0),
            timestamp: field(8),
            value: field(16),
        }
    }
}

impl std::fmt::Debug for EncodedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sample = self.decode();
        f.debug_tuple("EncodedRecord")
            .field(&sample.series)
            .field(&sample.timestamp)
            .field(&sample.value)
            .finish()
    }
}

impl AsRef<[u8]> for EncodedRecord {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Encode a scaled triple. Infallible: every input has exactly one
/// 24-byte encoding.
pub fn encode(series: u64, scaled_timestamp: u64, scaled_value: u64) -> EncodedRecord {
    let mut bytes = [0u8; RECORD_SIZE];
    bytes[0..8].copy_from_slice(&series.to_le_bytes());
    bytes[8..16].copy_from_slice(&scaled_timestamp.to_le_bytes());
    bytes[16..24].copy_from_slice(&scaled_value.to_le_bytes());
    EncodedRecord(bytes)
}

/// Decode the record at the start of `data`. Trailing bytes are ignored.
pub fn decode_record(data: &[u8]) -> RecorderResult<ScaledSample> {
    let bytes: [u8; RECORD_SIZE] = data
        .get(..RECORD_SIZE)
        .and_then(|head| head.try_into().ok())
        .ok_or(RecorderError::Truncated { len: data.len() })?;
    Ok(EncodedRecord(bytes).decode())
}
