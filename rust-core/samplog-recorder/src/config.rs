// SPDX-License-Identifier: PMPL-1.0-or-later
//! Recorder configuration.
//!
//! Defaults follow the long-standing behaviour of the recorder:
//! - scale_when / scale_data: 1 (store raw units)
//! - buffer_capacity: 65 536 records before a forced drain
//! - sync_mode: fsync once, at close
//! - clock: wall clock, nanoseconds since the Unix epoch
//! - manifest: off

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::buffer::DEFAULT_BUFFER_CAPACITY;
use crate::error::{RecorderError, RecorderResult};
use crate::runtime::ClockSource;
use crate::scale::{Scales, TimeUnit};
use crate::writer::SyncMode;

/// Everything needed to open a [`Logger`](crate::Logger).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Path of the log file. Created or truncated at open.
    pub output: PathBuf,
    /// Divisor applied to every timestamp.
    pub scale_when: u64,
    /// Divisor applied to every value.
    pub scale_data: u64,
    /// Records buffered before the recording thread drains to disk.
    pub buffer_capacity: usize,
    /// When the writer issues `fsync`.
    pub sync_mode: SyncMode,
    /// Timestamp source for `record_now` and stopwatches.
    pub clock: ClockSource,
    /// Write a JSON manifest next to the log.
    pub manifest: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::new(),
            scale_when: 1,
            scale_data: 1,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            sync_mode: SyncMode::default(),
            clock: ClockSource::default(),
            manifest: false,
        }
    }
}

impl RecorderConfig {
    /// Defaults, writing to `output`.
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            ..Self::default()
        }
    }

    pub fn with_scales(mut self, scale_when: u64, scale_data: u64) -> Self {
        self.scale_when = scale_when;
        self.scale_data = scale_data;
        self
    }

    /// Set both divisors from time units, e.g. `(Milliseconds, Microseconds)`.
    pub fn with_units(self, when: TimeUnit, data: TimeUnit) -> Self {
        self.with_scales(when.nanos(), data.nanos())
    }

    pub fn with_buffer_capacity(mut self, records: usize) -> Self {
        self.buffer_capacity = records;
        self
    }

    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }

    pub fn with_clock(mut self, clock: ClockSource) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_manifest(mut self, manifest: bool) -> Self {
        self.manifest = manifest;
        self
    }

    /// Check everything that can be checked without opening the output.
    /// Returns the validated divisors.
    pub fn validate(&self) -> RecorderResult<Scales> {
        let scales = Scales::new(self.scale_when, self.scale_data)?;

        if self.buffer_capacity == 0 {
            return Err(RecorderError::InvalidConfiguration(
                "buffer_capacity must be at least one record".to_string(),
            ));
        }
        if self.output.as_os_str().is_empty() {
            return Err(RecorderError::InvalidConfiguration(
                "output path must not be empty".to_string(),
            ));
        }
        if self.output.is_dir() {
            return Err(RecorderError::InvalidConfiguration(format!(
                "output {} is a directory",
                self.output.display()
            )));
        }

        Ok(scales)
    }

    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> RecorderResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> RecorderResult<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let config = RecorderConfig::new("samples.log");
        assert_eq!(config.scale_when, 1);
        assert_eq!(config.scale_data, 1);
        assert_eq!(config.buffer_capacity, 65_536);
        assert_eq!(config.sync_mode, SyncMode::OnClose);
        assert_eq!(config.clock, ClockSource::Wall);
        assert!(!config.manifest);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_scales_rejected() {
        let config = RecorderConfig::new("samples.log").with_scales(0, 1);
        assert!(matches!(
            config.validate(),
            Err(RecorderError::InvalidConfiguration(_))
        ));
        let config = RecorderConfig::new("samples.log").with_scales(1, 0);
        assert!(matches!(
            config.validate(),
            Err(RecorderError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_zero_capacity_and_empty_output_rejected() {
        let config = RecorderConfig::new("samples.log").with_buffer_capacity(0);
        assert!(config.validate().is_err());
        assert!(RecorderConfig::default().validate().is_err());
    }

    #[test]
    fn test_directory_output_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = RecorderConfig::new(dir.path());
        assert!(matches!(
            config.validate(),
            Err(RecorderError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_with_units() {
        let config = RecorderConfig::new("samples.log")
            .with_units(TimeUnit::Milliseconds, TimeUnit::Microseconds);
        let scales = config.validate().unwrap();
        assert_eq!(scales.when(), 1_000_000);
        assert_eq!(scales.data(), 1_000);
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = RecorderConfig::from_json_str(
            r#"{
                "output": "/tmp/out.log",
                "scale_when": 1000,
                "sync_mode": { "periodic": 500 },
                "clock": "monotonic"
            }"#,
        )
        .unwrap();
        assert_eq!(config.output, PathBuf::from("/tmp/out.log"));
        assert_eq!(config.scale_when, 1000);
        assert_eq!(config.scale_data, 1);
        assert_eq!(config.sync_mode, SyncMode::Periodic(Duration::from_millis(500)));
        assert_eq!(config.clock, ClockSource::Monotonic);
        assert_eq!(config.buffer_capacity, 65_536);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = RecorderConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, RecorderError::Config(_)));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("recorder.json");
        let original = RecorderConfig::new("/var/log/samples.log")
            .with_scales(1000, 10)
            .with_sync_mode(SyncMode::Fsync)
            .with_manifest(true);
        fs::write(&path, serde_json::to_string_pretty(&original).unwrap()).unwrap();

        assert_eq!(RecorderConfig::from_json_file(&path).unwrap(), original);
    }
}
