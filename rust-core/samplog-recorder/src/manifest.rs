// SPDX-License-Identifier: PMPL-1.0-or-later
//
// samplog recorder - Log manifest
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The log itself carries no header, so that its length is always a whole
// number of records. When enabled, the scales and layout are described in a
// JSON sidecar named `<output>.manifest.json`, written at open and rewritten
// at close with the final record count.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::RECORD_SIZE;
use crate::scale::Scales;

/// Version of the record layout described by a manifest.
pub const FORMAT_VERSION: u32 = 1;

/// Suffix appended to the log path to name its manifest.
pub const MANIFEST_SUFFIX: &str = ".manifest.json";

/// Sidecar description of one log file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub record_width: usize,
    pub byte_order: String,
    pub scale_when: u64,
    pub scale_data: u64,
    pub created_at: DateTime<Utc>,
    /// Set once the log is closed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    /// Records in the log, known once it is closed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<u64>,
}

impl Manifest {
    pub fn new(scales: &Scales) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            record_width: RECORD_SIZE,
            byte_order: "little".to_string(),
            scale_when: scales.when(),
            scale_data: scales.data(),
            created_at: Utc::now(),
            closed_at: None,
            records: None,
        }
    }

    /// Mark the log closed with its final record count.
    pub fn finish(&mut self, records: u64) {
        self.closed_at = Some(Utc::now());
        self.records = Some(records);
    }

    /// Write the manifest as pretty JSON, replacing any previous version.
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    }

    pub fn read_from(path: &Path) -> io::Result<Self> {
        let contents = fs::read(path)?;
        serde_json::from_slice(&contents).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// `<output>.manifest.json`
pub fn manifest_path(output: &Path) -> PathBuf {
    let mut name = OsString::from(output.as_os_str());
    name.push(MANIFEST_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_path_appends_suffix() {
        assert_eq!(
            manifest_path(Path::new("/data/run-1.log")),
            PathBuf::from("/data/run-1.log.manifest.json")
        );
    }

    #[test]
    fn test_open_manifest_omits_close_fields() {
        let manifest = Manifest::new(&Scales::new(1000, 1).unwrap());
        let json = serde_json::to_string(&manifest).unwrap();
        assert!(json.contains("\"record_width\":24"));
        assert!(json.contains("\"scale_when\":1000"));
        assert!(!json.contains("closed_at"));
        assert!(!json.contains("records"));
    }

    #[test]
    fn test_finish_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.manifest.json");

        let mut manifest = Manifest::new(&Scales::default());
        manifest.finish(42);
        manifest.write_to(&path).unwrap();

        let loaded = Manifest::read_from(&path).unwrap();
        assert_eq!(loaded, manifest);
        assert_eq!(loaded.records, Some(42));
        assert!(loaded.closed_at.unwrap() >= loaded.created_at);
    }
}
