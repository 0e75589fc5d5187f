// SPDX-License-Identifier: PMPL-1.0-or-later
//
// samplog recorder - Error types
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Every failure the recorder can report: configuration rejected at open,
// an output target that cannot be opened, I/O failures while writing a
// drained block, and use of a logger after it was closed.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while configuring or driving a recorder.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// The configuration was rejected before any file was touched
    /// (zero scale divisor, zero buffer capacity, empty output path,
    /// unknown time unit, ...).
    #[error("invalid recorder configuration: {0}")]
    InvalidConfiguration(String),

    /// The output target could not be opened for writing.
    #[error("output {} unavailable: {source}", path.display())]
    OutputUnavailable {
        /// The path that was being opened.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Writing a drained block (or syncing it) failed. The records in that
    /// block are not retried.
    #[error("write failed: {source}")]
    WriteFailed {
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Recording was attempted after `close()`.
    #[error("logger is closed")]
    LoggerClosed,

    /// Fewer bytes than one encoded record were handed to the decoder.
    #[error("truncated record: {len} bytes available")]
    Truncated {
        /// Number of bytes that were available.
        len: usize,
    },

    /// A JSON configuration document could not be parsed.
    #[error("config parse error: {0}")]
    Config(#[from] serde_json::Error),

    /// An I/O error outside the write path (reading stat files, loading a
    /// config file).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RecorderError {
    /// Wrap an I/O error from the write path.
    pub(crate) fn write_failed(source: io::Error) -> Self {
        Self::WriteFailed { source }
    }
}

/// Convenience type alias for recorder results.
pub type RecorderResult<T> = Result<T, RecorderError>;
