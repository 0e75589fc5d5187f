// SPDX-License-Identifier: PMPL-1.0-or-later
//
// samplog recorder - Logger façade
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A `Logger` owns one `LogBuffer` and one `LogWriter`, created together at
// open and released together at close. Lifecycle:
//
//   Created --open()--> Active --close()--> Closed
//
// `close()` is idempotent and there is no way back from Closed. Dropping an
// open logger closes it.
//
// Close vs. record: `record` holds the read side of the lifecycle lock for
// the whole append, `close` takes the write side. A record that is already
// in flight when close starts is drained with everything else; a record that
// arrives after close gets `LoggerClosed`. Nothing is dropped silently.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tracing::{error, info};

use crate::buffer::LogBuffer;
use crate::config::RecorderConfig;
use crate::error::{RecorderError, RecorderResult};
use crate::manifest::{manifest_path, Manifest};
use crate::record::{encode, EncodedRecord, Sample};
use crate::runtime::{self, ClockSource};
use crate::scale::Scales;
use crate::sysstats::{IoStats, RusageStats};
use crate::writer::LogWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Active,
    Closed,
}

/// Counters describing a logger's activity so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecorderStats {
    /// Samples accepted by `record` and friends.
    pub samples_recorded: u64,
    /// Samples currently waiting in the buffer.
    pub samples_buffered: u64,
    /// Blocks written to the file.
    pub blocks_written: u64,
    /// Records written to the file.
    pub records_written: u64,
    /// Bytes written to the file.
    pub bytes_written: u64,
    /// `fsync` calls issued.
    pub syncs: u64,
}

/// A timing started by [`Logger::start`] and recorded by
/// [`Logger::finish`].
#[derive(Debug, Clone, Copy)]
#[must_use = "a stopwatch records nothing until it is passed to Logger::finish"]
pub struct Stopwatch {
    series: u64,
    started_at: u64,
    started: Instant,
}

impl Stopwatch {
    pub fn series(&self) -> u64 {
        self.series
    }

    /// Timestamp (from the logger's clock) at which the stopwatch started.
    pub fn started_at(&self) -> u64 {
        self.started_at
    }
}

// ---------------------------------------------------------------------------
// LoggerCore
// ---------------------------------------------------------------------------

/// Shared state behind a [`Logger`]. The process runtime keeps a weak
/// reference to it so that teardown can close loggers nobody closed.
pub(crate) struct LoggerCore {
    id: u64,
    path: PathBuf,
    scales: Scales,
    clock: ClockSource,
    buffer: LogBuffer,
    writer: LogWriter,
    lifecycle: RwLock<Lifecycle>,
    manifest: Option<Mutex<Manifest>>,
    samples_recorded: AtomicU64,
}

impl LoggerCore {
    fn append(&self, record: EncodedRecord) -> RecorderResult<()> {
        let lifecycle = self.lifecycle.read();
        if *lifecycle == Lifecycle::Closed || self.writer.is_closed() {
            return Err(RecorderError::LoggerClosed);
        }
        let result = self.buffer.append(record, &self.writer);
        self.samples_recorded.fetch_add(1, Ordering::Relaxed);
        result
    }

    fn flush(&self) -> RecorderResult<()> {
        let lifecycle = self.lifecycle.read();
        if *lifecycle == Lifecycle::Closed {
            return Ok(());
        }
        self.buffer.drain_into(&self.writer).map(|_| ())
    }

    pub(crate) fn close(&self) -> RecorderResult<()> {
        let mut lifecycle = self.lifecycle.write();
        if *lifecycle == Lifecycle::Closed {
            return Ok(());
        }
        *lifecycle = Lifecycle::Closed;

        let drained = self.buffer.drain_into(&self.writer);
        let closed = self.writer.close();
        let manifest = self.finish_manifest();
        runtime::deregister(self.id);

        info!(
            path = %self.path.display(),
            samples = self.samples_recorded.load(Ordering::Relaxed),
            "Logger closed"
        );

        drained.and(closed).and(manifest)
    }

    pub(crate) fn is_closed(&self) -> bool {
        *self.lifecycle.read() == Lifecycle::Closed || self.writer.is_closed()
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn finish_manifest(&self) -> RecorderResult<()> {
        let Some(manifest) = &self.manifest else {
            return Ok(());
        };
        let mut manifest = manifest.lock();
        manifest.finish(self.writer.stats().records_written);
        manifest
            .write_to(&manifest_path(&self.path))
            .map_err(RecorderError::write_failed)
    }
}

// ---------------------------------------------------------------------------
// Logger
// ---------------------------------------------------------------------------

/// Thread-safe recorder for `(series, timestamp, value)` samples.
///
/// `Logger` is `Send + Sync`; share it by reference or inside an `Arc`
/// between producer threads.
///
/// ```no_run
/// use samplog_recorder::Logger;
///
/// let logger = Logger::create("/tmp/samples.log", 1000, 1).unwrap();
/// logger.record(7, 2500, 42).unwrap(); // stored as (7, 2, 42)
/// logger.close().unwrap();
/// ```
pub struct Logger {
    core: Arc<LoggerCore>,
}

impl Logger {
    /// Validate `config`, open the output and start accepting samples.
    ///
    /// Nothing is created on disk when validation fails.
    pub fn open(config: RecorderConfig) -> RecorderResult<Self> {
        let scales = config.validate()?;
        let writer = LogWriter::open(&config.output, config.sync_mode)?;

        let manifest = if config.manifest {
            let manifest = Manifest::new(&scales);
            let path = manifest_path(&config.output);
            if let Err(source) = manifest.write_to(&path) {
                drop(writer);
                let _ = fs::remove_file(&config.output);
                return Err(RecorderError::OutputUnavailable { path, source });
            }
            Some(Mutex::new(manifest))
        } else {
            None
        };

        let id = runtime::next_logger_id();
        let core = Arc::new(LoggerCore {
            id,
            path: config.output.clone(),
            scales,
            clock: config.clock,
            buffer: LogBuffer::new(config.buffer_capacity),
            writer,
            lifecycle: RwLock::new(Lifecycle::Active),
            manifest,
            samples_recorded: AtomicU64::new(0),
        });
        runtime::register(id, &core);

        info!(
            path = %config.output.display(),
            scale_when = scales.when(),
            scale_data = scales.data(),
            buffer_capacity = config.buffer_capacity,
            "Logger opened"
        );

        Ok(Self { core })
    }

    /// Open with default settings apart from the two divisors.
    pub fn create(output: impl Into<PathBuf>, scale_when: u64, scale_data: u64) -> RecorderResult<Self> {
        Self::open(RecorderConfig::new(output).with_scales(scale_when, scale_data))
    }

    /// Record one sample. Both the timestamp and the value are divided by
    /// the logger's scales.
    ///
    /// May block while this call writes a full buffer to disk; a failure of
    /// that write is returned here. Fails with `LoggerClosed` after close.
    pub fn record(&self, series: u64, timestamp: u64, value: u64) -> RecorderResult<()> {
        self.record_sample(Sample::new(series, timestamp, value))
    }

    pub fn record_sample(&self, sample: Sample) -> RecorderResult<()> {
        self.core.append(sample.scaled(&self.core.scales).encode())
    }

    /// Record `value` at the current time of the configured clock.
    pub fn record_now(&self, series: u64, value: u64) -> RecorderResult<()> {
        self.record(series, self.now(), value)
    }

    /// Start timing an operation for `series`.
    pub fn start(&self, series: u64) -> Stopwatch {
        Stopwatch {
            series,
            started_at: self.now(),
            started: Instant::now(),
        }
    }

    /// Record the elapsed nanoseconds of `stopwatch` as a sample timestamped
    /// when it was started.
    pub fn finish(&self, stopwatch: Stopwatch) -> RecorderResult<()> {
        let elapsed = u64::try_from(stopwatch.started.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.record(stopwatch.series, stopwatch.started_at, elapsed)
    }

    /// Record a `getrusage` snapshot under the reserved rusage series.
    pub fn record_rusage(&self, timestamp: u64, stats: &RusageStats) -> RecorderResult<()> {
        for (series, value) in stats.samples() {
            self.record_unscaled_value(series, timestamp, value)?;
        }
        Ok(())
    }

    /// Record block-device counters under the reserved I/O series.
    pub fn record_io_stats(&self, timestamp: u64, stats: &IoStats) -> RecorderResult<()> {
        for (series, value) in stats.samples() {
            self.record_unscaled_value(series, timestamp, value)?;
        }
        Ok(())
    }

    /// Write everything buffered so far without closing. A no-op on a
    /// closed logger.
    pub fn flush(&self) -> RecorderResult<()> {
        self.core.flush()
    }

    /// Flush, then `fsync` regardless of the sync mode.
    pub fn sync(&self) -> RecorderResult<()> {
        self.flush()?;
        if self.is_closed() {
            return Ok(());
        }
        self.core.writer.sync()
    }

    /// Drain the buffer, write the final block and release the file.
    ///
    /// Safe to call from any thread, any number of times; only the first
    /// call has an effect. The logger is Closed afterwards even if the
    /// final write failed, and that failure is returned.
    pub fn close(&self) -> RecorderResult<()> {
        self.core.close()
    }

    /// `true` once closed, or once the output handle was lost.
    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    pub fn path(&self) -> &Path {
        self.core.path()
    }

    pub fn scales(&self) -> Scales {
        self.core.scales
    }

    pub fn clock(&self) -> ClockSource {
        self.core.clock
    }

    pub fn stats(&self) -> RecorderStats {
        let writer = self.core.writer.stats();
        RecorderStats {
            samples_recorded: self.core.samples_recorded.load(Ordering::Relaxed),
            samples_buffered: self.core.buffer.len() as u64,
            blocks_written: writer.blocks_written,
            records_written: writer.records_written,
            bytes_written: writer.bytes_written,
            syncs: writer.syncs,
        }
    }

    fn now(&self) -> u64 {
        self.core.clock.now_nanos()
    }

    fn record_unscaled_value(&self, series: u64, timestamp: u64, value: u64) -> RecorderResult<()> {
        self.core
            .append(encode(series, self.core.scales.scale_when(timestamp), value))
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("path", &self.core.path)
            .field("scales", &self.core.scales)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if let Err(e) = self.core.close() {
            error!(path = %self.core.path.display(), error = %e, "Failed to close logger on drop");
        }
    }
}
