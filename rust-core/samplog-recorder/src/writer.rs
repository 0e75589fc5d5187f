// SPDX-License-Identifier: PMPL-1.0-or-later
//
// samplog recorder - Append-only log writer
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The `LogWriter` is the only owner of the output file handle. Drained
// blocks are appended with a single `write_all` each, and fsync is issued
// according to the configured `SyncMode`.

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{RecorderError, RecorderResult};
use crate::record::{EncodedRecord, RECORD_SIZE};

// ---------------------------------------------------------------------------
// SyncMode
// ---------------------------------------------------------------------------

/// Controls how aggressively the writer calls `fsync` to push data to
/// stable storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` after every written block and at close. Every block that
    /// was acknowledged survives a crash, at the cost of throughput.
    Fsync,

    /// `fsync` after a block when at least this much time has passed since
    /// the previous sync, and always at close. Serialized as milliseconds.
    Periodic(#[serde(with = "duration_millis")] Duration),

    /// `fsync` only once, at close.
    #[default]
    OnClose,

    /// Never `fsync`; rely on the OS page cache to reach the disk
    /// eventually.
    Async,
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

// ---------------------------------------------------------------------------
// WriterStats
// ---------------------------------------------------------------------------

/// Counters for everything the writer has put on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Non-empty blocks appended.
    pub blocks_written: u64,
    /// Records appended across all blocks.
    pub records_written: u64,
    /// Bytes appended; always `records_written * RECORD_SIZE`.
    pub bytes_written: u64,
    /// `fsync` calls issued, including the one at close.
    pub syncs: u64,
}

// ---------------------------------------------------------------------------
// LogWriter
// ---------------------------------------------------------------------------

struct WriterState {
    /// `None` once closed or once the handle was lost.
    file: Option<File>,
    /// File length covered by whole, successfully written blocks.
    committed: u64,
    last_sync: Instant,
    stats: WriterStats,
}

/// Sole writer of one log file.
///
/// All writes go through [`LogWriter::lock`], so only one block is ever in
/// flight. Blocks are written in the order their sessions acquire the lock.
pub struct LogWriter {
    path: PathBuf,
    sync_mode: SyncMode,
    state: Mutex<WriterState>,
    /// Mirrors `state.file.is_none()` so producers can check it without
    /// queueing behind an in-flight write.
    closed: AtomicBool,
}

impl LogWriter {
    /// Create (or truncate) the log file at `path`.
    pub fn open(path: impl AsRef<Path>, sync_mode: SyncMode) -> RecorderResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|source| RecorderError::OutputUnavailable {
                path: path.clone(),
                source,
            })?;

        info!(path = %path.display(), ?sync_mode, "Opened sample log");

        Ok(Self {
            path,
            sync_mode,
            state: Mutex::new(WriterState {
                file: Some(file),
                committed: 0,
                last_sync: Instant::now(),
                stats: WriterStats::default(),
            }),
            closed: AtomicBool::new(false),
        })
    }

    /// Take exclusive use of the file. Later callers queue behind the
    /// returned session until it is dropped.
    pub fn lock(&self) -> WriterSession<'_> {
        WriterSession {
            writer: self,
            state: self.state.lock(),
        }
    }

    /// Append one block. Shorthand for `lock().write_block(block)`.
    pub fn write_block(&self, block: &[EncodedRecord]) -> RecorderResult<()> {
        self.lock().write_block(block)
    }

    /// Force an `fsync` now, whatever the sync mode.
    pub fn sync(&self) -> RecorderResult<()> {
        self.lock().sync()
    }

    /// Sync (or, in `Async` mode, just flush) and release the file handle.
    /// Only the first call does anything.
    pub fn close(&self) -> RecorderResult<()> {
        let mut state = self.state.lock();
        let Some(mut file) = state.file.take() else {
            return Ok(());
        };
        self.closed.store(true, Ordering::Release);

        let result = match self.sync_mode {
            SyncMode::Async => file.flush(),
            _ => file.sync_all(),
        };
        if result.is_ok() && self.sync_mode != SyncMode::Async {
            state.stats.syncs += 1;
        }
        drop(file);

        info!(
            path = %self.path.display(),
            records = state.stats.records_written,
            bytes = state.stats.bytes_written,
            "Closed sample log"
        );

        result.map_err(RecorderError::write_failed)
    }

    /// `true` after `close()` or after the handle was lost to an I/O error.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sync_mode(&self) -> SyncMode {
        self.sync_mode
    }

    /// Snapshot of the write counters.
    pub fn stats(&self) -> WriterStats {
        self.state.lock().stats
    }
}

// ---------------------------------------------------------------------------
// WriterSession
// ---------------------------------------------------------------------------

/// Exclusive access to a [`LogWriter`], held while one block is written.
pub struct WriterSession<'a> {
    writer: &'a LogWriter,
    state: MutexGuard<'a, WriterState>,
}

impl WriterSession<'_> {
    /// Append every record of `block`, in order.
    ///
    /// An empty block writes nothing and still succeeds. On failure the
    /// block is not retried and any part of it that reached the file is cut
    /// off again, so the file only ever holds whole records. If the error
    /// means the handle itself is gone, or the cut fails, the writer
    /// releases the handle and reports itself closed from then on.
    pub fn write_block(&mut self, block: &[EncodedRecord]) -> RecorderResult<()> {
        if block.is_empty() {
            return Ok(());
        }

        let file = self.state.file.as_mut().ok_or_else(|| {
            RecorderError::write_failed(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "output handle already released",
            ))
        })?;

        let mut bytes = Vec::with_capacity(block.len() * RECORD_SIZE);
        for record in block {
            bytes.extend_from_slice(record.as_ref());
        }

        let (written, result) = write_fully(file, &bytes);
        if let Err(error) = result {
            if written > 0 {
                if let Err(rollback) = self.discard_partial_block() {
                    warn!(
                        path = %self.writer.path.display(),
                        %error,
                        %rollback,
                        "Could not cut off partial block, closing writer"
                    );
                    self.release();
                    return Err(RecorderError::write_failed(error));
                }
            }
            return Err(self.fail(error));
        }

        self.state.committed += bytes.len() as u64;
        let stats = &mut self.state.stats;
        stats.blocks_written += 1;
        stats.records_written += block.len() as u64;
        stats.bytes_written += bytes.len() as u64;

        debug!(records = block.len(), bytes = bytes.len(), "Wrote block");

        self.maybe_sync()
    }

    /// Force an `fsync` of the file.
    pub fn sync(&mut self) -> RecorderResult<()> {
        let Some(file) = self.state.file.as_mut() else {
            return Err(RecorderError::LoggerClosed);
        };
        if let Err(error) = file.sync_all() {
            return Err(self.fail(error));
        }
        self.state.last_sync = Instant::now();
        self.state.stats.syncs += 1;
        debug!(path = %self.writer.path.display(), "Synced sample log");
        Ok(())
    }

    fn maybe_sync(&mut self) -> RecorderResult<()> {
        match self.writer.sync_mode {
            SyncMode::Fsync => self.sync(),
            SyncMode::Periodic(interval) => {
                if self.state.last_sync.elapsed() >= interval {
                    self.sync()
                } else {
                    Ok(())
                }
            }
            SyncMode::OnClose | SyncMode::Async => Ok(()),
        }
    }

    fn fail(&mut self, error: io::Error) -> RecorderError {
        if is_handle_lost(&error) {
            warn!(
                path = %self.writer.path.display(),
                %error,
                "Output handle lost, closing writer"
            );
            self.release();
        }
        RecorderError::write_failed(error)
    }

    /// Truncate back to the last whole block and move the cursor there.
    fn discard_partial_block(&mut self) -> io::Result<()> {
        let committed = self.state.committed;
        let Some(file) = self.state.file.as_mut() else {
            return Ok(());
        };
        file.set_len(committed)?;
        file.seek(SeekFrom::Start(committed))?;
        debug!(path = %self.writer.path.display(), committed, "Cut off partial block");
        Ok(())
    }

    fn release(&mut self) {
        self.state.file = None;
        self.writer.closed.store(true, Ordering::Release);
    }
}

/// `write_all`, but also reporting how many bytes reached the file before
/// an error.
fn write_fully(file: &mut File, mut bytes: &[u8]) -> (usize, io::Result<()>) {
    let mut written = 0;
    while !bytes.is_empty() {
        match file.write(bytes) {
            Ok(0) => {
                return (
                    written,
                    Err(io::Error::new(io::ErrorKind::WriteZero, "failed to write whole block")),
                )
            }
            Ok(n) => {
                written += n;
                bytes = &bytes[n..];
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return (written, Err(e)),
        }
    }
    (written, Ok(()))
}

/// Errors after which the file handle can never be written again.
fn is_handle_lost(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::BrokenPipe || error.raw_os_error() == Some(libc::EBADF)
}
