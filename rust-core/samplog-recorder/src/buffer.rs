// SPDX-License-Identifier: PMPL-1.0-or-later
//
// samplog recorder - In-memory staging buffer
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Producers append encoded records under a mutex. When the buffer reaches
// its threshold the appending thread drains it and writes the block itself,
// so memory stays bounded and the producer pays for the I/O.
//
// Ordering: a drained block takes the writer lock *before* the buffer lock
// is released. Any later drain therefore queues behind it on the writer,
// and blocks reach the file in the order they were drained.

use parking_lot::Mutex;

use crate::error::RecorderResult;
use crate::record::EncodedRecord;
use crate::writer::LogWriter;

/// Default number of records buffered before a drain is forced.
pub const DEFAULT_BUFFER_CAPACITY: usize = 65_536;

/// Upper bound on the capacity reserved up front for a fresh buffer.
const MAX_PREALLOCATED_RECORDS: usize = 65_536;

/// Staging area for records that have not reached the writer yet.
pub struct LogBuffer {
    records: Mutex<Vec<EncodedRecord>>,
    threshold: usize,
}

impl LogBuffer {
    /// A buffer that drains once it holds `threshold` records. A threshold
    /// of zero is treated as one.
    pub fn new(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            records: Mutex::new(Self::fresh_block(threshold)),
            threshold,
        }
    }

    /// Add a record. If this fills the buffer, the whole contents are
    /// written to `writer` before returning.
    ///
    /// The push itself cannot fail; an error here always comes from the
    /// write of the drained block.
    pub fn append(&self, record: EncodedRecord, writer: &LogWriter) -> RecorderResult<()> {
        let mut records = self.records.lock();
        records.push(record);
        if records.len() < self.threshold {
            return Ok(());
        }

        let block = std::mem::replace(&mut *records, Self::fresh_block(self.threshold));
        let mut session = writer.lock();
        drop(records);
        session.write_block(&block)
    }

    /// Take every buffered record, leaving the buffer empty.
    pub fn drain(&self) -> Vec<EncodedRecord> {
        std::mem::take(&mut *self.records.lock())
    }

    /// Drain and write to `writer` with the same ordering as a
    /// threshold-triggered drain. Returns the number of records handed over.
    pub fn drain_into(&self, writer: &LogWriter) -> RecorderResult<usize> {
        let mut records = self.records.lock();
        let block = std::mem::take(&mut *records);
        let mut session = writer.lock();
        drop(records);
        session.write_block(&block)?;
        Ok(block.len())
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    fn fresh_block(threshold: usize) -> Vec<EncodedRecord> {
        Vec::with_capacity(threshold.min(MAX_PREALLOCATED_RECORDS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{encode, RECORD_SIZE};
    use crate::writer::SyncMode;
    use tempfile::TempDir;

    fn open_writer(dir: &TempDir) -> LogWriter {
        LogWriter::open(dir.path().join("buffer.log"), SyncMode::Async).unwrap()
    }

    #[test]
    fn test_append_below_threshold_does_not_write() {
        let dir = TempDir::new().unwrap();
        let writer = open_writer(&dir);
        let buffer = LogBuffer::new(4);

        for i in 0..3 {
            buffer.append(encode(i, 0, 0), &writer).unwrap();
        }

        assert_eq!(buffer.len(), 3);
        assert_eq!(writer.stats().records_written, 0);
    }

    #[test]
    fn test_threshold_triggers_write() {
        let dir = TempDir::new().unwrap();
        let writer = open_writer(&dir);
        let buffer = LogBuffer::new(4);

        for i in 0..4 {
            buffer.append(encode(i, 0, 0), &writer).unwrap();
        }

        assert!(buffer.is_empty());
        let stats = writer.stats();
        assert_eq!(stats.blocks_written, 1);
        assert_eq!(stats.records_written, 4);
    }

    #[test]
    fn test_drain_takes_everything() {
        let buffer = LogBuffer::new(100);
        let dir = TempDir::new().unwrap();
        let writer = open_writer(&dir);
        buffer.append(encode(1, 2, 3), &writer).unwrap();
        buffer.append(encode(4, 5, 6), &writer).unwrap();

        let block = buffer.drain();
        assert_eq!(block, vec![encode(1, 2, 3), encode(4, 5, 6)]);
        assert!(buffer.is_empty());
        assert!(buffer.drain().is_empty());
    }

    #[test]
    fn test_drain_into_writes_remaining_records() {
        let dir = TempDir::new().unwrap();
        let writer = open_writer(&dir);
        let buffer = LogBuffer::new(10);

        for i in 0..7 {
            buffer.append(encode(i, 0, 0), &writer).unwrap();
        }
        assert_eq!(buffer.drain_into(&writer).unwrap(), 7);
        assert_eq!(buffer.drain_into(&writer).unwrap(), 0);
        writer.close().unwrap();

        let data = std::fs::read(writer.path()).unwrap();
        assert_eq!(data.len(), 7 * RECORD_SIZE);
    }

    #[test]
    fn test_zero_threshold_means_one() {
        let dir = TempDir::new().unwrap();
        let writer = open_writer(&dir);
        let buffer = LogBuffer::new(0);
        assert_eq!(buffer.threshold(), 1);

        buffer.append(encode(1, 1, 1), &writer).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(writer.stats().records_written, 1);
    }

    #[test]
    fn test_concurrent_appends_keep_per_thread_order() {
        let dir = TempDir::new().unwrap();
        let writer = open_writer(&dir);
        let buffer = LogBuffer::new(16);

        std::thread::scope(|scope| {
            for thread in 0..4u64 {
                let buffer = &buffer;
                let writer = &writer;
                scope.spawn(move || {
                    for seq in 0..250u64 {
                        buffer.append(encode(thread, seq, 0), writer).unwrap();
                    }
                });
            }
        });
        buffer.drain_into(&writer).unwrap();
        writer.close().unwrap();

        let data = std::fs::read(writer.path()).unwrap();
        assert_eq!(data.len(), 1000 * RECORD_SIZE);

        let mut next = [0u64; 4];
        for chunk in data.chunks_exact(RECORD_SIZE) {
            let sample = crate::record::decode_record(chunk).unwrap();
            let thread = sample.series as usize;
            assert_eq!(sample.timestamp, next[thread]);
            next[thread] += 1;
        }
        assert_eq!(next, [250; 4]);
    }
}
