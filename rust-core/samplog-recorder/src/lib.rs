// SPDX-License-Identifier: PMPL-1.0-or-later
//
// samplog recorder crate
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Records `(series, timestamp, value)` samples from many threads into a
// single append-only binary file with as little per-call overhead as
// possible. Samples are scaled by two divisors chosen at open, encoded into
// fixed-width records and collected in memory; whichever thread finds the
// buffer full writes the whole block out in one call.
//
// # Architecture
//
// ```text
//   record() --scale--> encode --> LogBuffer --(threshold / flush / close)--> LogWriter --> file
// ```
//
// - `scale`   - divisor arithmetic and time-unit helpers
// - `record`  - the 24-byte record codec
// - `buffer`  - the shared in-memory block and its drain rule
// - `writer`  - exclusive owner of the output file
// - `logger`  - the façade tying them together, plus lifecycle
// - `runtime` - process-wide clock anchor and init/teardown
//
// ## On-disk record format (all integers little-endian, no file header)
//
// ```text
// [8 bytes: series (u64)]
// [8 bytes: scaled timestamp (u64)]   -- timestamp / scale_when
// [8 bytes: scaled value (u64)]       -- value / scale_data
// ```
//
// The file length is always a multiple of 24. Divisors are not stored in
// the file; enable the manifest to keep them in `<output>.manifest.json`.
//
// Records drained in one block appear contiguously and in append order;
// blocks appear in the order they were drained. Two records from the same
// thread keep their relative order. Nothing else about interleaving
// between threads is promised.
//
// ## Usage
//
// ```no_run
// use samplog_recorder::{Logger, RecorderConfig, SyncMode, TimeUnit};
//
// samplog_recorder::init();
//
// let config = RecorderConfig::new("/tmp/latency.log")
//     .with_units(TimeUnit::Milliseconds, TimeUnit::Nanoseconds)
//     .with_sync_mode(SyncMode::OnClose);
// let logger = Logger::open(config).unwrap();
//
// let watch = logger.start(1);
// // ... the operation being measured ...
// logger.finish(watch).unwrap();
//
// logger.close().unwrap();
// samplog_recorder::teardown();
// ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod logger;
pub mod manifest;
pub mod record;
pub mod runtime;
pub mod scale;
pub mod sysstats;
pub mod writer;

// Re-export the primary public API for ergonomic imports.
pub use buffer::{LogBuffer, DEFAULT_BUFFER_CAPACITY};
pub use config::RecorderConfig;
pub use error::{RecorderError, RecorderResult};
pub use logger::{Logger, RecorderStats, Stopwatch};
pub use manifest::{manifest_path, Manifest};
pub use record::{decode_record, encode, EncodedRecord, Sample, ScaledSample, RECORD_SIZE};
pub use runtime::{init, teardown, ClockSource};
pub use scale::{scale, Scales, TimeUnit};
pub use sysstats::{IoStats, RusageStats};
pub use writer::{LogWriter, SyncMode, WriterStats};
