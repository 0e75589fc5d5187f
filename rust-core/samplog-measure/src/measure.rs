// SPDX-License-Identifier: PMPL-1.0-or-later
//! The measurement loop.
//!
//! Every producer thread records, under [`OVERHEAD_SERIES`], how long its
//! previous `record` call took (plus the optional sleep), timestamped in
//! milliseconds. The driving thread adds a resource-usage snapshot every
//! `rusage_interval` until the run is over.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use samplog_recorder::runtime::wall_clock_nanos;
use samplog_recorder::{Logger, RusageStats};
use tracing::{debug, info};

/// Series holding per-call overhead samples.
pub const OVERHEAD_SERIES: u64 = 1;

const NANOS_PER_MILLI: u64 = 1_000_000;

#[derive(Debug, Clone)]
pub struct MeasureOptions {
    pub threads: usize,
    pub sleep: Duration,
    pub duration: Duration,
    pub rusage_interval: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeasureReport {
    pub calls: u64,
    /// Sum of every measured call, sleep included.
    pub overhead_nanos: u64,
    pub rusage_snapshots: u64,
}

impl MeasureReport {
    pub fn mean_overhead_nanos(&self) -> f64 {
        if self.calls == 0 {
            return 0.0;
        }
        self.overhead_nanos as f64 / self.calls as f64
    }
}

/// Hammer `logger` from `options.threads` threads for `options.duration`.
pub fn run(logger: &Logger, options: &MeasureOptions) -> Result<MeasureReport> {
    let done = AtomicBool::new(false);
    let deadline = Instant::now() + options.duration;

    info!(
        threads = options.threads,
        sleep_us = options.sleep.as_micros() as u64,
        duration_secs = options.duration.as_secs_f64(),
        "Starting measurement"
    );

    thread::scope(|scope| {
        let producers: Vec<_> = (0..options.threads)
            .map(|_| scope.spawn(|| produce(logger, options.sleep, &done)))
            .collect();

        let snapshots = sample_rusage(logger, deadline, options.rusage_interval);
        done.store(true, Ordering::Release);

        let mut calls = 0;
        let mut overhead_nanos = 0u64;
        let mut producer_error = None;
        for producer in producers {
            match producer.join() {
                Ok(Ok((n, overhead))) => {
                    calls += n;
                    overhead_nanos = overhead_nanos.saturating_add(overhead);
                }
                Ok(Err(e)) => {
                    producer_error.get_or_insert(e);
                }
                Err(_) => {
                    producer_error.get_or_insert_with(|| anyhow!("producer thread panicked"));
                }
            }
        }
        let rusage_snapshots = snapshots?;
        if let Some(e) = producer_error {
            return Err(e);
        }

        let report = MeasureReport {
            calls,
            overhead_nanos,
            rusage_snapshots,
        };
        info!(calls = report.calls, snapshots = report.rusage_snapshots, "Measurement finished");
        Ok(report)
    })
}

/// Returns the number of calls made and their summed overhead.
fn produce(logger: &Logger, sleep: Duration, done: &AtomicBool) -> Result<(u64, u64)> {
    let mut timestamp = wall_clock_nanos() / NANOS_PER_MILLI;
    let mut overhead = 1;
    let mut calls = 0;
    let mut total = 0u64;

    while !done.load(Ordering::Acquire) {
        let start = wall_clock_nanos();
        if !sleep.is_zero() {
            thread::sleep(sleep);
        }
        logger
            .record(OVERHEAD_SERIES, timestamp, overhead)
            .context("recording overhead sample")?;
        let end = wall_clock_nanos();

        timestamp = end / NANOS_PER_MILLI;
        overhead = end.saturating_sub(start);
        total = total.saturating_add(overhead);
        calls += 1;
    }

    debug!(calls, "Producer stopped");
    Ok((calls, total))
}

fn sample_rusage(logger: &Logger, deadline: Instant, interval: Duration) -> Result<u64> {
    let mut snapshots = 0;
    loop {
        let stats = RusageStats::collect().context("collecting resource usage")?;
        logger
            .record_rusage(wall_clock_nanos() / NANOS_PER_MILLI, &stats)
            .context("recording resource usage")?;
        snapshots += 1;

        let now = Instant::now();
        if now >= deadline {
            return Ok(snapshots);
        }
        thread::sleep(interval.min(deadline - now));
    }
}
