// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//!
//! samplog-measure — records the recorder's own overhead.
//!
//! Runs a number of producer threads against one logger for a fixed time.
//! Each thread records how long its previous `record` call took (series 1,
//! timestamp in milliseconds, value in nanoseconds); the main thread adds
//! process resource usage at a fixed interval (one second by default).

mod measure;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use samplog_recorder::scale::{autoscale, bucket_size, validate_bucket_units};
use samplog_recorder::{Logger, RecorderConfig, SyncMode, TimeUnit};

use measure::MeasureOptions;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "samplog-measure",
    version = VERSION,
    about = "Measure the per-call overhead of the samplog recorder"
)]
struct Cli {
    /// Number of producer threads.
    #[arg(short, long, default_value_t = 1)]
    threads: usize,

    /// Microseconds each producer sleeps before every record call.
    #[arg(short, long = "sleep-us", default_value_t = 0)]
    sleep_us: u64,

    /// How long to run, in seconds.
    #[arg(short, long = "duration-secs", default_value_t = 60)]
    duration_secs: u64,

    /// Output file.
    #[arg(short, long, default_value = "benchmark.dat")]
    output: PathBuf,

    /// When the log is fsynced.
    #[arg(long = "sync-mode", value_enum, default_value_t = SyncModeArg::OnClose)]
    sync_mode: SyncModeArg,

    /// How often to record resource usage, e.g. `1s`, `250ms`. Must be a
    /// whole number of milliseconds.
    #[arg(long = "rusage-interval", default_value = "1s")]
    rusage_interval: String,

    /// Interval for `--sync-mode periodic`, in milliseconds.
    #[arg(long = "sync-interval-ms", default_value_t = 1000)]
    sync_interval_ms: u64,

    /// JSON recorder configuration. `--output` and `--sync-mode` are
    /// ignored when this is given.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SyncModeArg {
    Fsync,
    OnClose,
    Async,
    Periodic,
}

impl Cli {
    fn recorder_config(&self) -> Result<RecorderConfig> {
        if let Some(path) = &self.config {
            return RecorderConfig::from_json_file(path)
                .with_context(|| format!("loading recorder config {}", path.display()));
        }

        let sync_mode = match self.sync_mode {
            SyncModeArg::Fsync => SyncMode::Fsync,
            SyncModeArg::OnClose => SyncMode::OnClose,
            SyncModeArg::Async => SyncMode::Async,
            SyncModeArg::Periodic => SyncMode::Periodic(Duration::from_millis(self.sync_interval_ms)),
        };
        Ok(RecorderConfig::new(&self.output).with_sync_mode(sync_mode))
    }

    fn measure_options(&self) -> Result<MeasureOptions> {
        let interval = bucket_size(&self.rusage_interval)
            .with_context(|| format!("bad --rusage-interval {:?}", self.rusage_interval))?;
        // Resource usage is timestamped in milliseconds like everything else.
        if !validate_bucket_units(interval, TimeUnit::Milliseconds.nanos()) {
            bail!(
                "--rusage-interval {:?} is not a whole number of milliseconds",
                self.rusage_interval
            );
        }

        Ok(MeasureOptions {
            threads: self.threads.max(1),
            sleep: Duration::from_micros(self.sleep_us),
            duration: Duration::from_secs(self.duration_secs),
            rusage_interval: Duration::from_nanos(interval),
        })
    }
}

/// Render a nanosecond quantity in the largest unit it spans, e.g. `1.25ms`.
fn format_nanos(nanos: f64) -> String {
    let unit = autoscale(nanos);
    format!("{:.2}{}", nanos / unit.nanos() as f64, unit)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let options = cli.measure_options()?;
    let config = cli.recorder_config()?;
    let output = config.output.clone();

    samplog_recorder::init();
    let logger = Logger::open(config)
        .with_context(|| format!("could not create data logger at {}", output.display()))?;

    let result = measure::run(&logger, &options);
    let closed = logger.close().context("could not flush data logger");
    samplog_recorder::teardown();

    let report = result?;
    closed?;

    tracing::info!(
        calls = report.calls,
        mean_overhead = %format_nanos(report.mean_overhead_nanos()),
        rusage_snapshots = report.rusage_snapshots,
        output = %output.display(),
        "Wrote overhead samples"
    );
    Ok(())
}
