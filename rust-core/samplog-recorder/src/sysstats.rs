// SPDX-License-Identifier: PMPL-1.0-or-later
//
// samplog recorder - Built-in system statistics
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Series ids from 0xffff_0000 up are reserved for counters the recorder can
// collect by itself: process resource usage (getrusage) and block-device
// I/O counters (Linux `stat` files). These counters are stored unscaled;
// only their timestamps go through the logger's time divisor.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::RecorderResult;

/// First reserved series id.
pub const RESERVED_SERIES_BASE: u64 = 0xffff_0000;

pub const SERIES_RU_UTIME: u64 = 0xffff_0000;
pub const SERIES_RU_STIME: u64 = 0xffff_0001;
pub const SERIES_RU_MAXRSS: u64 = 0xffff_0002;
pub const SERIES_RU_IXRSS: u64 = 0xffff_0003;
pub const SERIES_RU_IDRSS: u64 = 0xffff_0004;
pub const SERIES_RU_ISRSS: u64 = 0xffff_0005;
pub const SERIES_RU_MINFLT: u64 = 0xffff_0006;
pub const SERIES_RU_MAJFLT: u64 = 0xffff_0007;
pub const SERIES_RU_NSWAP: u64 = 0xffff_0008;
pub const SERIES_RU_INBLOCK: u64 = 0xffff_0009;
pub const SERIES_RU_OUBLOCK: u64 = 0xffff_000a;
pub const SERIES_RU_MSGSND: u64 = 0xffff_000b;
pub const SERIES_RU_MSGRCV: u64 = 0xffff_000c;
pub const SERIES_RU_NSIGNALS: u64 = 0xffff_000d;
pub const SERIES_RU_NVCSW: u64 = 0xffff_000e;
pub const SERIES_RU_NIVCSW: u64 = 0xffff_000f;

pub const SERIES_IO_READ_IOS: u64 = 0xffff_0010;
pub const SERIES_IO_READ_MERGES: u64 = 0xffff_0011;
pub const SERIES_IO_READ_BYTES: u64 = 0xffff_0012;
pub const SERIES_IO_READ_TICKS: u64 = 0xffff_0013;
pub const SERIES_IO_WRITE_IOS: u64 = 0xffff_0014;
pub const SERIES_IO_WRITE_MERGES: u64 = 0xffff_0015;
pub const SERIES_IO_WRITE_BYTES: u64 = 0xffff_0016;
pub const SERIES_IO_WRITE_TICKS: u64 = 0xffff_0017;
pub const SERIES_IO_IN_FLIGHT: u64 = 0xffff_0018;
pub const SERIES_IO_IO_TICKS: u64 = 0xffff_0019;
pub const SERIES_IO_TIME_IN_QUEUE: u64 = 0xffff_001a;

/// Last reserved series id.
pub const RESERVED_SERIES_LAST: u64 = 0xffff_ffff;

/// `true` for ids in the block reserved for built-in counters.
pub fn is_reserved_series(series: u64) -> bool {
    (RESERVED_SERIES_BASE..=RESERVED_SERIES_LAST).contains(&series)
}

// ---------------------------------------------------------------------------
// Resource usage
// ---------------------------------------------------------------------------

/// Snapshot of `getrusage(RUSAGE_SELF)`. CPU times are microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RusageStats {
    pub utime_us: u64,
    pub stime_us: u64,
    pub maxrss: u64,
    pub ixrss: u64,
    pub idrss: u64,
    pub isrss: u64,
    pub minflt: u64,
    pub majflt: u64,
    pub nswap: u64,
    pub inblock: u64,
    pub oublock: u64,
    pub msgsnd: u64,
    pub msgrcv: u64,
    pub nsignals: u64,
    pub nvcsw: u64,
    pub nivcsw: u64,
}

impl RusageStats {
    /// Read the calling process's resource usage.
    #[cfg(unix)]
    pub fn collect() -> RecorderResult<Self> {
        // SAFETY: `rusage` is plain old data, and getrusage only writes
        // into the struct we pass.
        let usage = unsafe {
            let mut usage: libc::rusage = std::mem::zeroed();
            if libc::getrusage(libc::RUSAGE_SELF, &mut usage) != 0 {
                return Err(io::Error::last_os_error().into());
            }
            usage
        };

        let micros = |tv: libc::timeval| {
            (tv.tv_sec as u64)
                .saturating_mul(1_000_000)
                .saturating_add(tv.tv_usec as u64)
        };
        let count = |value: libc::c_long| value.max(0) as u64;

        Ok(Self {
            utime_us: micros(usage.ru_utime),
            stime_us: micros(usage.ru_stime),
            maxrss: count(usage.ru_maxrss),
            ixrss: count(usage.ru_ixrss),
            idrss: count(usage.ru_idrss),
            isrss: count(usage.ru_isrss),
            minflt: count(usage.ru_minflt),
            majflt: count(usage.ru_majflt),
            nswap: count(usage.ru_nswap),
            inblock: count(usage.ru_inblock),
            oublock: count(usage.ru_oublock),
            msgsnd: count(usage.ru_msgsnd),
            msgrcv: count(usage.ru_msgrcv),
            nsignals: count(usage.ru_nsignals),
            nvcsw: count(usage.ru_nvcsw),
            nivcsw: count(usage.ru_nivcsw),
        })
    }

    #[cfg(not(unix))]
    pub fn collect() -> RecorderResult<Self> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "getrusage is unix-only").into())
    }

    /// `(series, value)` pairs in series order.
    pub fn samples(&self) -> [(u64, u64); 16] {
        [
            (SERIES_RU_UTIME, self.utime_us),
            (SERIES_RU_STIME, self.stime_us),
            (SERIES_RU_MAXRSS, self.maxrss),
            (SERIES_RU_IXRSS, self.ixrss),
            (SERIES_RU_IDRSS, self.idrss),
            (SERIES_RU_ISRSS, self.isrss),
            (SERIES_RU_MINFLT, self.minflt),
            (SERIES_RU_MAJFLT, self.majflt),
            (SERIES_RU_NSWAP, self.nswap),
            (SERIES_RU_INBLOCK, self.inblock),
            (SERIES_RU_OUBLOCK, self.oublock),
            (SERIES_RU_MSGSND, self.msgsnd),
            (SERIES_RU_MSGRCV, self.msgrcv),
            (SERIES_RU_NSIGNALS, self.nsignals),
            (SERIES_RU_NVCSW, self.nvcsw),
            (SERIES_RU_NIVCSW, self.nivcsw),
        ]
    }
}

// ---------------------------------------------------------------------------
// Block-device I/O
// ---------------------------------------------------------------------------

/// Size of the sectors the block `stat` file counts in, whatever the
/// device's real sector size.
pub const STAT_SECTOR_SIZE: u64 = 512;

/// The eleven counters of a Linux block device `stat` file, in file order.
/// Sector counts are converted to bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoStats {
    pub read_ios: u64,
    pub read_merges: u64,
    pub read_bytes: u64,
    pub read_ticks: u64,
    pub write_ios: u64,
    pub write_merges: u64,
    pub write_bytes: u64,
    pub write_ticks: u64,
    pub in_flight: u64,
    pub io_ticks: u64,
    pub time_in_queue: u64,
}

impl IoStats {
    /// Parse the contents of a block `stat` file. Newer kernels append
    /// discard and flush counters; anything past the eleventh field is
    /// ignored. The read and write sector fields are stored as bytes.
    pub fn parse(contents: &str) -> RecorderResult<Self> {
        let mut fields = [0u64; 11];
        let mut values = contents.split_whitespace();
        for (index, field) in fields.iter_mut().enumerate() {
            let raw = values.next().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("block stat has {index} fields, expected at least 11"),
                )
            })?;
            *field = raw.parse::<u64>().map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("block stat field {index} ({raw:?}): {e}"),
                )
            })?;
        }

        let [read_ios, read_merges, read_sectors, read_ticks, write_ios, write_merges, write_sectors, write_ticks, in_flight, io_ticks, time_in_queue] =
            fields;
        Ok(Self {
            read_ios,
            read_merges,
            read_bytes: read_sectors.saturating_mul(STAT_SECTOR_SIZE),
            read_ticks,
            write_ios,
            write_merges,
            write_bytes: write_sectors.saturating_mul(STAT_SECTOR_SIZE),
            write_ticks,
            in_flight,
            io_ticks,
            time_in_queue,
        })
    }

    /// Read and parse a block `stat` file.
    pub fn collect(stat_path: impl AsRef<Path>) -> RecorderResult<Self> {
        let contents = fs::read_to_string(stat_path)?;
        Self::parse(&contents)
    }

    /// `(series, value)` pairs in series order.
    pub fn samples(&self) -> [(u64, u64); 11] {
        [
            (SERIES_IO_READ_IOS, self.read_ios),
            (SERIES_IO_READ_MERGES, self.read_merges),
            (SERIES_IO_READ_BYTES, self.read_bytes),
            (SERIES_IO_READ_TICKS, self.read_ticks),
            (SERIES_IO_WRITE_IOS, self.write_ios),
            (SERIES_IO_WRITE_MERGES, self.write_merges),
            (SERIES_IO_WRITE_BYTES, self.write_bytes),
            (SERIES_IO_WRITE_TICKS, self.write_ticks),
            (SERIES_IO_IN_FLIGHT, self.in_flight),
            (SERIES_IO_IO_TICKS, self.io_ticks),
            (SERIES_IO_TIME_IN_QUEUE, self.time_in_queue),
        ]
    }
}

/// The sysfs `stat` file of the block device that holds `path`.
#[cfg(target_os = "linux")]
pub fn block_stat_path(path: impl AsRef<Path>) -> RecorderResult<PathBuf> {
    use std::os::unix::fs::MetadataExt;

    let dev = fs::metadata(path)?.dev();
    let (major, minor) = split_dev(dev);
    let stat = PathBuf::from(format!("/sys/dev/block/{major}:{minor}/stat"));
    if !stat.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no block device stat at {}", stat.display()),
        )
        .into());
    }
    Ok(stat)
}

#[cfg(not(target_os = "linux"))]
pub fn block_stat_path(_path: impl AsRef<Path>) -> RecorderResult<PathBuf> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "block stats are linux-only").into())
}

/// glibc's encoding of a `dev_t` into major and minor numbers.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn split_dev(dev: u64) -> (u64, u64) {
    let major = ((dev >> 8) & 0xfff) | ((dev >> 32) & 0xffff_f000);
    let minor = (dev & 0xff) | ((dev >> 12) & 0xffff_ff00);
    (major, minor)
}
