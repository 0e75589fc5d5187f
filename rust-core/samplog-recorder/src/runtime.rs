// SPDX-License-Identifier: PMPL-1.0-or-later
//
// samplog recorder - Process-wide state
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// One lazily-created state block per process: the monotonic clock anchor,
// the init/teardown phase, and a registry of loggers that are still open so
// that `teardown()` can close them at process exit. Loggers call `init()`
// themselves when they open, so explicit initialization is optional.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::logger::LoggerCore;

// ---------------------------------------------------------------------------
// Clocks
// ---------------------------------------------------------------------------

/// Where `record_now` takes its timestamp from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockSource {
    /// Nanoseconds since the Unix epoch.
    #[default]
    Wall,
    /// Nanoseconds since the process anchor; never goes backwards.
    Monotonic,
}

impl ClockSource {
    pub fn now_nanos(self) -> u64 {
        match self {
            ClockSource::Wall => wall_clock_nanos(),
            ClockSource::Monotonic => monotonic_nanos(),
        }
    }
}

static ANCHOR: OnceLock<Instant> = OnceLock::new();

fn anchor() -> Instant {
    *ANCHOR.get_or_init(Instant::now)
}

/// Nanoseconds elapsed since the process anchor was taken (at `init()` or
/// the first clock read, whichever came first).
pub fn monotonic_nanos() -> u64 {
    u64::try_from(anchor().elapsed().as_nanos()).unwrap_or(u64::MAX)
}

/// Nanoseconds since the Unix epoch, or zero if the system clock is set
/// before it.
pub fn wall_clock_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|since| u64::try_from(since.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Init / teardown
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Ready,
    TornDown,
}

struct RuntimeState {
    phase: Phase,
    loggers: HashMap<u64, Weak<LoggerCore>>,
}

static STATE: OnceLock<Mutex<RuntimeState>> = OnceLock::new();
static NEXT_LOGGER_ID: AtomicU64 = AtomicU64::new(1);

fn state() -> &'static Mutex<RuntimeState> {
    STATE.get_or_init(|| {
        Mutex::new(RuntimeState {
            phase: Phase::Uninitialized,
            loggers: HashMap::new(),
        })
    })
}

/// Prepare the process-wide state. Repeated calls are no-ops; a call after
/// `teardown()` re-arms the runtime.
pub fn init() {
    let _ = anchor();
    let mut state = state().lock();
    if state.phase != Phase::Ready {
        state.phase = Phase::Ready;
        info!("samplog runtime initialized");
    }
}

/// Close every logger that is still open and mark the runtime torn down.
///
/// Returns how many loggers this call closed. Close failures are logged,
/// not returned: at process exit there is no caller left to act on them.
/// A second call finds nothing to do and returns zero.
pub fn teardown() -> usize {
    let open: Vec<Arc<LoggerCore>> = {
        let mut state = state().lock();
        if state.phase != Phase::Ready {
            return 0;
        }
        state.phase = Phase::TornDown;
        state
            .loggers
            .drain()
            .filter_map(|(_, logger)| logger.upgrade())
            .collect()
    };

    let mut closed = 0;
    for logger in open {
        if logger.is_closed() {
            continue;
        }
        if let Err(e) = logger.close() {
            error!(path = %logger.path().display(), error = %e, "Failed to close logger at teardown");
        }
        closed += 1;
    }

    info!(closed, "samplog runtime torn down");
    closed
}

/// `true` between `init()` and `teardown()`.
pub fn is_initialized() -> bool {
    STATE
        .get()
        .map(|state| state.lock().phase == Phase::Ready)
        .unwrap_or(false)
}

/// Number of registered loggers that have not been closed yet.
pub fn open_loggers() -> usize {
    STATE
        .get()
        .map(|state| {
            state
                .lock()
                .loggers
                .values()
                .filter(|logger| logger.strong_count() > 0)
                .count()
        })
        .unwrap_or(0)
}

pub(crate) fn next_logger_id() -> u64 {
    NEXT_LOGGER_ID.fetch_add(1, Ordering::Relaxed)
}

pub(crate) fn register(id: u64, logger: &Arc<LoggerCore>) {
    init();
    state().lock().loggers.insert(id, Arc::downgrade(logger));
}

pub(crate) fn deregister(id: u64) {
    if let Some(state) = STATE.get() {
        state.lock().loggers.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_never_goes_backwards() {
        let first = monotonic_nanos();
        let second = monotonic_nanos();
        assert!(second >= first);
    }

    #[test]
    fn test_wall_clock_is_after_2020() {
        // 2020-01-01T00:00:00Z in nanoseconds.
        assert!(wall_clock_nanos() > 1_577_836_800_000_000_000);
    }

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
        assert!(is_initialized());
    }

    #[test]
    fn test_logger_ids_are_unique() {
        let a = next_logger_id();
        let b = next_logger_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_clock_source_serde() {
        assert_eq!(serde_json::to_string(&ClockSource::Monotonic).unwrap(), "\"monotonic\"");
        assert_eq!(ClockSource::default(), ClockSource::Wall);
    }
}
