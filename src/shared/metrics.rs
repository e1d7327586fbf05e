use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

const UNSET_TS: u64 = 0;

/// Success/failure counter pair with last-occurrence timestamps.
#[derive(Debug, Default)]
pub struct OutcomeMetric {
    ok: AtomicU64,
    err: AtomicU64,
    last_ok_ms: AtomicU64,
    last_err_ms: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutcomeSnapshot {
    pub successes: u64,
    pub failures: u64,
    pub last_success_ms: Option<u64>,
    pub last_failure_ms: Option<u64>,
}

impl OutcomeMetric {
    pub const fn new() -> Self {
        Self {
            ok: AtomicU64::new(0),
            err: AtomicU64::new(0),
            last_ok_ms: AtomicU64::new(UNSET_TS),
            last_err_ms: AtomicU64::new(UNSET_TS),
        }
    }

    pub fn record_success(&self) {
        self.ok.fetch_add(1, Ordering::Relaxed);
        self.last_ok_ms.store(current_unix_ms(), Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.err.fetch_add(1, Ordering::Relaxed);
        self.last_err_ms.store(current_unix_ms(), Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> OutcomeSnapshot {
        OutcomeSnapshot {
            successes: self.ok.load(Ordering::Relaxed),
            failures: self.err.load(Ordering::Relaxed),
            last_success_ms: nonzero_ts(self.last_ok_ms.load(Ordering::Relaxed)),
            last_failure_ms: nonzero_ts(self.last_err_ms.load(Ordering::Relaxed)),
        }
    }
}

/// Plain event counter.
#[derive(Debug, Default)]
pub struct EventCounter(AtomicU64);

impl EventCounter {
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn incr(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[inline]
pub fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(UNSET_TS)
}

#[inline]
fn nonzero_ts(value: u64) -> Option<u64> {
    if value == UNSET_TS {
        None
    } else {
        Some(value)
    }
}
