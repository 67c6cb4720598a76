// Источники времени для проверки срока действия секретов

use std::sync::atomic::{AtomicU64, Ordering};

/// Timestamp in seconds since the UNIX epoch.
pub type Timestamp = u64;

/// Host clock consulted when secrets are read.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock that never goes backwards.
///
/// A step back of the system time is clamped to the last value observed, so
/// a secret that has expired once stays expired.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicU64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let wall = chrono::Utc::now().timestamp().max(0) as u64;
        let previous = self.last.fetch_max(wall, Ordering::SeqCst);
        previous.max(wall)
    }
}

/// Manually driven clock for tests and deterministic hosts.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }

    /// Moves the clock forward to `ts`; earlier values are ignored.
    pub fn set(&self, ts: Timestamp) {
        self.now.fetch_max(ts, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
