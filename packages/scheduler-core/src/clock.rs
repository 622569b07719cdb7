//! Injectable time source.
//!
//! Every component that reasons about "now" (lease expiry, retry backoff,
//! dedup buckets, cron triggers) takes a `Arc<dyn Clock>` instead of calling
//! `Utc::now()` directly, so tests can run a simulated clock without sleeping.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Monotonic + wall-time source.
pub trait Clock: Send + Sync {
    /// Current wall-clock instant, UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock for tests. Starts at a fixed instant and only moves
/// when [`FrozenClock::advance`] or [`FrozenClock::set`] is called.
#[derive(Debug)]
pub struct FrozenClock {
    micros_since_epoch: AtomicI64,
}

impl FrozenClock {
    pub fn new(start: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            micros_since_epoch: AtomicI64::new(
                start.timestamp_micros(),
            ),
        })
    }

    pub fn advance(&self, delta: chrono::Duration) {
        self.micros_since_epoch
            .fetch_add(delta.num_microseconds().unwrap_or(0), Ordering::SeqCst);
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.micros_since_epoch
            .store(at.timestamp_micros(), Ordering::SeqCst);
    }
}

impl Clock for FrozenClock {
    fn now(&self) -> DateTime<Utc> {
        let micros = self.micros_since_epoch.load(Ordering::SeqCst);
        DateTime::from_timestamp_micros(micros).expect("frozen clock holds a valid instant")
    }
}
