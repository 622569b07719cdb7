//! [`SingletonLock`]: a process-wide, TTL'd lock gating cron-driven
//! planners so only one node runs them at a time (§4.6).

use chrono::Duration;

/// Outcome of [`SingletonLock::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    Acquired,
    HeldByOther,
}

/// Outcome of [`SingletonLock::refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed,
    Lost,
}

/// A distributed mutex over a single well-known key (`system#scheduler` /
/// `lock#main`). Typical usage: a dedicated task acquires, then refreshes
/// on a cadence until shutdown; [`SingletonLock::is_leader`] gates whether
/// cron ticks fire this process.
#[async_trait::async_trait]
pub trait SingletonLock: Send + Sync {
    /// Conditional put: succeeds if the record is absent or its TTL has
    /// expired. On success the caller becomes leader.
    async fn acquire(&self, process_id: &str, ttl: Duration) -> anyhow::Result<AcquireOutcome>;

    /// Conditional update extending `expires_at`. Condition: `process_id`
    /// matches the current holder.
    async fn refresh(&self, process_id: &str, ttl: Duration) -> anyhow::Result<RefreshOutcome>;

    /// Conditional delete. Condition: `process_id` matches the current
    /// holder. A no-op if this process is not (or is no longer) the
    /// holder.
    async fn release(&self, process_id: &str) -> anyhow::Result<()>;

    /// Cheap, cached read of whether `process_id` currently believes it
    /// holds the lock (used by [`crate::cron::CronPlanner`] before every
    /// tick). This reflects local state updated by the refresh loop; it is
    /// not itself a conditional check against the store.
    fn is_leader(&self, process_id: &str) -> bool;
}
