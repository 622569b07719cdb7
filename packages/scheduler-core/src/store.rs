//! [`JobStore`]: persistence over the key-value backend (§4.1).
//!
//! Every mutation here is a conditional write: the store encodes the
//! relevant precondition (expected status, expected lock owner) in the
//! query itself and reports back whether the condition held, rather than
//! reading, checking in the application, then writing. That's what makes
//! concurrent claims and lease renewals safe without an external lock.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::record::JobRecord;

/// Outcome of [`JobStore::claim`]: either this caller now owns the lease, or
/// another worker claimed it first (§4.1, §7 item 2 — expected and benign).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed,
    LostRace,
}

/// Outcome of [`JobStore::renew_lease`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewOutcome {
    Renewed,
    Lost,
}

/// Errors a [`JobStore`] implementation surfaces. Everything else (lost
/// races, stale leases) is communicated through the outcome enums above,
/// not through `Err` — only genuinely exceptional conditions are errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// §7 item 1: the backing store itself failed (timeout, throttling, I/O).
    /// Callers retry bounded in-process; persistent failure propagates here.
    #[error("transient store error: {0}")]
    Transient(#[source] anyhow::Error),

    /// §4.1 Insert: a record already existed at the chosen partition+sort.
    /// The sort key embeds a fresh job_id, so this indicates a bug, not a
    /// race — it is reported as a hard error rather than folded into a
    /// `ClaimOutcome`-style enum.
    #[error("job record already exists for job_id {0}")]
    AlreadyExists(Uuid),

    #[error("job {0} not found")]
    NotFound(Uuid),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence port for job records (§4.1).
///
/// Implementations own the backing store's conditional-write semantics;
/// this crate only specifies the contract each operation must honor.
#[async_trait::async_trait]
pub trait JobStore: Send + Sync {
    /// Writes `job` with `status=pending`. Fails with `AlreadyExists` if a
    /// record already occupies that partition+sort.
    async fn insert(&self, job: &JobRecord) -> StoreResult<()>;

    /// Returns up to `limit` records with `scheduled_for <= now`, status
    /// `pending`, and an unset or expired lease — ordered ascending by the
    /// sort key (earliest `scheduled_for` first, ties broken by job_id).
    async fn query_due(&self, now: DateTime<Utc>, limit: u32) -> StoreResult<Vec<JobRecord>>;

    /// Conditional claim: succeeds only if the record is still `pending`
    /// with no live lease. On success the record becomes `in_progress`
    /// with `locked_by=worker_id`, `lock_expires_at=now+lease`, and
    /// `attempts` incremented by one.
    async fn claim(
        &self,
        job_id: Uuid,
        worker_id: &str,
        lease: Duration,
        now: DateTime<Utc>,
    ) -> StoreResult<ClaimOutcome>;

    /// Extends `lock_expires_at` for a job this worker currently holds.
    /// Condition: `locked_by == worker_id AND status == in_progress`.
    async fn renew_lease(
        &self,
        job_id: Uuid,
        worker_id: &str,
        lease: Duration,
        now: DateTime<Utc>,
    ) -> StoreResult<RenewOutcome>;

    /// Marks the job `completed`. Condition: `locked_by == worker_id`.
    /// A no-op (not an error) if the condition no longer holds — the lease
    /// was lost and another worker now owns the outcome.
    async fn mark_completed(&self, job_id: Uuid, worker_id: &str, now: DateTime<Utc>) -> StoreResult<bool>;

    /// Schedules a retry. Per the chosen resolution of §9's open question,
    /// this writes a brand-new [`JobRecord`] (fresh job_id, fresh sort key,
    /// same `root_job_id` and `logical_id`) and marks the current record
    /// `failed` (superseded). Condition on the current record: `locked_by
    /// == worker_id`. Returns `false` if the condition no longer held, in
    /// which case no new record is written.
    async fn mark_failed_for_retry(
        &self,
        job_id: Uuid,
        worker_id: &str,
        next_run: DateTime<Utc>,
        last_error: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Marks the job `dead_letter`. Condition: `locked_by == worker_id`.
    async fn mark_dead_letter(&self, job_id: Uuid, worker_id: &str, last_error: &str) -> StoreResult<bool>;

    /// Marks a `pending` job `cancelled` (§3.4 admin action). No-op if the
    /// job is already terminal or in progress.
    async fn cancel(&self, job_id: Uuid) -> StoreResult<bool>;

    async fn find(&self, job_id: Uuid) -> StoreResult<Option<JobRecord>>;
}
