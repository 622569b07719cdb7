//! [`DeduplicationIndex`]: conditional-write reservation keyed by logical ID
//! and bucket date (§4.2).

use chrono::NaiveDate;
use uuid::Uuid;

use crate::store::StoreResult;

/// Result of [`DeduplicationIndex::try_reserve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    Reserved,
    AlreadyReserved,
}

/// Conditional reservation over `(dedup#<logical_id>, <bucket_date>)`. The
/// core never deletes a reservation once written (invariant 5) — the
/// pointed-to job may reach any terminal state, but the entry itself
/// outlives it.
#[async_trait::async_trait]
pub trait DeduplicationIndex: Send + Sync {
    /// Succeeds only if no record exists at `(logical_id, bucket_date)`.
    /// `job_ref` is the job record's own `job_id`, stored so later callers
    /// can check whether the reservation's target still exists.
    async fn try_reserve(
        &self,
        logical_id: &str,
        bucket_date: NaiveDate,
        job_ref: Uuid,
    ) -> StoreResult<ReserveOutcome>;

    /// Returns the job_id a reservation points at, if one exists.
    async fn find_reservation(
        &self,
        logical_id: &str,
        bucket_date: NaiveDate,
    ) -> StoreResult<Option<Uuid>>;
}
