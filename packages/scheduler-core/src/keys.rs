//! Partition/sort key encoding for the wide-column backing store.
//!
//! The backing store is a single table keyed by `(partition, sort)` with
//! conditional single-item writes and range scans ordered by `sort`. Every
//! record the scheduler persists — job, dedup reservation, singleton lock —
//! lives in that one table under a different partition scheme. Lexicographic
//! sort-key encoding is what makes `QueryDue` a plain range scan instead of a
//! table scan with a filter.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// A `(partition, sort)` address in the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey {
    pub partition: String,
    pub sort: String,
}

impl StorageKey {
    pub fn new(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: sort.into(),
        }
    }
}

/// Partition literal shared by every job record.
pub const JOB_PARTITION: &str = "job";

/// Fixed-width, microsecond-precision RFC 3339 encoding. Two instants compare
/// the same way lexicographically as they do as `DateTime<Utc>` values, which
/// is the whole point: `sort ≤ scheduled#<now>#~` is a valid range bound.
fn encode_instant(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Builds the sort key for a job record: `scheduled#<instant>#<job_id>`.
///
/// The job_id suffix breaks ties between jobs scheduled for the exact same
/// instant and keeps the key unique even though `scheduled_for` alone is not.
pub fn job_sort_key(scheduled_for: DateTime<Utc>, job_id: Uuid) -> String {
    format!("scheduled#{}#{}", encode_instant(scheduled_for), job_id)
}

/// Upper bound for a `QueryDue(now)` range scan: every job sort key less than
/// or equal to this one has `scheduled_for <= now`.
pub fn job_sort_key_upper_bound(now: DateTime<Utc>) -> String {
    format!("scheduled#{}#~", encode_instant(now))
}

/// Recovers `(scheduled_for, job_id)` from a job sort key. Used by tests and
/// by stores that want to avoid carrying redundant columns.
pub fn parse_job_sort_key(sort: &str) -> Option<(DateTime<Utc>, Uuid)> {
    let rest = sort.strip_prefix("scheduled#")?;
    let (ts, id) = rest.split_once('#')?;
    let at = DateTime::parse_from_rfc3339(ts).ok()?.with_timezone(&Utc);
    let job_id = Uuid::parse_str(id).ok()?;
    Some((at, job_id))
}

/// Partition for a deduplication-index entry: `dedup#<logical_id>`.
pub fn dedup_partition(logical_id: &str) -> String {
    format!("dedup#{logical_id}")
}

/// Partition literal for the singleton scheduler lock.
pub const LOCK_PARTITION: &str = "system#scheduler";
/// Sort literal for the singleton scheduler lock (only one instance exists).
pub const LOCK_SORT: &str = "lock#main";

pub fn lock_key() -> StorageKey {
    StorageKey::new(LOCK_PARTITION, LOCK_SORT)
}
