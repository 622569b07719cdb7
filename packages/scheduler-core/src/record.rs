//! The job record and its lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a job record. See §3.4 for the full transition diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    DeadLetter,
    Cancelled,
}

impl JobStatus {
    /// `completed`, `dead_letter`, and `cancelled` are terminal: a job that
    /// reaches one of them must never transition again (invariant 3).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::DeadLetter | JobStatus::Cancelled
        )
    }
}

/// A typed, persistent job record (§3.1).
///
/// `scheduled_for` and the timestamp embedded in the record's sort key are
/// kept equal for the record's entire life (invariant 1): retries never
/// mutate this record's `scheduled_for` in place, they write a fresh record
/// via [`crate::retry::RetryDecision`] and mark this one superseded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: Uuid,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub scheduled_for: DateTime<Utc>,
    pub status: JobStatus,
    pub attempts: u32,
    pub locked_by: Option<String>,
    pub lock_expires_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Logical ID this record was scheduled under, if any. Carried so a
    /// retry can be created with the same dedup identity as its predecessor.
    pub logical_id: Option<String>,
    /// `job_id` of the first attempt in a retry chain. Equal to `job_id`
    /// for the first attempt.
    pub root_job_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// Builds a brand-new record in the `pending` state with zero attempts,
    /// as produced by [`crate::schedule::ScheduleApi::schedule`].
    pub fn new(
        job_type: impl Into<String>,
        payload: serde_json::Value,
        scheduled_for: DateTime<Utc>,
        logical_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let job_id = Uuid::now_v7();
        Self {
            job_id,
            job_type: job_type.into(),
            payload,
            scheduled_for,
            status: JobStatus::Pending,
            attempts: 0,
            locked_by: None,
            lock_expires_at: None,
            last_error: None,
            logical_id,
            root_job_id: job_id,
            created_at: now,
            completed_at: None,
        }
    }

    /// True when this record is eligible for `QueryDue`: pending, and
    /// either never leased or the lease has expired.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Pending
            && self.lock_expires_at.map(|exp| exp < now).unwrap_or(true)
    }
}
