//! [`ScheduleApi`]: the single entry point request handlers, the CLI, and
//! cron planners use to enqueue work (§6.1, C11).

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Outcome of a [`ScheduleApi::schedule`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// A new job record was inserted.
    Scheduled { job_id: Uuid },
    /// `logical_id` was supplied and a reservation already existed for its
    /// bucket; this is not an error (§6.1).
    Deduplicated { existing_job_id: Option<Uuid> },
}

/// §7 item 5: fatal on the emit path — the caller gets an error and
/// nothing is persisted.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("unknown job type: {0}")]
    UnknownJobType(String),

    #[error("malformed logical id: {0}")]
    MalformedLogicalId(String),

    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
}

/// Input to [`ScheduleApi::schedule`].
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleRequest {
    pub job_type: String,
    pub payload: serde_json::Value,
    pub when: DateTime<Utc>,
    pub logical_id: Option<String>,
    /// Dedup bucket date. Defaults to `when`'s UTC calendar date when the
    /// caller supplies a `logical_id` but no explicit bucket.
    pub bucket: Option<NaiveDate>,
}

impl ScheduleRequest {
    pub fn new(job_type: impl Into<String>, payload: serde_json::Value, when: DateTime<Utc>) -> Self {
        Self {
            job_type: job_type.into(),
            payload,
            when,
            logical_id: None,
            bucket: None,
        }
    }

    pub fn with_logical_id(mut self, logical_id: impl Into<String>) -> Self {
        self.logical_id = Some(logical_id.into());
        self
    }

    pub fn with_bucket(mut self, bucket: NaiveDate) -> Self {
        self.bucket = Some(bucket);
        self
    }

    pub fn effective_bucket(&self) -> NaiveDate {
        self.bucket.unwrap_or_else(|| self.when.date_naive())
    }
}

#[async_trait::async_trait]
pub trait ScheduleApi: Send + Sync {
    async fn schedule(&self, request: ScheduleRequest) -> Result<ScheduleOutcome, ScheduleError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn effective_bucket_defaults_to_when_date() {
        let when = Utc.with_ymd_and_hms(2025, 7, 14, 7, 0, 0).unwrap();
        let req = ScheduleRequest::new("daily_summary", serde_json::json!({}), when)
            .with_logical_id("daily_summary:u1");
        assert_eq!(req.effective_bucket(), when.date_naive());
    }

    #[test]
    fn effective_bucket_honors_explicit_override() {
        let when = Utc.with_ymd_and_hms(2025, 7, 14, 7, 0, 0).unwrap();
        let bucket = NaiveDate::from_ymd_opt(2025, 7, 13).unwrap();
        let req = ScheduleRequest::new("daily_summary", serde_json::json!({}), when)
            .with_bucket(bucket);
        assert_eq!(req.effective_bucket(), bucket);
    }
}
