//! In-memory fakes for `JobStore`, `DeduplicationIndex`, and
//! `SingletonLock` (C18). These let `companion-server`'s Worker and
//! CronPlanner tests run fast and without a database, mirroring the
//! shape of the real Postgres adapters' conditional-write semantics.
//!
//! Grounded on the teacher's `kernel::jobs::testing`/`TestJobManager`
//! pattern: a `Mutex`-guarded in-memory map standing in for the real
//! store, used only behind `#[cfg(test)]` or a `testing` feature
//! elsewhere in the workspace.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    ClaimOutcome, DeduplicationIndex, JobRecord, JobStatus, JobStore, RenewOutcome,
    ReserveOutcome, StoreError, StoreResult,
};

/// An in-memory `JobStore`. Not safe to share across processes — only
/// for single-process tests.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<HashMap<Uuid, JobRecord>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: snapshot every stored record.
    pub fn all(&self) -> Vec<JobRecord> {
        self.jobs.lock().expect("lock poisoned").values().cloned().collect()
    }
}

#[async_trait::async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: &JobRecord) -> StoreResult<()> {
        let mut jobs = self.jobs.lock().expect("lock poisoned");
        if jobs.contains_key(&job.job_id) {
            return Err(StoreError::AlreadyExists(job.job_id));
        }
        jobs.insert(job.job_id, job.clone());
        Ok(())
    }

    async fn query_due(&self, now: DateTime<Utc>, limit: u32) -> StoreResult<Vec<JobRecord>> {
        let jobs = self.jobs.lock().expect("lock poisoned");
        let mut due: Vec<JobRecord> = jobs
            .values()
            .filter(|j| j.scheduled_for <= now && j.is_due(now))
            .cloned()
            .collect();
        due.sort_by(|a, b| {
            (a.scheduled_for, a.job_id).cmp(&(b.scheduled_for, b.job_id))
        });
        due.truncate(limit as usize);
        Ok(due)
    }

    async fn claim(
        &self,
        job_id: Uuid,
        worker_id: &str,
        lease: Duration,
        now: DateTime<Utc>,
    ) -> StoreResult<ClaimOutcome> {
        let mut jobs = self.jobs.lock().expect("lock poisoned");
        let Some(job) = jobs.get_mut(&job_id) else {
            return Ok(ClaimOutcome::LostRace);
        };
        let eligible = job.status == JobStatus::Pending
            && job.lock_expires_at.map(|exp| exp < now).unwrap_or(true);
        if !eligible {
            return Ok(ClaimOutcome::LostRace);
        }
        job.status = JobStatus::InProgress;
        job.locked_by = Some(worker_id.to_string());
        job.lock_expires_at = Some(now + lease);
        job.attempts += 1;
        Ok(ClaimOutcome::Claimed)
    }

    async fn renew_lease(
        &self,
        job_id: Uuid,
        worker_id: &str,
        lease: Duration,
        now: DateTime<Utc>,
    ) -> StoreResult<RenewOutcome> {
        let mut jobs = self.jobs.lock().expect("lock poisoned");
        let Some(job) = jobs.get_mut(&job_id) else {
            return Ok(RenewOutcome::Lost);
        };
        if job.status != JobStatus::InProgress || job.locked_by.as_deref() != Some(worker_id) {
            return Ok(RenewOutcome::Lost);
        }
        job.lock_expires_at = Some(now + lease);
        Ok(RenewOutcome::Renewed)
    }

    async fn mark_completed(&self, job_id: Uuid, worker_id: &str, now: DateTime<Utc>) -> StoreResult<bool> {
        let mut jobs = self.jobs.lock().expect("lock poisoned");
        let Some(job) = jobs.get_mut(&job_id) else {
            return Ok(false);
        };
        if job.locked_by.as_deref() != Some(worker_id) {
            return Ok(false);
        }
        job.status = JobStatus::Completed;
        job.completed_at = Some(now);
        job.locked_by = None;
        job.lock_expires_at = None;
        Ok(true)
    }

    async fn mark_failed_for_retry(
        &self,
        job_id: Uuid,
        worker_id: &str,
        next_run: DateTime<Utc>,
        last_error: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut jobs = self.jobs.lock().expect("lock poisoned");
        let Some(old) = jobs.get(&job_id).cloned() else {
            return Ok(false);
        };
        if old.locked_by.as_deref() != Some(worker_id) {
            return Ok(false);
        }

        let retry = JobRecord {
            job_id: Uuid::new_v4(),
            job_type: old.job_type.clone(),
            payload: old.payload.clone(),
            scheduled_for: next_run,
            status: JobStatus::Pending,
            attempts: old.attempts,
            locked_by: None,
            lock_expires_at: None,
            last_error: Some(last_error.to_string()),
            logical_id: old.logical_id.clone(),
            root_job_id: old.root_job_id,
            created_at: now,
            completed_at: None,
        };

        if let Some(job) = jobs.get_mut(&job_id) {
            job.status = JobStatus::Failed;
            job.last_error = Some(last_error.to_string());
            job.locked_by = None;
            job.lock_expires_at = None;
        }
        jobs.insert(retry.job_id, retry);
        Ok(true)
    }

    async fn mark_dead_letter(&self, job_id: Uuid, worker_id: &str, last_error: &str) -> StoreResult<bool> {
        let mut jobs = self.jobs.lock().expect("lock poisoned");
        let Some(job) = jobs.get_mut(&job_id) else {
            return Ok(false);
        };
        if job.locked_by.as_deref() != Some(worker_id) {
            return Ok(false);
        }
        job.status = JobStatus::DeadLetter;
        job.last_error = Some(last_error.to_string());
        job.locked_by = None;
        job.lock_expires_at = None;
        Ok(true)
    }

    async fn cancel(&self, job_id: Uuid) -> StoreResult<bool> {
        let mut jobs = self.jobs.lock().expect("lock poisoned");
        let Some(job) = jobs.get_mut(&job_id) else {
            return Ok(false);
        };
        if job.status != JobStatus::Pending {
            return Ok(false);
        }
        job.status = JobStatus::Cancelled;
        Ok(true)
    }

    async fn find(&self, job_id: Uuid) -> StoreResult<Option<JobRecord>> {
        Ok(self.jobs.lock().expect("lock poisoned").get(&job_id).cloned())
    }
}

/// An in-memory `DeduplicationIndex`.
#[derive(Default)]
pub struct InMemoryDedupIndex {
    reservations: Mutex<HashMap<(String, NaiveDate), Uuid>>,
}

impl InMemoryDedupIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl DeduplicationIndex for InMemoryDedupIndex {
    async fn try_reserve(
        &self,
        logical_id: &str,
        bucket_date: NaiveDate,
        job_ref: Uuid,
    ) -> StoreResult<ReserveOutcome> {
        let mut reservations = self.reservations.lock().expect("lock poisoned");
        let key = (logical_id.to_string(), bucket_date);
        if reservations.contains_key(&key) {
            return Ok(ReserveOutcome::AlreadyReserved);
        }
        reservations.insert(key, job_ref);
        Ok(ReserveOutcome::Reserved)
    }

    async fn find_reservation(
        &self,
        logical_id: &str,
        bucket_date: NaiveDate,
    ) -> StoreResult<Option<Uuid>> {
        let reservations = self.reservations.lock().expect("lock poisoned");
        Ok(reservations.get(&(logical_id.to_string(), bucket_date)).copied())
    }
}

/// An in-memory `SingletonLock`. A single process_id "holds" the lock
/// at a time, gated by `expires_at`, matching the Postgres adapter's
/// conditional-write semantics.
#[derive(Default)]
pub struct InMemorySingletonLock {
    state: Mutex<Option<(String, DateTime<Utc>)>>,
    believed_leader: std::sync::RwLock<Option<String>>,
}

impl InMemorySingletonLock {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl crate::SingletonLock for InMemorySingletonLock {
    async fn acquire(
        &self,
        process_id: &str,
        ttl: Duration,
    ) -> anyhow::Result<crate::AcquireOutcome> {
        use crate::AcquireOutcome;
        let now = Utc::now();
        let mut state = self.state.lock().expect("lock poisoned");
        let available = match &*state {
            None => true,
            Some((_, expires_at)) => *expires_at < now,
        };
        if available {
            *state = Some((process_id.to_string(), now + ttl));
            *self.believed_leader.write().expect("lock poisoned") = Some(process_id.to_string());
            Ok(AcquireOutcome::Acquired)
        } else {
            *self.believed_leader.write().expect("lock poisoned") = None;
            Ok(AcquireOutcome::HeldByOther)
        }
    }

    async fn refresh(
        &self,
        process_id: &str,
        ttl: Duration,
    ) -> anyhow::Result<crate::RefreshOutcome> {
        use crate::RefreshOutcome;
        let mut state = self.state.lock().expect("lock poisoned");
        match &mut *state {
            Some((holder, expires_at)) if holder == process_id => {
                *expires_at = Utc::now() + ttl;
                *self.believed_leader.write().expect("lock poisoned") = Some(process_id.to_string());
                Ok(RefreshOutcome::Refreshed)
            }
            _ => {
                *self.believed_leader.write().expect("lock poisoned") = None;
                Ok(RefreshOutcome::Lost)
            }
        }
    }

    async fn release(&self, process_id: &str) -> anyhow::Result<()> {
        let mut state = self.state.lock().expect("lock poisoned");
        if matches!(&*state, Some((holder, _)) if holder == process_id) {
            *state = None;
        }
        *self.believed_leader.write().expect("lock poisoned") = None;
        Ok(())
    }

    fn is_leader(&self, process_id: &str) -> bool {
        self.believed_leader.read().expect("lock poisoned").as_deref() == Some(process_id)
    }
}
