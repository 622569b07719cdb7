//! Postgres-backed [`JobStore`]. Every mutation is a single `UPDATE ...
//! WHERE <precondition>` statement; `rows_affected()` tells us whether the
//! condition held, which is the CAS primitive the spec asks for (§4.1).

use chrono::{DateTime, Duration, Utc};
use scheduler_core::{ClaimOutcome, JobRecord, JobStore, RenewOutcome, StoreError, StoreResult};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::items::job_record_from_row;

pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn transient(err: sqlx::Error) -> StoreError {
        StoreError::Transient(err.into())
    }
}

fn job_sort_key(job: &JobRecord) -> String {
    scheduler_core::keys::job_sort_key(job.scheduled_for, job.job_id)
}

#[async_trait::async_trait]
impl JobStore for PgJobStore {
    async fn insert(&self, job: &JobRecord) -> StoreResult<()> {
        let attributes = serde_json::to_value(job).expect("JobRecord always serializes");
        let result = sqlx::query(
            r#"
            INSERT INTO scheduler_items (partition_key, sort_key, attributes)
            VALUES ($1, $2, $3)
            ON CONFLICT (partition_key, sort_key) DO NOTHING
            "#,
        )
        .bind(scheduler_core::keys::JOB_PARTITION)
        .bind(job_sort_key(job))
        .bind(attributes)
        .execute(&self.pool)
        .await
        .map_err(Self::transient)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(job.job_id));
        }
        Ok(())
    }

    async fn query_due(&self, now: DateTime<Utc>, limit: u32) -> StoreResult<Vec<JobRecord>> {
        let upper = scheduler_core::keys::job_sort_key_upper_bound(now);
        let rows = sqlx::query(
            r#"
            SELECT attributes FROM scheduler_items
            WHERE partition_key = $1
              AND sort_key <= $2
              AND attributes ->> 'status' = 'pending'
              AND (
                attributes ->> 'lock_expires_at' IS NULL
                OR (attributes ->> 'lock_expires_at')::timestamptz < $3
              )
            ORDER BY sort_key ASC
            LIMIT $4
            "#,
        )
        .bind(scheduler_core::keys::JOB_PARTITION)
        .bind(upper)
        .bind(now)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(Self::transient)?;

        rows.iter()
            .map(|row| job_record_from_row(row).map_err(Self::transient))
            .collect()
    }

    async fn claim(
        &self,
        job_id: Uuid,
        worker_id: &str,
        lease: Duration,
        now: DateTime<Utc>,
    ) -> StoreResult<ClaimOutcome> {
        let lease_expires_at = now + lease;
        let result = sqlx::query(
            r#"
            UPDATE scheduler_items
            SET attributes = attributes || jsonb_build_object(
                    'status', 'in_progress',
                    'locked_by', $2::text,
                    'lock_expires_at', $3::timestamptz,
                    'attempts', COALESCE((attributes ->> 'attempts')::int, 0) + 1
                ),
                updated_at = now()
            WHERE partition_key = 'job'
              AND job_id = $1
              AND attributes ->> 'status' = 'pending'
              AND (
                attributes ->> 'lock_expires_at' IS NULL
                OR (attributes ->> 'lock_expires_at')::timestamptz < $4
              )
            "#,
        )
        .bind(job_id)
        .bind(worker_id)
        .bind(lease_expires_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Self::transient)?;

        Ok(if result.rows_affected() == 1 {
            ClaimOutcome::Claimed
        } else {
            ClaimOutcome::LostRace
        })
    }

    async fn renew_lease(
        &self,
        job_id: Uuid,
        worker_id: &str,
        lease: Duration,
        now: DateTime<Utc>,
    ) -> StoreResult<RenewOutcome> {
        let lease_expires_at = now + lease;
        let result = sqlx::query(
            r#"
            UPDATE scheduler_items
            SET attributes = attributes || jsonb_build_object('lock_expires_at', $2::timestamptz),
                updated_at = now()
            WHERE partition_key = 'job'
              AND job_id = $1
              AND attributes ->> 'locked_by' = $3
              AND attributes ->> 'status' = 'in_progress'
            "#,
        )
        .bind(job_id)
        .bind(lease_expires_at)
        .bind(worker_id)
        .execute(&self.pool)
        .await
        .map_err(Self::transient)?;

        Ok(if result.rows_affected() == 1 {
            RenewOutcome::Renewed
        } else {
            RenewOutcome::Lost
        })
    }

    async fn mark_completed(&self, job_id: Uuid, worker_id: &str, now: DateTime<Utc>) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE scheduler_items
            SET attributes = attributes || jsonb_build_object(
                    'status', 'completed',
                    'completed_at', $2::timestamptz,
                    'locked_by', NULL,
                    'lock_expires_at', NULL
                ),
                updated_at = now()
            WHERE partition_key = 'job'
              AND job_id = $1
              AND attributes ->> 'locked_by' = $3
            "#,
        )
        .bind(job_id)
        .bind(now)
        .bind(worker_id)
        .execute(&self.pool)
        .await
        .map_err(Self::transient)?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_failed_for_retry(
        &self,
        job_id: Uuid,
        worker_id: &str,
        next_run: DateTime<Utc>,
        last_error: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await.map_err(Self::transient)?;

        let superseded = sqlx::query(
            r#"
            UPDATE scheduler_items
            SET attributes = attributes || jsonb_build_object(
                    'status', 'failed',
                    'last_error', $2::text,
                    'locked_by', NULL,
                    'lock_expires_at', NULL
                ),
                updated_at = now()
            WHERE partition_key = 'job'
              AND job_id = $1
              AND attributes ->> 'locked_by' = $3
            RETURNING attributes
            "#,
        )
        .bind(job_id)
        .bind(last_error)
        .bind(worker_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Self::transient)?;

        let Some(row) = superseded else {
            tx.rollback().await.map_err(Self::transient)?;
            return Ok(false);
        };

        let attributes: serde_json::Value = row.try_get("attributes").map_err(Self::transient)?;
        let old: JobRecord = serde_json::from_value(attributes)
            .map_err(|e| StoreError::Transient(e.into()))?;

        let retry = JobRecord {
            job_id: Uuid::now_v7(),
            job_type: old.job_type.clone(),
            payload: old.payload.clone(),
            scheduled_for: next_run,
            status: scheduler_core::JobStatus::Pending,
            attempts: old.attempts,
            locked_by: None,
            lock_expires_at: None,
            last_error: Some(last_error.to_string()),
            logical_id: old.logical_id.clone(),
            root_job_id: old.root_job_id,
            created_at: now,
            completed_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO scheduler_items (partition_key, sort_key, attributes)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(scheduler_core::keys::JOB_PARTITION)
        .bind(job_sort_key(&retry))
        .bind(serde_json::to_value(&retry).expect("JobRecord always serializes"))
        .execute(&mut *tx)
        .await
        .map_err(Self::transient)?;

        tx.commit().await.map_err(Self::transient)?;
        Ok(true)
    }

    async fn mark_dead_letter(&self, job_id: Uuid, worker_id: &str, last_error: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE scheduler_items
            SET attributes = attributes || jsonb_build_object(
                    'status', 'dead_letter',
                    'last_error', $2::text,
                    'locked_by', NULL,
                    'lock_expires_at', NULL
                ),
                updated_at = now()
            WHERE partition_key = 'job'
              AND job_id = $1
              AND attributes ->> 'locked_by' = $3
            "#,
        )
        .bind(job_id)
        .bind(last_error)
        .bind(worker_id)
        .execute(&self.pool)
        .await
        .map_err(Self::transient)?;

        Ok(result.rows_affected() == 1)
    }

    async fn cancel(&self, job_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE scheduler_items
            SET attributes = attributes || jsonb_build_object('status', 'cancelled'),
                updated_at = now()
            WHERE partition_key = 'job'
              AND job_id = $1
              AND attributes ->> 'status' = 'pending'
            "#,
        )
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(Self::transient)?;

        Ok(result.rows_affected() == 1)
    }

    async fn find(&self, job_id: Uuid) -> StoreResult<Option<JobRecord>> {
        let row = sqlx::query(
            r#"SELECT attributes FROM scheduler_items WHERE partition_key = 'job' AND job_id = $1"#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::transient)?;

        row.as_ref()
            .map(job_record_from_row)
            .transpose()
            .map_err(Self::transient)
    }
}
