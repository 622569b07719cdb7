//! Postgres-backed [`DeduplicationIndex`] (§4.2).

use chrono::{NaiveDate, Utc};
use scheduler_core::{DeduplicationIndex, ReserveOutcome, StoreError, StoreResult};
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct PgDeduplicationIndex {
    pool: PgPool,
}

impl PgDeduplicationIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DeduplicationIndex for PgDeduplicationIndex {
    async fn try_reserve(
        &self,
        logical_id: &str,
        bucket_date: NaiveDate,
        job_ref: Uuid,
    ) -> StoreResult<ReserveOutcome> {
        let attributes = serde_json::json!({
            "job_ref": job_ref,
            "reserved_at": Utc::now(),
        });

        let result = sqlx::query(
            r#"
            INSERT INTO scheduler_items (partition_key, sort_key, attributes)
            VALUES ($1, $2, $3)
            ON CONFLICT (partition_key, sort_key) DO NOTHING
            "#,
        )
        .bind(scheduler_core::keys::dedup_partition(logical_id))
        .bind(bucket_date.to_string())
        .bind(attributes)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Transient(e.into()))?;

        Ok(if result.rows_affected() == 1 {
            ReserveOutcome::Reserved
        } else {
            ReserveOutcome::AlreadyReserved
        })
    }

    async fn find_reservation(
        &self,
        logical_id: &str,
        bucket_date: NaiveDate,
    ) -> StoreResult<Option<Uuid>> {
        let row = sqlx::query(
            r#"SELECT attributes FROM scheduler_items WHERE partition_key = $1 AND sort_key = $2"#,
        )
        .bind(scheduler_core::keys::dedup_partition(logical_id))
        .bind(bucket_date.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Transient(e.into()))?;

        let Some(row) = row else { return Ok(None) };
        let attributes: serde_json::Value = row.try_get("attributes").map_err(|e| StoreError::Transient(e.into()))?;
        let job_ref = attributes
            .get("job_ref")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok());
        Ok(job_ref)
    }
}
