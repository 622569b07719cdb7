//! Postgres-backed [`SingletonLock`] (§4.6).

use chrono::{Duration, Utc};
use scheduler_core::lock::{AcquireOutcome, RefreshOutcome};
use scheduler_core::SingletonLock;
use sqlx::PgPool;
use std::sync::RwLock;

pub struct PgSingletonLock {
    pool: PgPool,
    /// Locally cached belief about who holds the lock, refreshed by every
    /// `acquire`/`refresh` call. [`SingletonLock::is_leader`] is a sync,
    /// non-blocking read so [`crate::cron::CronPlanner`] (companion-server)
    /// can check it before every tick without an await point.
    believed_leader: RwLock<Option<String>>,
}

impl PgSingletonLock {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            believed_leader: RwLock::new(None),
        }
    }

    fn set_believed_leader(&self, process_id: Option<&str>) {
        *self.believed_leader.write().expect("lock poisoned") = process_id.map(str::to_owned);
    }
}

#[async_trait::async_trait]
impl SingletonLock for PgSingletonLock {
    async fn acquire(&self, process_id: &str, ttl: Duration) -> anyhow::Result<AcquireOutcome> {
        let now = Utc::now();
        let expires_at = now + ttl;
        let attributes = serde_json::json!({
            "process_id": process_id,
            "acquired_at": now,
            "expires_at": expires_at,
            "instance_info": process_id,
        });

        let key = scheduler_core::keys::lock_key();
        let result = sqlx::query(
            r#"
            INSERT INTO scheduler_items (partition_key, sort_key, attributes)
            VALUES ($1, $2, $3)
            ON CONFLICT (partition_key, sort_key) DO UPDATE
            SET attributes = EXCLUDED.attributes, updated_at = now()
            WHERE (scheduler_items.attributes ->> 'expires_at')::timestamptz < $4
            "#,
        )
        .bind(&key.partition)
        .bind(&key.sort)
        .bind(attributes)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            self.set_believed_leader(Some(process_id));
            Ok(AcquireOutcome::Acquired)
        } else {
            self.set_believed_leader(None);
            Ok(AcquireOutcome::HeldByOther)
        }
    }

    async fn refresh(&self, process_id: &str, ttl: Duration) -> anyhow::Result<RefreshOutcome> {
        let expires_at = Utc::now() + ttl;
        let key = scheduler_core::keys::lock_key();
        let result = sqlx::query(
            r#"
            UPDATE scheduler_items
            SET attributes = attributes || jsonb_build_object('expires_at', $3::timestamptz),
                updated_at = now()
            WHERE partition_key = $1 AND sort_key = $2 AND attributes ->> 'process_id' = $4
            "#,
        )
        .bind(&key.partition)
        .bind(&key.sort)
        .bind(expires_at)
        .bind(process_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            self.set_believed_leader(Some(process_id));
            Ok(RefreshOutcome::Refreshed)
        } else {
            self.set_believed_leader(None);
            Ok(RefreshOutcome::Lost)
        }
    }

    async fn release(&self, process_id: &str) -> anyhow::Result<()> {
        let key = scheduler_core::keys::lock_key();
        sqlx::query(
            r#"DELETE FROM scheduler_items WHERE partition_key = $1 AND sort_key = $2 AND attributes ->> 'process_id' = $3"#,
        )
        .bind(&key.partition)
        .bind(&key.sort)
        .bind(process_id)
        .execute(&self.pool)
        .await?;
        self.set_believed_leader(None);
        Ok(())
    }

    fn is_leader(&self, process_id: &str) -> bool {
        self.believed_leader
            .read()
            .expect("lock poisoned")
            .as_deref()
            == Some(process_id)
    }
}
