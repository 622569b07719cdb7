//! Leadership loop (C14): repeatedly acquires and refreshes the
//! `SingletonLock` so exactly one process's `CronPlanner` ticks do
//! anything (§4.6).
//!
//! Grounded on the teacher's `ServerKernel` background-task shape: a
//! single `tokio::spawn`'d loop, cancelled via `tokio_util`'s
//! `CancellationToken` the same way `kernel::jobs::worker` drains its
//! workers on shutdown.

use std::sync::Arc;
use std::time::Duration;

use scheduler_core::{AcquireOutcome, RefreshOutcome, SingletonLock};
use tokio_util::sync::CancellationToken;

pub struct Leadership {
    lock: Arc<dyn SingletonLock>,
    process_id: String,
    ttl: chrono::Duration,
    refresh_interval: Duration,
}

impl Leadership {
    pub fn new(
        lock: Arc<dyn SingletonLock>,
        process_id: String,
        ttl_seconds: u32,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            lock,
            process_id,
            ttl: chrono::Duration::seconds(ttl_seconds as i64),
            refresh_interval,
        }
    }

    /// Runs until `shutdown` is cancelled. While not leader, retries
    /// `acquire` on every tick; while leader, `refresh`es on the same
    /// cadence, falling back to re-acquiring if the refresh is lost.
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(process_id = %self.process_id, "leadership loop starting");
        let mut is_leader = false;

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let tick_result = if is_leader {
                self.lock.refresh(&self.process_id, self.ttl).await
            } else {
                self.lock
                    .acquire(&self.process_id, self.ttl)
                    .await
                    .map(|outcome| match outcome {
                        AcquireOutcome::Acquired => RefreshOutcome::Refreshed,
                        AcquireOutcome::HeldByOther => RefreshOutcome::Lost,
                    })
            };

            match tick_result {
                Ok(RefreshOutcome::Refreshed) => {
                    if !is_leader {
                        tracing::info!(process_id = %self.process_id, "acquired singleton lock, now leader");
                    }
                    is_leader = true;
                }
                Ok(RefreshOutcome::Lost) => {
                    if is_leader {
                        tracing::warn!(process_id = %self.process_id, "lost singleton lock");
                    }
                    is_leader = false;
                }
                Err(err) => {
                    tracing::error!(process_id = %self.process_id, error = %err, "singleton lock tick failed");
                    is_leader = false;
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.refresh_interval) => {}
            }
        }

        if is_leader {
            if let Err(err) = self.lock.release(&self.process_id).await {
                tracing::warn!(process_id = %self.process_id, error = %err, "failed to release singleton lock on shutdown");
            }
        }
        tracing::info!(process_id = %self.process_id, "leadership loop stopped");
    }
}
