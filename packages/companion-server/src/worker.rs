//! `Worker` (C7): the poll/claim/execute loop with lease-based mutual
//! exclusion and crash recovery (§4.5).
//!
//! Shaped after the teacher's `kernel::jobs::worker::JobWorker` —
//! a poll loop that claims a batch, spawns one task per claimed job,
//! and waits out in-flight work on shutdown — generalized from a
//! `HashMap`-of-cancellation-tokens tracker to a `Semaphore` (this
//! Worker only needs a concurrency ceiling, not per-job cancellation)
//! and rewired to `scheduler-core`'s CAS-based `JobStore` instead of a
//! `claim_ready` batch call.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use scheduler_core::{
    ClaimOutcome, Clock, ErrorReporter, HandlerRegistry, JobFailureContext, JobStore,
    RenewOutcome, RetryDecision, RetryPolicy,
};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::ctx::HandlerCtx;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: String,
    pub poll_interval: StdDuration,
    pub batch_limit: u32,
    pub lease: Duration,
    pub concurrency: usize,
    pub graceful_timeout: StdDuration,
}

impl WorkerConfig {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            worker_id: format!("worker-{}", Uuid::new_v4()),
            poll_interval: config.poll_interval,
            batch_limit: config.batch_limit,
            lease: Duration::seconds(config.lease_seconds as i64),
            concurrency: config.concurrency,
            graceful_timeout: config.graceful_timeout,
        }
    }
}

pub struct Worker {
    store: Arc<dyn JobStore>,
    registry: Arc<HandlerRegistry<HandlerCtx>>,
    retry_policy: RetryPolicy,
    clock: Arc<dyn Clock>,
    error_reporter: Arc<dyn ErrorReporter>,
    ctx: HandlerCtx,
    config: WorkerConfig,
    in_flight: Arc<Semaphore>,
}

impl Worker {
    pub fn new(
        store: Arc<dyn JobStore>,
        registry: Arc<HandlerRegistry<HandlerCtx>>,
        retry_policy: RetryPolicy,
        clock: Arc<dyn Clock>,
        error_reporter: Arc<dyn ErrorReporter>,
        ctx: HandlerCtx,
        config: WorkerConfig,
    ) -> Self {
        let in_flight = Arc::new(Semaphore::new(config.concurrency));
        Self {
            store,
            registry,
            retry_policy,
            clock,
            error_reporter,
            ctx,
            config,
            in_flight,
        }
    }

    /// Runs the poll loop until `shutdown` is cancelled, then waits up
    /// to `graceful_timeout` for in-flight handlers before returning
    /// (§5 Cancellation & timeouts).
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        tracing::info!(worker_id = %self.config.worker_id, "worker starting");

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            if let Err(err) = self.poll_once().await {
                tracing::error!(error = %err, "worker poll failed, backing off");
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        tracing::info!(worker_id = %self.config.worker_id, "worker draining in-flight handlers");
        let drain = tokio::time::timeout(
            self.config.graceful_timeout,
            // Acquiring every permit proves every in-flight task released
            // its own permit on completion.
            async {
                let _ = self.in_flight.acquire_many(self.config.concurrency as u32).await;
            },
        )
        .await;
        if drain.is_err() {
            tracing::warn!(
                worker_id = %self.config.worker_id,
                "graceful timeout elapsed with handlers still running; their leases will expire"
            );
        }
        tracing::info!(worker_id = %self.config.worker_id, "worker stopped");
    }

    async fn poll_once(&self) -> anyhow::Result<()> {
        let now = self.clock.now();
        let due = self
            .store
            .query_due(now, self.config.batch_limit)
            .await
            .map_err(anyhow::Error::from)?;

        for job in due {
            let Ok(permit) = self.in_flight.clone().try_acquire_owned() else {
                // At capacity; leave the remainder for the next poll tick.
                break;
            };

            let store = self.store.clone();
            let registry = self.registry.clone();
            let retry_policy = self.retry_policy;
            let clock = self.clock.clone();
            let error_reporter = self.error_reporter.clone();
            let ctx = self.ctx.clone();
            let worker_id = self.config.worker_id.clone();
            let lease = self.config.lease;

            tokio::spawn(async move {
                let _permit = permit;
                let join = tokio::spawn(process_job(
                    job.job_id,
                    job.job_type.clone(),
                    job.payload.clone(),
                    job.attempts,
                    store,
                    registry,
                    retry_policy,
                    clock,
                    error_reporter.clone(),
                    ctx,
                    worker_id,
                    lease,
                ))
                .await;

                // §7 propagation policy: a panic inside a handler never
                // crashes the worker loop; `JoinHandle` already turns it
                // into an `Err` we can report and move past.
                if let Err(join_err) = join {
                    let message = panic_message(join_err);
                    error_reporter.report_worker_panic(&message);
                }
            });
        }

        Ok(())
    }
}

fn panic_message(join_err: tokio::task::JoinError) -> String {
    if join_err.is_panic() {
        let panic = join_err.into_panic();
        if let Some(s) = panic.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        }
    } else {
        "task cancelled".to_string()
    }
}

#[allow(clippy::too_many_arguments)]
async fn process_job(
    job_id: Uuid,
    job_type: String,
    payload: serde_json::Value,
    attempts_at_poll: u32,
    store: Arc<dyn JobStore>,
    registry: Arc<HandlerRegistry<HandlerCtx>>,
    retry_policy: RetryPolicy,
    clock: Arc<dyn Clock>,
    error_reporter: Arc<dyn ErrorReporter>,
    ctx: HandlerCtx,
    worker_id: String,
    lease: Duration,
) {
    let now = clock.now();
    let claim = match store.claim(job_id, &worker_id, lease, now).await {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::error!(job_id = %job_id, error = %err, "claim failed");
            return;
        }
    };

    if claim == ClaimOutcome::LostRace {
        // §7 item 2: expected and benign, not an error.
        return;
    }

    let attempts = attempts_at_poll + 1;
    tracing::info!(job_id = %job_id, job_type = %job_type, attempts, "job claimed");

    let renew_shutdown = CancellationToken::new();
    let renew_handle = spawn_lease_renewal(
        store.clone(),
        job_id,
        worker_id.clone(),
        lease,
        clock.clone(),
        renew_shutdown.clone(),
    );

    let dispatch_result = registry.dispatch(&job_type, payload.clone(), &ctx).await;
    renew_shutdown.cancel();
    let _ = renew_handle.await;

    match dispatch_result {
        Ok(()) => {
            let now = clock.now();
            match store.mark_completed(job_id, &worker_id, now).await {
                Ok(true) => tracing::info!(job_id = %job_id, "job completed"),
                Ok(false) => tracing::warn!(job_id = %job_id, "lost lease before completion could be recorded"),
                Err(err) => tracing::error!(job_id = %job_id, error = %err, "mark_completed failed"),
            }
        }
        Err(dispatch_err) => {
            let handler_err = match dispatch_err {
                scheduler_core::DispatchError::UnknownJobType(_) => {
                    // §7 item 5 reaching a worker (e.g. a handler was
                    // removed after deploy): non-retryable.
                    None
                }
                scheduler_core::DispatchError::Handler(err) => Some(err),
            };

            let (is_retryable, err_display): (bool, String) = match &handler_err {
                Some(err) => (err.is_retryable(), err.to_string()),
                None => (false, format!("no handler registered for job type {job_type}")),
            };

            let context = JobFailureContext {
                job_id,
                job_type: job_type.clone(),
                attempts,
                payload,
            };
            error_reporter.report_job_failure(&context, &anyhow::anyhow!(err_display.clone()));

            let now = clock.now();
            let decision = if is_retryable {
                retry_policy.decide(now, attempts)
            } else {
                RetryDecision::DeadLetter
            };

            match decision {
                RetryDecision::RetryAt { next_run } => {
                    match store
                        .mark_failed_for_retry(job_id, &worker_id, next_run, &err_display, now)
                        .await
                    {
                        Ok(true) => tracing::warn!(job_id = %job_id, %next_run, "job failed, retry scheduled"),
                        Ok(false) => tracing::warn!(job_id = %job_id, "lost lease before retry could be recorded"),
                        Err(err) => tracing::error!(job_id = %job_id, error = %err, "mark_failed_for_retry failed"),
                    }
                }
                RetryDecision::DeadLetter => {
                    match store.mark_dead_letter(job_id, &worker_id, &err_display).await {
                        Ok(true) => tracing::error!(job_id = %job_id, attempts, "job dead-lettered"),
                        Ok(false) => tracing::warn!(job_id = %job_id, "lost lease before dead-letter could be recorded"),
                        Err(err) => tracing::error!(job_id = %job_id, error = %err, "mark_dead_letter failed"),
                    }
                }
            }
        }
    }
}

fn spawn_lease_renewal(
    store: Arc<dyn JobStore>,
    job_id: Uuid,
    worker_id: String,
    lease: Duration,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let half_lease = StdDuration::from_secs((lease.num_seconds().max(2) / 2) as u64);
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(half_lease) => {}
            }
            if shutdown.is_cancelled() {
                break;
            }
            let now = clock.now();
            match store.renew_lease(job_id, &worker_id, lease, now).await {
                Ok(RenewOutcome::Renewed) => {}
                Ok(RenewOutcome::Lost) => {
                    tracing::warn!(job_id = %job_id, "lease lost mid-execution; abandoning handler");
                    break;
                }
                Err(err) => {
                    tracing::error!(job_id = %job_id, error = %err, "lease renewal failed");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use scheduler_core::testing::InMemoryJobStore;
    use scheduler_core::{parse_payload, FrozenClock, Handler, HandlerError, NullErrorReporter};
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Greet {
        name: String,
    }

    struct AlwaysOk;

    #[async_trait::async_trait]
    impl Handler<HandlerCtx> for AlwaysOk {
        fn job_type(&self) -> &'static str {
            "greet"
        }

        async fn run(&self, payload: serde_json::Value, _ctx: &HandlerCtx) -> Result<(), HandlerError> {
            let _: Greet = parse_payload(&payload)?;
            Ok(())
        }
    }

    struct AlwaysRetryable;

    #[async_trait::async_trait]
    impl Handler<HandlerCtx> for AlwaysRetryable {
        fn job_type(&self) -> &'static str {
            "flaky"
        }

        async fn run(&self, _payload: serde_json::Value, _ctx: &HandlerCtx) -> Result<(), HandlerError> {
            Err(HandlerError::Retryable(anyhow::anyhow!("transient")))
        }
    }

    fn test_ctx() -> HandlerCtx {
        crate::testsupport::test_ctx()
    }

    #[tokio::test]
    async fn successful_job_is_marked_completed() {
        let store = Arc::new(InMemoryJobStore::new());
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(AlwaysOk));
        let registry = Arc::new(registry);
        let clock = FrozenClock::new(Utc::now());

        let now = clock.now();
        let job = scheduler_core::JobRecord::new("greet", serde_json::json!({"name": "Ada"}), now, None, now);
        store.insert(&job).await.unwrap();

        process_job(
            job.job_id,
            "greet".to_string(),
            job.payload.clone(),
            0,
            store.clone(),
            registry,
            RetryPolicy::default(),
            clock.clone(),
            Arc::new(scheduler_core::NullErrorReporter),
            test_ctx(),
            "w1".to_string(),
            Duration::seconds(60),
        )
        .await;

        let stored = store.find(job.job_id).await.unwrap().unwrap();
        assert_eq!(stored.status, scheduler_core::JobStatus::Completed);
    }

    #[tokio::test]
    async fn retryable_failure_reschedules_with_backoff() {
        let store = Arc::new(InMemoryJobStore::new());
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(AlwaysRetryable));
        let registry = Arc::new(registry);
        let clock = FrozenClock::new(Utc::now());

        let now = clock.now();
        let job = scheduler_core::JobRecord::new("flaky", serde_json::json!({}), now, None, now);
        store.insert(&job).await.unwrap();

        process_job(
            job.job_id,
            "flaky".to_string(),
            job.payload.clone(),
            0,
            store.clone(),
            registry,
            RetryPolicy::default(),
            clock.clone(),
            Arc::new(scheduler_core::NullErrorReporter),
            test_ctx(),
            "w1".to_string(),
            Duration::seconds(60),
        )
        .await;

        let original = store.find(job.job_id).await.unwrap().unwrap();
        assert_eq!(original.status, scheduler_core::JobStatus::Failed);

        let all = store.all();
        let retry = all
            .iter()
            .find(|j| j.job_id != job.job_id)
            .expect("a retry record should have been written");
        assert_eq!(retry.status, scheduler_core::JobStatus::Pending);
        assert_eq!((retry.scheduled_for - now).num_seconds(), 60);
    }

    #[tokio::test]
    async fn validation_failure_dead_letters_without_retry() {
        let store = Arc::new(InMemoryJobStore::new());
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(AlwaysOk));
        let registry = Arc::new(registry);
        let clock = FrozenClock::new(Utc::now());

        let now = clock.now();
        // Missing the required `name` field triggers a validation error.
        let job = scheduler_core::JobRecord::new("greet", serde_json::json!({}), now, None, now);
        store.insert(&job).await.unwrap();

        process_job(
            job.job_id,
            "greet".to_string(),
            job.payload.clone(),
            0,
            store.clone(),
            registry,
            RetryPolicy::default(),
            clock.clone(),
            Arc::new(scheduler_core::NullErrorReporter),
            test_ctx(),
            "w1".to_string(),
            Duration::seconds(60),
        )
        .await;

        let stored = store.find(job.job_id).await.unwrap().unwrap();
        assert_eq!(stored.status, scheduler_core::JobStatus::DeadLetter);
    }
}
