//! `scheduler`: the all-in-one process (§6.3) — leadership loop, cron
//! planner, and a worker, all in one binary. Suited to a single-node
//! deployment; `job-worker` and `web` let the worker and HTTP surface
//! scale independently of the leader election.

use std::sync::Arc;
use std::time::Duration;

use companion_server::cron::CronPlanner;
use companion_server::leadership::Leadership;
use companion_server::worker::{Worker, WorkerConfig};
use companion_server::{startup, Config};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!(error = %err, "scheduler exited with an error");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    startup::init_tracing();
    tracing::info!("starting scheduler process");

    let config = Config::from_env()?;
    let pool = startup::connect(&config).await?;
    let adapters = startup::build_adapters(&config, pool);

    let process_id = format!("scheduler-{}", uuid::Uuid::new_v4());
    let shutdown = CancellationToken::new();

    let leadership = Leadership::new(
        adapters.singleton_lock.clone(),
        process_id.clone(),
        config.singleton_ttl_seconds,
        Duration::from_secs(config.singleton_refresh_seconds as u64),
    );
    let leadership_shutdown = shutdown.clone();
    let leadership_handle = tokio::spawn(leadership.run(leadership_shutdown));

    let planner = Arc::new(CronPlanner::new(
        adapters.schedule.clone(),
        adapters.singleton_lock.clone(),
        adapters.clock.clone(),
        adapters.user_settings.clone(),
        process_id,
        config.enable_heartbeat,
        config.work_sampling_prompts_per_day,
    ));
    let mut cron_scheduler = planner.run().await?;

    let worker = Arc::new(Worker::new(
        adapters.job_store.clone(),
        Arc::new(companion_server::handlers::build_registry()),
        scheduler_core::RetryPolicy::new(
            chrono::Duration::seconds(config.base_delay_seconds as i64),
            config.max_attempts,
        ),
        adapters.clock.clone(),
        adapters.error_reporter.clone(),
        adapters.ctx.clone(),
        WorkerConfig::from_config(&config),
    ));
    let worker_shutdown = shutdown.clone();
    let worker_handle = tokio::spawn(worker.run(worker_shutdown));

    startup::shutdown_signal().await;
    tracing::info!("shutdown signal received, stopping scheduler process");
    shutdown.cancel();

    let _ = cron_scheduler.shutdown().await;
    let _ = worker_handle.await;
    let _ = leadership_handle.await;

    Ok(())
}
