//! `job-worker`: runs only `Worker::run` (§6.3). No `SingletonLock`
//! acquisition — any number of these may run concurrently against the
//! same database, each claiming whatever batch of due jobs it can.

use std::sync::Arc;

use companion_server::worker::{Worker, WorkerConfig};
use companion_server::{startup, Config};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!(error = %err, "job-worker exited with an error");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    startup::init_tracing();
    tracing::info!("starting job-worker process");

    let config = Config::from_env()?;
    let pool = startup::connect(&config).await?;
    let adapters = startup::build_adapters(&config, pool);

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

    let shutdown = CancellationToken::new();
    let worker_shutdown = shutdown.clone();
    let worker_handle = tokio::spawn(worker.run(worker_shutdown));

    startup::shutdown_signal().await;
    tracing::info!("shutdown signal received, stopping job-worker process");
    shutdown.cancel();
    let _ = worker_handle.await;

    Ok(())
}
