//! Shared process wiring (§6.3): builds the Postgres pool and the
//! concrete adapters every binary needs from a loaded `Config`.
//!
//! Grounded on the teacher's `ServerDeps`-construction block in
//! `bin/server.rs` — one function that turns `Config` plus a `PgPool`
//! into the set of `Arc<dyn Trait>` collaborators the rest of the
//! process is built from.

use std::sync::Arc;

use anyhow::{Context, Result};
use scheduler_core::{Clock, DeduplicationIndex, ErrorReporter, JobStore, ScheduleApi, SingletonLock, SystemClock};
use scheduler_postgres::{PgDeduplicationIndex, PgJobStore, PgSingletonLock, MIGRATOR};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::collaborators::{ConfiguredUserSettingsStore, EchoLLMClient, LoggingChatClient, UserSettingsStore};
use crate::ctx::HandlerCtx;
use crate::error_reporter::TracingErrorReporter;
use crate::handlers::known_job_types;
use crate::schedule_api::DefaultScheduleApi;
use crate::Config;

/// Everything a binary needs to build `Worker`, `CronPlanner`,
/// `Leadership`, and the HTTP `AppState` without repeating the wiring.
pub struct Adapters {
    pub pool: PgPool,
    pub job_store: Arc<dyn JobStore>,
    pub dedup_index: Arc<dyn DeduplicationIndex>,
    pub singleton_lock: Arc<dyn SingletonLock>,
    pub clock: Arc<dyn Clock>,
    pub schedule: Arc<dyn ScheduleApi>,
    pub error_reporter: Arc<dyn ErrorReporter>,
    pub user_settings: Arc<dyn UserSettingsStore>,
    pub ctx: HandlerCtx,
}

pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,companion_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

pub async fn connect(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    MIGRATOR.run(&pool).await.context("failed to run migrations")?;
    Ok(pool)
}

pub fn build_adapters(config: &Config, pool: PgPool) -> Adapters {
    let job_store: Arc<dyn JobStore> = Arc::new(PgJobStore::new(pool.clone()));
    let dedup_index: Arc<dyn DeduplicationIndex> = Arc::new(PgDeduplicationIndex::new(pool.clone()));
    let singleton_lock: Arc<dyn SingletonLock> = Arc::new(PgSingletonLock::new(pool.clone()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let error_reporter: Arc<dyn ErrorReporter> = Arc::new(TracingErrorReporter);

    let default_timezone = chrono_tz::UTC;
    let user_settings: Arc<dyn UserSettingsStore> = Arc::new(ConfiguredUserSettingsStore::new(
        config.daily_summary_users.clone(),
        default_timezone,
    ));

    let schedule: Arc<dyn ScheduleApi> = Arc::new(DefaultScheduleApi::new(
        job_store.clone(),
        dedup_index.clone(),
        clock.clone(),
        known_job_types(),
    ));

    let ctx = HandlerCtx::new(
        clock.clone(),
        schedule.clone(),
        Arc::new(LoggingChatClient),
        Arc::new(crate::collaborators::EmptyLogStore),
        user_settings.clone(),
        Arc::new(EchoLLMClient),
        error_reporter.clone(),
    );

    Adapters {
        pool,
        job_store,
        dedup_index,
        singleton_lock,
        clock,
        schedule,
        error_reporter,
        user_settings,
        ctx,
    }
}

/// Waits for Ctrl+C or, on Unix, SIGTERM — whichever comes first.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let mut signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        signal.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
