//! Shared test infrastructure: one Postgres container, started once and
//! reused across every test in this crate, with migrations run once on
//! first use. Grounded on the teacher's
//! `packages/server/tests/common/harness.rs` (`SharedTestInfra` +
//! `tokio::sync::OnceCell`) pattern, trimmed down to the single
//! container this crate's ports actually need.

use sqlx::PgPool;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct SharedInfra {
    pool: PgPool,
    // Keeping the container alive for the process lifetime; dropping it
    // would tear down the database underneath `pool`.
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedInfra> = OnceCell::const_new();

async fn init() -> SharedInfra {
    let postgres = Postgres::default()
        .start()
        .await
        .expect("failed to start postgres container");

    let host = postgres.get_host().await.expect("container host");
    let port = postgres
        .get_host_port_ipv4(5432)
        .await
        .expect("container port");
    let url = format!("postgres://postgres:postgres@{host}:{port}/postgres");

    let pool = PgPool::connect(&url)
        .await
        .expect("failed to connect to postgres container");

    scheduler_postgres::MIGRATOR
        .run(&pool)
        .await
        .expect("failed to run scheduler-postgres migrations");

    SharedInfra {
        pool,
        _postgres: postgres,
    }
}

/// A pool into the shared container's database. Tests run concurrently
/// against this same database, so each test must scope its rows with a
/// fresh `logical_id`/`job_id` rather than truncating shared state.
pub async fn pool() -> PgPool {
    SHARED_INFRA.get_or_init(init).await.pool.clone()
}
