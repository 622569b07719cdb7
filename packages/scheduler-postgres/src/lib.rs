//! scheduler-postgres: a Postgres-backed wide-column key-value store
//! implementing the `scheduler-core` storage ports.
//!
//! A single table, `scheduler_items`, addressed by `(partition_key,
//! sort_key)` with a JSONB `attributes` column, backs the `JobStore`,
//! `DeduplicationIndex`, and `SingletonLock` ports (§3.2, §5 — "the Dedup
//! table and Job table are strictly append/update... and must support
//! atomic conditional writes on single items"). Every mutation here is a
//! single conditional `UPDATE ... WHERE <precondition>` or `INSERT ...
//! ON CONFLICT DO NOTHING`; `rows_affected()` is the CAS primitive the
//! spec's conditional-write model asks for.

pub mod dedup;
pub mod items;
pub mod job_store;
pub mod lock;

pub use dedup::PgDeduplicationIndex;
pub use job_store::PgJobStore;
pub use lock::PgSingletonLock;

/// Embedded migrations for the `scheduler_items` table (§3.2, §6.5). Run
/// at process startup via `MIGRATOR.run(&pool)`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
