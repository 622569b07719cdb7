//! Companion Memory scheduler application.
//!
//! Wires the storage-agnostic `scheduler-core` types and the
//! Postgres-backed `scheduler-postgres` adapters into a runnable
//! service: typed job handlers, the poll/claim/execute worker loop, the
//! cron-style planner gated by the singleton lock, and the three
//! process binaries under `src/bin/`.

pub mod collaborators;
pub mod config;
pub mod cron;
pub mod ctx;
pub mod error_reporter;
pub mod handlers;
pub mod http;
pub mod leadership;
pub mod schedule_api;
pub mod startup;
#[cfg(test)]
mod testsupport;
pub mod worker;

pub use config::Config;
pub use ctx::HandlerCtx;
