//! scheduler-core: interfaces for a distributed, lease-based scheduled-job
//! queue.
//!
//! This crate owns interfaces and policy that is genuinely shared across
//! any backing store: the job record and its key encoding, the retry
//! backoff law, handler dispatch, and the ports ([`store::JobStore`],
//! [`dedup::DeduplicationIndex`], [`lock::SingletonLock`],
//! [`error_reporter::ErrorReporter`]) a concrete backend must implement.
//! Policy that depends on a specific backend (claim SQL, transaction
//! boundaries) belongs in that backend's crate, not here.

pub mod clock;
pub mod dedup;
pub mod error_reporter;
pub mod keys;
pub mod lock;
pub mod record;
pub mod registry;
pub mod retry;
pub mod schedule;
pub mod store;

/// In-memory fakes of every storage port (C18), for workspace crates'
/// unit tests that exercise Worker/CronPlanner logic without a database.
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use clock::{Clock, FrozenClock, SystemClock};
pub use dedup::{DeduplicationIndex, ReserveOutcome};
pub use error_reporter::{ErrorReporter, JobFailureContext, NullErrorReporter};
pub use lock::{AcquireOutcome, RefreshOutcome, SingletonLock};
pub use record::{JobRecord, JobStatus};
pub use registry::{parse_payload, DispatchError, Handler, HandlerError, HandlerRegistry};
pub use retry::{RetryDecision, RetryPolicy};
pub use schedule::{ScheduleApi, ScheduleError, ScheduleOutcome, ScheduleRequest};
pub use store::{ClaimOutcome, JobStore, RenewOutcome, StoreError, StoreResult};
