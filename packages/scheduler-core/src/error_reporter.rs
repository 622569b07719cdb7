//! [`ErrorReporter`] port: a structured failure surface to an external
//! tracker (§4.5, §4.7, C10). scheduler-core defines the shape of what
//! gets reported; the application wires it to an actual tracker (Sentry,
//! a log sink, a test double).

use serde::Serialize;
use uuid::Uuid;

/// Context attached to every handler failure report (§4.5: "report to
/// ErrorReporter with `{job_id, job_type, attempts, payload}` context").
#[derive(Debug, Clone, Serialize)]
pub struct JobFailureContext {
    pub job_id: Uuid,
    pub job_type: String,
    pub attempts: u32,
    pub payload: serde_json::Value,
}

pub trait ErrorReporter: Send + Sync {
    /// Reports a handler failure. Called on every occurrence, whether the
    /// job will be retried or dead-lettered (§4.5).
    fn report_job_failure(&self, context: &JobFailureContext, error: &anyhow::Error);

    /// Reports an unexpected panic caught at the worker-loop boundary
    /// (§7 propagation policy): the worker never crashes on these, it
    /// reports and keeps polling after a short sleep.
    fn report_worker_panic(&self, message: &str);
}

/// Reports nothing; used in tests that don't care about the reporting
/// side-channel.
#[derive(Debug, Default)]
pub struct NullErrorReporter;

impl ErrorReporter for NullErrorReporter {
    fn report_job_failure(&self, _context: &JobFailureContext, _error: &anyhow::Error) {}
    fn report_worker_panic(&self, _message: &str) {}
}
