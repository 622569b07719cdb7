//! `TracingErrorReporter`: the concrete `ErrorReporter` (C10) used by
//! every binary. Emits structured `tracing` events carrying the same
//! `{job_id, job_type, attempts, payload}` context a real external
//! tracker (e.g. Sentry) integration would forward (§4.5, §7).

use scheduler_core::{ErrorReporter, JobFailureContext};

#[derive(Debug, Default)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report_job_failure(&self, context: &JobFailureContext, error: &anyhow::Error) {
        tracing::error!(
            job_id = %context.job_id,
            job_type = %context.job_type,
            attempts = context.attempts,
            payload = %context.payload,
            error = %error,
            "job handler failed"
        );
    }

    fn report_worker_panic(&self, message: &str) {
        tracing::error!(message, "worker loop caught an unexpected panic");
    }
}
