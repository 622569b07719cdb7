//! Exponential-backoff retry policy (§4.3).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// `base_delay` and `max_attempts` for the backoff law used by every job
/// type. The policy is process-wide configuration (§6.4), not per-job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::seconds(60),
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_attempts,
        }
    }

    /// `attempts` counts dispatch attempts made so far (1 after the first
    /// failed attempt). Retrying stops once `attempts` reaches the cap.
    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// `Delay(attempts) = base_delay * 2^(attempts - 1)`, with the exponent
    /// capped at `max_attempts - 1` so a misconfigured high attempt count
    /// can't overflow the duration.
    pub fn delay(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(self.max_attempts.saturating_sub(1));
        self.base_delay * 2i32.pow(exponent)
    }

    pub fn next_run(&self, now: DateTime<Utc>, attempts: u32) -> DateTime<Utc> {
        now + self.delay(attempts)
    }
}

/// What the Worker's failure path should do after consulting the policy
/// and the kind of error the handler raised (§4.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Schedule a fresh attempt at `next_run`.
    RetryAt { next_run: DateTime<Utc> },
    /// Exceeded `max_attempts`, or the failure was a permanent validation
    /// error: move the job to `dead_letter` without retrying.
    DeadLetter,
}

impl RetryPolicy {
    /// Decides retry vs. dead-letter for a handler failure that is itself
    /// retryable (validation failures always dead-letter regardless of
    /// this policy — see [`crate::registry::Dispatcher`]).
    pub fn decide(&self, now: DateTime<Utc>, attempts: u32) -> RetryDecision {
        if self.should_retry(attempts) {
            RetryDecision::RetryAt {
                next_run: self.next_run(now, attempts),
            }
        } else {
            RetryDecision::DeadLetter
        }
    }
}
