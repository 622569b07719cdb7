//! Shared `HandlerCtx` builder for handler unit tests. Not part of the
//! public API — only compiled under `#[cfg(test)]`.

use std::sync::Arc;

use chrono::Utc;
use scheduler_core::testing::{InMemoryDedupIndex, InMemoryJobStore};
use scheduler_core::{FrozenClock, NullErrorReporter};

use crate::collaborators::{ConfiguredUserSettingsStore, EchoLLMClient, EmptyLogStore, LoggingChatClient};
use crate::ctx::HandlerCtx;
use crate::handlers::known_job_types;
use crate::schedule_api::DefaultScheduleApi;

pub fn test_ctx() -> HandlerCtx {
    let clock = FrozenClock::new(Utc::now());
    HandlerCtx::new(
        clock.clone(),
        Arc::new(DefaultScheduleApi::new(
            Arc::new(InMemoryJobStore::new()),
            Arc::new(InMemoryDedupIndex::new()),
            clock,
            known_job_types(),
        )),
        Arc::new(LoggingChatClient),
        Arc::new(EmptyLogStore),
        Arc::new(ConfiguredUserSettingsStore::new(vec![], chrono_tz::UTC)),
        Arc::new(EchoLLMClient),
        Arc::new(NullErrorReporter),
    )
}
