//! `HandlerCtx`: the concrete dispatch context handlers receive (§6.2).
//!
//! Grounded on the teacher's `ServerDeps`/`ServerKernel` shape — a
//! plain struct of named `Arc<dyn Trait>` fields constructed once at
//! startup and cloned cheaply into every handler invocation.

use std::sync::Arc;

use scheduler_core::{Clock, ErrorReporter, ScheduleApi};

use crate::collaborators::{ChatClient, LLMClient, LogStore, UserSettingsStore};

/// Everything a registered handler's `run` may need, per spec.md §6.2:
/// `Clock`, `Schedule`, `ChatClient`, `LogStore`, `UserSettingsStore`,
/// `LLMClient`, `ErrorReporter`.
#[derive(Clone)]
pub struct HandlerCtx {
    pub clock: Arc<dyn Clock>,
    pub schedule: Arc<dyn ScheduleApi>,
    pub chat_client: Arc<dyn ChatClient>,
    pub log_store: Arc<dyn LogStore>,
    pub user_settings: Arc<dyn UserSettingsStore>,
    pub llm_client: Arc<dyn LLMClient>,
    pub error_reporter: Arc<dyn ErrorReporter>,
}

impl HandlerCtx {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        clock: Arc<dyn Clock>,
        schedule: Arc<dyn ScheduleApi>,
        chat_client: Arc<dyn ChatClient>,
        log_store: Arc<dyn LogStore>,
        user_settings: Arc<dyn UserSettingsStore>,
        llm_client: Arc<dyn LLMClient>,
        error_reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            clock,
            schedule,
            chat_client,
            log_store,
            user_settings,
            llm_client,
            error_reporter,
        }
    }
}
