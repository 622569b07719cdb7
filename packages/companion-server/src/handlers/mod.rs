//! Registered job handlers (§4.4) implementing `scheduler_core::Handler<HandlerCtx>`.
//!
//! Each handler validates its payload via `scheduler_core::parse_payload`
//! first, then does its work, per the "validate then invoke" split in
//! §4.4. None of these talk to a real chat platform, log store, or LLM —
//! those collaborators are out of scope (§1) and are stood in for by
//! `crate::collaborators`' logging/echo implementations, wired through
//! `ctx` the same way a real implementation would be.

mod daily_summary;
mod heartbeat_event;
mod send_chat_message;
mod user_sync;
mod work_sampling_prompt;

pub use daily_summary::DailySummaryHandler;
pub use heartbeat_event::HeartbeatEventHandler;
pub use send_chat_message::SendChatMessageHandler;
pub use user_sync::UserSyncHandler;
pub use work_sampling_prompt::WorkSamplingPromptHandler;

use std::sync::Arc;

use scheduler_core::HandlerRegistry;

use crate::ctx::HandlerCtx;

/// Builds the process-wide registry with every handler this binary
/// knows how to run. Called once at startup in each of the three
/// binaries (§6.3) — registration is immutable thereafter.
pub fn build_registry() -> HandlerRegistry<HandlerCtx> {
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(DailySummaryHandler));
    registry.register(Arc::new(HeartbeatEventHandler));
    registry.register(Arc::new(SendChatMessageHandler));
    registry.register(Arc::new(UserSyncHandler));
    registry.register(Arc::new(WorkSamplingPromptHandler));
    registry
}

/// Every `job_type` a handler above answers to, for
/// `DefaultScheduleApi::new`'s `known_job_types` — kept alongside
/// `build_registry` since the two lists must never drift apart.
pub fn known_job_types() -> Vec<&'static str> {
    vec![
        "daily_summary",
        "heartbeat_event",
        "send_chat_message",
        "user_sync",
        "work_sampling_prompt",
    ]
}
