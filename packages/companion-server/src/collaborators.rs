//! External collaborator ports (§1 "Out of scope", §6.2 `ctx`).
//!
//! These are INFRASTRUCTURE traits only, mirroring the teacher's
//! `Base*` port pattern (`kernel::traits`): the core scheduler consumes
//! them through `ctx` without knowing or caring what backs them. The
//! real chat platform, log store, and LLM client are explicitly out of
//! scope for this crate (spec.md §1) — what's here is the interface
//! plus a minimal concrete implementation sufficient to run the
//! process binaries end to end in a development environment.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

// =============================================================================
// ChatClient (Infrastructure — pushes results back to the user)
// =============================================================================

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends a message to a user on the chat platform.
    async fn send_message(&self, user: &str, text: &str) -> Result<()>;
}

/// Logs the message instead of sending it. Stands in for the real
/// chat-platform client spec.md scopes out.
#[derive(Debug, Default)]
pub struct LoggingChatClient;

#[async_trait]
impl ChatClient for LoggingChatClient {
    async fn send_message(&self, user: &str, text: &str) -> Result<()> {
        tracing::info!(user, text, "chat message sent (logging stub)");
        Ok(())
    }
}

// =============================================================================
// LogStore (Infrastructure — the user's ingested activity logs)
// =============================================================================

/// A single ingested activity-log entry, as read back by summary handlers.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub text: String,
}

#[async_trait]
pub trait LogStore: Send + Sync {
    /// Returns activity logs for `user` at or after `since`, ascending.
    async fn recent_logs(&self, user: &str, since: DateTime<Utc>) -> Result<Vec<LogEntry>>;
}

/// Always returns no logs. Stands in for the real log store spec.md
/// scopes out; a `daily_summary` handler run against this produces an
/// empty-day summary rather than failing, which is the correct
/// idempotent behavior when there is nothing to summarize.
#[derive(Debug, Default)]
pub struct EmptyLogStore;

#[async_trait]
impl LogStore for EmptyLogStore {
    async fn recent_logs(&self, _user: &str, _since: DateTime<Utc>) -> Result<Vec<LogEntry>> {
        Ok(Vec::new())
    }
}

// =============================================================================
// UserSettingsStore (Infrastructure — per-user timezone and roster)
// =============================================================================

#[async_trait]
pub trait UserSettingsStore: Send + Sync {
    /// IANA timezone for `user`, used by the daily-summary and
    /// work-sampling planners to convert local-clock triggers to UTC.
    async fn timezone(&self, user: &str) -> Result<Tz>;

    /// Every user the planners should consider. Used by `user_sync` to
    /// enumerate its per-user refresh jobs.
    async fn known_users(&self) -> Result<Vec<String>>;
}

/// Reads the known-user roster from configuration (`DAILY_SUMMARY_USERS`)
/// and assumes every user is on a single configured default timezone.
/// Stands in for a real per-user settings table.
pub struct ConfiguredUserSettingsStore {
    users: Vec<String>,
    default_timezone: Tz,
}

impl ConfiguredUserSettingsStore {
    pub fn new(users: Vec<String>, default_timezone: Tz) -> Self {
        Self {
            users,
            default_timezone,
        }
    }
}

#[async_trait]
impl UserSettingsStore for ConfiguredUserSettingsStore {
    async fn timezone(&self, _user: &str) -> Result<Tz> {
        Ok(self.default_timezone)
    }

    async fn known_users(&self) -> Result<Vec<String>> {
        Ok(self.users.clone())
    }
}

// =============================================================================
// LLMClient (Infrastructure — summarization calls)
// =============================================================================

#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Summarizes `logs_text` into a short message for the user.
    async fn summarize(&self, logs_text: &str) -> Result<String>;
}

/// Returns a canned summary without calling out anywhere. Stands in for
/// the real LLM client spec.md scopes out.
#[derive(Debug, Default)]
pub struct EchoLLMClient;

#[async_trait]
impl LLMClient for EchoLLMClient {
    async fn summarize(&self, logs_text: &str) -> Result<String> {
        if logs_text.trim().is_empty() {
            Ok("No activity logged today.".to_string())
        } else {
            Ok(format!("Summary: {logs_text}"))
        }
    }
}
