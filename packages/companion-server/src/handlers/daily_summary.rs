//! `daily_summary`: reads the user's last 24h of activity logs,
//! summarizes them via `LLMClient`, and schedules a `send_chat_message`
//! follow-up to deliver the result (§4.9 `daily_summary_planner`).

use chrono::Duration;
use scheduler_core::{parse_payload, Handler, HandlerError, ScheduleRequest};
use serde::Deserialize;

use crate::ctx::HandlerCtx;

#[derive(Debug, Deserialize)]
struct DailySummaryPayload {
    user: String,
}

pub struct DailySummaryHandler;

#[async_trait::async_trait]
impl Handler<HandlerCtx> for DailySummaryHandler {
    fn job_type(&self) -> &'static str {
        "daily_summary"
    }

    async fn run(&self, payload: serde_json::Value, ctx: &HandlerCtx) -> Result<(), HandlerError> {
        let payload: DailySummaryPayload = parse_payload(&payload)?;

        let now = ctx.clock.now();
        let since = now - Duration::hours(24);
        let logs = ctx
            .log_store
            .recent_logs(&payload.user, since)
            .await
            .map_err(HandlerError::Retryable)?;

        let logs_text = logs
            .iter()
            .map(|entry| entry.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let summary = ctx
            .llm_client
            .summarize(&logs_text)
            .await
            .map_err(HandlerError::Retryable)?;

        ctx.schedule
            .schedule(ScheduleRequest::new(
                "send_chat_message",
                serde_json::json!({ "user": payload.user, "text": summary }),
                now,
            ))
            .await
            .map_err(|err| HandlerError::Retryable(anyhow::anyhow!(err)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_log_store_still_produces_a_summary() {
        let handler = DailySummaryHandler;
        let ctx = crate::testsupport::test_ctx();
        let result = handler
            .run(serde_json::json!({"user": "u1"}), &ctx)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn missing_user_is_a_validation_failure() {
        let handler = DailySummaryHandler;
        let ctx = crate::testsupport::test_ctx();
        let result = handler.run(serde_json::json!({}), &ctx).await;
        assert!(matches!(result, Err(HandlerError::Validation(_))));
    }
}
