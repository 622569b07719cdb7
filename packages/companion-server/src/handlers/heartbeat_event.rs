//! `heartbeat_event`: the job `heartbeat_timed` schedules (§4.9). Exists
//! purely to prove the queue round-trips under load — it only logs.

use scheduler_core::{parse_payload, Handler, HandlerError};
use serde::Deserialize;

use crate::ctx::HandlerCtx;

#[derive(Debug, Deserialize)]
struct HeartbeatPayload {
    uuid: String,
}

pub struct HeartbeatEventHandler;

#[async_trait::async_trait]
impl Handler<HandlerCtx> for HeartbeatEventHandler {
    fn job_type(&self) -> &'static str {
        "heartbeat_event"
    }

    async fn run(&self, payload: serde_json::Value, _ctx: &HandlerCtx) -> Result<(), HandlerError> {
        let payload: HeartbeatPayload = parse_payload(&payload)?;
        tracing::info!(uuid = %payload.uuid, "Heartbeat (executed)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scheduler_core::DispatchError;

    fn ctx() -> HandlerCtx {
        crate::testsupport::test_ctx()
    }

    #[tokio::test]
    async fn valid_payload_succeeds() {
        let handler = HeartbeatEventHandler;
        let result = handler
            .run(serde_json::json!({"uuid": "abc"}), &ctx())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn missing_uuid_is_a_validation_failure() {
        let handler = HeartbeatEventHandler;
        let result = handler.run(serde_json::json!({}), &ctx()).await;
        assert!(matches!(result, Err(HandlerError::Validation(_))));
        let _ = DispatchError::from(result.unwrap_err());
    }
}
