//! `send_chat_message`: delivers a plain text message to a user through
//! `ChatClient`. The simplest possible handler — a thin pass-through
//! that exists so other handlers have a "notify the user" primitive to
//! schedule as a follow-up job rather than calling `ChatClient`
//! directly and risking partial work if the process dies mid-handler.

use scheduler_core::{parse_payload, Handler, HandlerError};
use serde::Deserialize;

use crate::ctx::HandlerCtx;

#[derive(Debug, Deserialize)]
struct SendChatMessagePayload {
    user: String,
    text: String,
}

pub struct SendChatMessageHandler;

#[async_trait::async_trait]
impl Handler<HandlerCtx> for SendChatMessageHandler {
    fn job_type(&self) -> &'static str {
        "send_chat_message"
    }

    async fn run(&self, payload: serde_json::Value, ctx: &HandlerCtx) -> Result<(), HandlerError> {
        let payload: SendChatMessagePayload = parse_payload(&payload)?;
        ctx.chat_client
            .send_message(&payload.user, &payload.text)
            .await
            .map_err(HandlerError::Retryable)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sends_message_through_chat_client() {
        let handler = SendChatMessageHandler;
        let ctx = crate::testsupport::test_ctx();
        let result = handler
            .run(
                serde_json::json!({"user": "u1", "text": "hello"}),
                &ctx,
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn missing_fields_are_a_validation_failure() {
        let handler = SendChatMessageHandler;
        let ctx = crate::testsupport::test_ctx();
        let result = handler.run(serde_json::json!({"user": "u1"}), &ctx).await;
        assert!(matches!(result, Err(HandlerError::Validation(_))));
    }
}
