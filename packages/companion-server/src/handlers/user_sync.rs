//! `user_sync`: periodic per-user refresh job (§4.9 `user_sync`, every
//! 6 hours). Stands in for whatever the real integration needs to keep
//! in sync with the chat platform — here it only confirms the user is
//! still known to `UserSettingsStore`, which is enough to exercise the
//! retry/dead-letter path for a user who has since been removed.

use scheduler_core::{parse_payload, Handler, HandlerError};
use serde::Deserialize;

use crate::ctx::HandlerCtx;

#[derive(Debug, Deserialize)]
struct UserSyncPayload {
    user: String,
}

pub struct UserSyncHandler;

#[async_trait::async_trait]
impl Handler<HandlerCtx> for UserSyncHandler {
    fn job_type(&self) -> &'static str {
        "user_sync"
    }

    async fn run(&self, payload: serde_json::Value, ctx: &HandlerCtx) -> Result<(), HandlerError> {
        let payload: UserSyncPayload = parse_payload(&payload)?;
        let known_users = ctx
            .user_settings
            .known_users()
            .await
            .map_err(HandlerError::Retryable)?;
        if !known_users.contains(&payload.user) {
            return Err(HandlerError::Permanent(anyhow::anyhow!(
                "user {} is no longer known",
                payload.user
            )));
        }
        tracing::debug!(user = %payload.user, "user_sync completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_user_is_a_permanent_failure() {
        let handler = UserSyncHandler;
        let ctx = crate::testsupport::test_ctx();
        let result = handler
            .run(serde_json::json!({"user": "ghost"}), &ctx)
            .await;
        assert!(matches!(result, Err(HandlerError::Permanent(_))));
    }

    #[tokio::test]
    async fn missing_user_is_a_validation_failure() {
        let handler = UserSyncHandler;
        let ctx = crate::testsupport::test_ctx();
        let result = handler.run(serde_json::json!({}), &ctx).await;
        assert!(matches!(result, Err(HandlerError::Validation(_))));
    }
}
