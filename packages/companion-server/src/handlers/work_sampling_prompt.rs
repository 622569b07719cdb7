//! `work_sampling_prompt`: asks the user a brief "what are you working
//! on right now" question at a sampled moment during their workday
//! (§4.9 `work_sampling_planner`).

use scheduler_core::{parse_payload, Handler, HandlerError};
use serde::Deserialize;

use crate::ctx::HandlerCtx;

#[derive(Debug, Deserialize)]
struct WorkSamplingPromptPayload {
    user: String,
    #[allow(dead_code)]
    slot: u32,
}

pub struct WorkSamplingPromptHandler;

#[async_trait::async_trait]
impl Handler<HandlerCtx> for WorkSamplingPromptHandler {
    fn job_type(&self) -> &'static str {
        "work_sampling_prompt"
    }

    async fn run(&self, payload: serde_json::Value, ctx: &HandlerCtx) -> Result<(), HandlerError> {
        let payload: WorkSamplingPromptPayload = parse_payload(&payload)?;
        ctx.chat_client
            .send_message(&payload.user, "What are you working on right now?")
            .await
            .map_err(HandlerError::Retryable)?;
        Ok(())
    }
}
