//! `DefaultScheduleApi`: the concrete Scheduling API (C11, §4.11, §6.1).

use std::sync::Arc;

use scheduler_core::{
    Clock, DeduplicationIndex, JobRecord, JobStore, ReserveOutcome, ScheduleApi, ScheduleError,
    ScheduleOutcome, ScheduleRequest,
};

/// Registered job types. `scheduler-core`'s `HandlerRegistry` is keyed
/// by `&'static str`; the schedule API needs the same set *before* a
/// `HandlerRegistry<HandlerCtx>` exists (construction order would
/// otherwise be circular, since handlers themselves hold a
/// `ScheduleApi`), so it is given the list of valid job types directly
/// rather than a reference to the registry.
pub struct DefaultScheduleApi {
    job_store: Arc<dyn JobStore>,
    dedup_index: Arc<dyn DeduplicationIndex>,
    clock: Arc<dyn Clock>,
    known_job_types: Vec<&'static str>,
}

impl DefaultScheduleApi {
    pub fn new(
        job_store: Arc<dyn JobStore>,
        dedup_index: Arc<dyn DeduplicationIndex>,
        clock: Arc<dyn Clock>,
        known_job_types: Vec<&'static str>,
    ) -> Self {
        Self {
            job_store,
            dedup_index,
            clock,
            known_job_types,
        }
    }
}

#[async_trait::async_trait]
impl ScheduleApi for DefaultScheduleApi {
    async fn schedule(&self, request: ScheduleRequest) -> Result<ScheduleOutcome, ScheduleError> {
        if !self.known_job_types.contains(&request.job_type.as_str()) {
            return Err(ScheduleError::UnknownJobType(request.job_type));
        }

        let now = self.clock.now();
        let bucket = request.effective_bucket();
        let job = JobRecord::new(
            request.job_type.clone(),
            request.payload,
            request.when,
            request.logical_id.clone(),
            now,
        );

        if let Some(logical_id) = &request.logical_id {
            if logical_id.trim().is_empty() {
                return Err(ScheduleError::MalformedLogicalId(logical_id.clone()));
            }

            match self
                .dedup_index
                .try_reserve(logical_id, bucket, job.job_id)
                .await?
            {
                ReserveOutcome::AlreadyReserved => {
                    let existing_job_id = self
                        .dedup_index
                        .find_reservation(logical_id, bucket)
                        .await?;
                    return Ok(ScheduleOutcome::Deduplicated { existing_job_id });
                }
                ReserveOutcome::Reserved => {}
            }
        }

        self.job_store.insert(&job).await?;
        Ok(ScheduleOutcome::Scheduled { job_id: job.job_id })
    }
}
