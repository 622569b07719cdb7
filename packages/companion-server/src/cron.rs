//! `CronPlanner` (C9): the fixed-cadence triggers that emit
//! `ScheduleRequest`s into the job queue (§4.9).
//!
//! Grounded on the teacher's `kernel::scheduled_tasks::start_scheduler`
//! — a `tokio_cron_scheduler::JobScheduler` with one `Job::new_async`
//! per cadence. Here every tick first checks `SingletonLock::is_leader`
//! so only the elected process's ticks do anything.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, TimeZone, Timelike, Utc};
use scheduler_core::{Clock, ScheduleApi, ScheduleRequest, SingletonLock};
use sha2::{Digest, Sha256};
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::collaborators::UserSettingsStore;

pub struct CronPlanner {
    schedule: Arc<dyn ScheduleApi>,
    lock: Arc<dyn SingletonLock>,
    clock: Arc<dyn Clock>,
    user_settings: Arc<dyn UserSettingsStore>,
    process_id: String,
    enable_heartbeat: bool,
    work_sampling_prompts_per_day: u32,
}

impl CronPlanner {
    pub fn new(
        schedule: Arc<dyn ScheduleApi>,
        lock: Arc<dyn SingletonLock>,
        clock: Arc<dyn Clock>,
        user_settings: Arc<dyn UserSettingsStore>,
        process_id: String,
        enable_heartbeat: bool,
        work_sampling_prompts_per_day: u32,
    ) -> Self {
        Self {
            schedule,
            lock,
            clock,
            user_settings,
            process_id,
            enable_heartbeat,
            work_sampling_prompts_per_day,
        }
    }

    /// Builds and starts the underlying `JobScheduler`. Returns the
    /// scheduler handle so the caller can keep it alive (and shut it
    /// down) for the process lifetime.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<JobScheduler> {
        let scheduler = JobScheduler::new().await?;

        let heartbeat_planner = self.clone();
        scheduler
            .add(Job::new_async("0 * * * * *", move |_uuid, _lock| {
                let planner = heartbeat_planner.clone();
                Box::pin(async move {
                    if let Err(err) = planner.tick_heartbeat().await {
                        tracing::error!(error = %err, "heartbeat_timed trigger failed");
                    }
                })
            })?)
            .await?;

        let daily_summary_planner = self.clone();
        scheduler
            .add(Job::new_async("0 0 0 * * * *", move |_uuid, _lock| {
                let planner = daily_summary_planner.clone();
                Box::pin(async move {
                    if let Err(err) = planner.tick_daily_summary().await {
                        tracing::error!(error = %err, "daily_summary_planner trigger failed");
                    }
                })
            })?)
            .await?;

        let work_sampling_planner = self.clone();
        scheduler
            .add(Job::new_async("0 0 0 * * * *", move |_uuid, _lock| {
                let planner = work_sampling_planner.clone();
                Box::pin(async move {
                    if let Err(err) = planner.tick_work_sampling().await {
                        tracing::error!(error = %err, "work_sampling_planner trigger failed");
                    }
                })
            })?)
            .await?;

        let user_sync_planner = self.clone();
        scheduler
            .add(Job::new_async("0 0 */6 * * * *", move |_uuid, _lock| {
                let planner = user_sync_planner.clone();
                Box::pin(async move {
                    if let Err(err) = planner.tick_user_sync().await {
                        tracing::error!(error = %err, "user_sync trigger failed");
                    }
                })
            })?)
            .await?;

        scheduler.start().await?;
        tracing::info!("cron planner started: heartbeat_timed, daily_summary_planner, work_sampling_planner, user_sync");
        Ok(scheduler)
    }

    fn is_leader(&self) -> bool {
        self.lock.is_leader(&self.process_id)
    }

    async fn tick_heartbeat(&self) -> anyhow::Result<()> {
        if !self.is_leader() || !self.enable_heartbeat {
            return Ok(());
        }
        let uuid = uuid::Uuid::now_v1(&HEARTBEAT_NODE_ID);
        tracing::info!("Heartbeat (timed): UUID={uuid}");
        let now = self.clock.now();
        self.schedule
            .schedule(ScheduleRequest::new(
                "heartbeat_event",
                serde_json::json!({ "uuid": uuid.to_string() }),
                now + ChronoDuration::seconds(10),
            ))
            .await?;
        Ok(())
    }

    async fn tick_daily_summary(&self) -> anyhow::Result<()> {
        if !self.is_leader() {
            return Ok(());
        }
        let users = self.user_settings.known_users().await?;
        for user in users {
            let tz = self.user_settings.timezone(&user).await?;
            let now_utc = self.clock.now();
            let when = next_local_time_as_utc(now_utc, tz, NaiveTime::from_hms_opt(7, 0, 0).unwrap());
            let bucket = when.with_timezone(&tz).date_naive();
            self.schedule
                .schedule(
                    ScheduleRequest::new("daily_summary", serde_json::json!({ "user": user }), when)
                        .with_logical_id(format!("daily_summary:{user}"))
                        .with_bucket(bucket),
                )
                .await?;
        }
        Ok(())
    }

    async fn tick_work_sampling(&self) -> anyhow::Result<()> {
        if !self.is_leader() {
            return Ok(());
        }
        let users = self.user_settings.known_users().await?;
        let slots = self.work_sampling_prompts_per_day.max(1);
        for user in users {
            let tz = self.user_settings.timezone(&user).await?;
            let now_utc = self.clock.now();
            let local_date = now_utc.with_timezone(&tz).date_naive();

            let window_start = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
            let window_end = NaiveTime::from_hms_opt(17, 0, 0).unwrap();
            let window_seconds = (window_end - window_start).num_seconds().max(1) as u64;
            let slot_seconds = window_seconds / slots as u64;

            for slot in 0..slots {
                let seed_input = format!("{user}-{local_date}-{slot}");
                let seed = seed_from_sha256(&seed_input);
                let rng = fastrand::Rng::with_seed(seed);
                let offset_within_slot = rng.u64(0..slot_seconds.max(1));
                let offset = slot as u64 * slot_seconds + offset_within_slot;

                let local_naive = local_date
                    .and_time(window_start)
                    .checked_add_signed(ChronoDuration::seconds(offset as i64))
                    .expect("offset stays within the sampling window");
                let local_dt = tz
                    .from_local_datetime(&local_naive)
                    .single()
                    .unwrap_or_else(|| tz.from_utc_datetime(&local_naive));
                let when = local_dt.with_timezone(&Utc);

                self.schedule
                    .schedule(
                        ScheduleRequest::new(
                            "work_sampling_prompt",
                            serde_json::json!({ "user": user, "slot": slot }),
                            when,
                        )
                        .with_logical_id(format!("work_sampling_prompt:{user}:{slot}")),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    async fn tick_user_sync(&self) -> anyhow::Result<()> {
        if !self.is_leader() {
            return Ok(());
        }
        let users = self.user_settings.known_users().await?;
        let now = self.clock.now();
        let slot = six_hour_slot(now);
        for user in users {
            self.schedule
                .schedule(
                    ScheduleRequest::new("user_sync", serde_json::json!({ "user": user }), now)
                        .with_logical_id(format!("user_sync:{user}:{slot}")),
                )
                .await?;
        }
        Ok(())
    }
}

/// A fixed, arbitrary per-process node id: UUIDv1 generation here needs
/// no real MAC/clock-sequence coordination, only uniqueness of the
/// generated heartbeat marker.
const HEARTBEAT_NODE_ID: [u8; 6] = [0x00, 0x43, 0x4d, 0x53, 0x43, 0x48];

fn seed_from_sha256(input: &str) -> u64 {
    let digest = Sha256::digest(input.as_bytes());
    u64::from_be_bytes(digest[0..8].try_into().expect("sha256 digest is at least 8 bytes"))
}

/// Bucket index for a 6-hour window within its UTC calendar day: 0 for
/// 00:00-05:59, 1 for 06:00-11:59, and so on.
fn six_hour_slot(at: DateTime<Utc>) -> u32 {
    at.time().hour() / 6
}

/// The next UTC instant at which the given local `time` occurs in
/// `tz`, treating "now" as already past if it's earlier the same local
/// day (so this always resolves to today-or-later, never the past).
fn next_local_time_as_utc(now_utc: DateTime<Utc>, tz: chrono_tz::Tz, time: NaiveTime) -> DateTime<Utc> {
    let now_local = now_utc.with_timezone(&tz);
    let today = now_local.date_naive();
    let candidate_naive = today.and_time(time);
    let candidate_local = tz
        .from_local_datetime(&candidate_naive)
        .single()
        .unwrap_or_else(|| tz.from_utc_datetime(&candidate_naive));

    if candidate_local > now_local {
        candidate_local.with_timezone(&Utc)
    } else {
        let tomorrow_naive = today.succ_opt().expect("date arithmetic does not overflow").and_time(time);
        tz.from_local_datetime(&tomorrow_naive)
            .single()
            .unwrap_or_else(|| tz.from_utc_datetime(&tomorrow_naive))
            .with_timezone(&Utc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    #[test]
    fn next_local_time_rolls_to_tomorrow_when_already_past() {
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();
        let when = next_local_time_as_utc(now, chrono_tz::UTC, NaiveTime::from_hms_opt(7, 0, 0).unwrap());
        assert_eq!(when.date_naive(), now.date_naive().succ_opt().unwrap());
        assert_eq!(when.time(), NaiveTime::from_hms_opt(7, 0, 0).unwrap());
    }

    #[test]
    fn next_local_time_stays_today_when_still_upcoming() {
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 3, 0, 0).unwrap();
        let when = next_local_time_as_utc(now, chrono_tz::UTC, NaiveTime::from_hms_opt(7, 0, 0).unwrap());
        assert_eq!(when.date_naive(), now.date_naive());
    }

    #[test]
    fn sha256_seed_is_deterministic_per_input() {
        let a = seed_from_sha256("alice-2026-07-28-0");
        let b = seed_from_sha256("alice-2026-07-28-0");
        let c = seed_from_sha256("alice-2026-07-28-1");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn six_hour_slot_buckets_the_day_into_four_windows() {
        let t0 = Utc.with_ymd_and_hms(2026, 7, 28, 0, 30, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2026, 7, 28, 7, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 7, 28, 13, 0, 0).unwrap();
        let t3 = Utc.with_ymd_and_hms(2026, 7, 28, 19, 0, 0).unwrap();
        assert_eq!(six_hour_slot(t0), 0);
        assert_eq!(six_hour_slot(t1), 1);
        assert_eq!(six_hour_slot(t2), 2);
        assert_eq!(six_hour_slot(t3), 3);
    }
}
