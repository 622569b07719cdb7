//! Integration tests for `PgJobStore` against a real Postgres container
//! (P1, P2, S1, S2, S3 from spec §8).

mod common;

use chrono::{Duration, Utc};
use scheduler_core::{ClaimOutcome, JobRecord, JobStatus, JobStore};
use scheduler_postgres::PgJobStore;

fn job_type() -> String {
    format!("test_job_{}", uuid::Uuid::new_v4())
}

#[tokio::test]
async fn query_due_orders_ascending_and_respects_horizon() {
    let store = PgJobStore::new(common::pool().await);
    let base = Utc::now();
    let jt = job_type();

    let a = JobRecord::new(&jt, serde_json::json!({"n": "a"}), base, None, base);
    let b = JobRecord::new(&jt, serde_json::json!({"n": "b"}), base, None, base);
    let c = JobRecord::new(
        &jt,
        serde_json::json!({"n": "c"}),
        base + Duration::seconds(100),
        None,
        base,
    );
    store.insert(&a).await.unwrap();
    store.insert(&b).await.unwrap();
    store.insert(&c).await.unwrap();

    let at_50 = store.query_due(base + Duration::seconds(50), 10).await.unwrap();
    let at_50: Vec<_> = at_50.into_iter().filter(|j| j.job_type == jt).collect();
    assert_eq!(at_50.len(), 2, "only a and b are due at +50s");
    assert!(at_50[0].scheduled_for <= at_50[1].scheduled_for);

    let at_150 = store.query_due(base + Duration::seconds(150), 10).await.unwrap();
    let at_150: Vec<_> = at_150.into_iter().filter(|j| j.job_type == jt).collect();
    assert_eq!(at_150.len(), 3, "all three are due once c's time passes");
}

#[tokio::test]
async fn insert_rejects_duplicate_job_id() {
    let store = PgJobStore::new(common::pool().await);
    let now = Utc::now();
    let job = JobRecord::new(&job_type(), serde_json::json!({}), now, None, now);
    store.insert(&job).await.unwrap();
    let err = store.insert(&job).await.unwrap_err();
    assert!(matches!(err, scheduler_core::StoreError::AlreadyExists(_)));
}

#[tokio::test]
async fn claim_is_exclusive_between_two_workers() {
    let store = PgJobStore::new(common::pool().await);
    let now = Utc::now();
    let job = JobRecord::new(&job_type(), serde_json::json!({}), now, None, now);
    store.insert(&job).await.unwrap();

    let lease = Duration::seconds(60);
    let first = store.claim(job.job_id, "worker-1", lease, now).await.unwrap();
    let second = store.claim(job.job_id, "worker-2", lease, now).await.unwrap();

    assert_eq!(first, ClaimOutcome::Claimed);
    assert_eq!(second, ClaimOutcome::LostRace);

    let completed = store.mark_completed(job.job_id, "worker-1", now).await.unwrap();
    assert!(completed);

    let found = store.find(job.job_id).await.unwrap().unwrap();
    assert_eq!(found.status, JobStatus::Completed);
    assert!(found.locked_by.is_none());
}

#[tokio::test]
async fn stale_lease_is_reclaimable() {
    let store = PgJobStore::new(common::pool().await);
    let now = Utc::now();
    let job = JobRecord::new(&job_type(), serde_json::json!({}), now, None, now);
    store.insert(&job).await.unwrap();

    let short_lease = Duration::seconds(1);
    let claimed = store.claim(job.job_id, "worker-1", short_lease, now).await.unwrap();
    assert_eq!(claimed, ClaimOutcome::Claimed);

    let too_soon = store
        .claim(job.job_id, "worker-2", short_lease, now + Duration::milliseconds(500))
        .await
        .unwrap();
    assert_eq!(too_soon, ClaimOutcome::LostRace, "lease hasn't expired yet");

    let after_expiry = store
        .claim(job.job_id, "worker-2", short_lease, now + Duration::seconds(2))
        .await
        .unwrap();
    assert_eq!(after_expiry, ClaimOutcome::Claimed, "stale lease must be reclaimable");
}

#[tokio::test]
async fn retry_rotates_sort_key_and_leaves_exactly_one_live_record() {
    let store = PgJobStore::new(common::pool().await);
    let now = Utc::now();
    let jt = job_type();
    let job = JobRecord::new(&jt, serde_json::json!({}), now, None, now);
    store.insert(&job).await.unwrap();

    store
        .claim(job.job_id, "worker-1", Duration::seconds(60), now)
        .await
        .unwrap();

    let next_run = now + Duration::seconds(60);
    let ok = store
        .mark_failed_for_retry(job.job_id, "worker-1", next_run, "boom", now)
        .await
        .unwrap();
    assert!(ok);

    let original = store.find(job.job_id).await.unwrap().unwrap();
    assert_eq!(original.status, JobStatus::Failed, "original record is superseded");

    let due = store.query_due(next_run + Duration::seconds(1), 100).await.unwrap();
    let live: Vec<_> = due.into_iter().filter(|j| j.job_type == jt).collect();
    assert_eq!(live.len(), 1, "exactly one live record per job_id after retry");
    assert_eq!(live[0].scheduled_for, next_run);
    assert_eq!(live[0].attempts, original.attempts);
    assert_ne!(live[0].job_id, job.job_id);
}

#[tokio::test]
async fn dead_letter_is_terminal_and_not_due() {
    let store = PgJobStore::new(common::pool().await);
    let now = Utc::now();
    let jt = job_type();
    let job = JobRecord::new(&jt, serde_json::json!({}), now, None, now);
    store.insert(&job).await.unwrap();
    store
        .claim(job.job_id, "worker-1", Duration::seconds(60), now)
        .await
        .unwrap();

    let marked = store
        .mark_dead_letter(job.job_id, "worker-1", "exhausted retries")
        .await
        .unwrap();
    assert!(marked);

    let found = store.find(job.job_id).await.unwrap().unwrap();
    assert_eq!(found.status, JobStatus::DeadLetter);

    let due = store.query_due(now + Duration::seconds(1), 100).await.unwrap();
    assert!(due.iter().all(|j| j.job_id != job.job_id));
}

#[tokio::test]
async fn cancel_only_succeeds_while_pending() {
    let store = PgJobStore::new(common::pool().await);
    let now = Utc::now();
    let job = JobRecord::new(&job_type(), serde_json::json!({}), now, None, now);
    store.insert(&job).await.unwrap();

    let cancelled = store.cancel(job.job_id).await.unwrap();
    assert!(cancelled);

    let found = store.find(job.job_id).await.unwrap().unwrap();
    assert_eq!(found.status, JobStatus::Cancelled);

    let again = store.cancel(job.job_id).await.unwrap();
    assert!(!again, "cancelling a non-pending job is a no-op");
}

#[tokio::test]
async fn cancelled_jobs_never_appear_in_query_due() {
    let store = PgJobStore::new(common::pool().await);
    let now = Utc::now();
    let job = JobRecord::new(&job_type(), serde_json::json!({}), now, None, now);
    store.insert(&job).await.unwrap();
    store.cancel(job.job_id).await.unwrap();

    let due = store.query_due(now + Duration::seconds(5), 100).await.unwrap();
    assert!(due.iter().all(|j| j.job_id != job.job_id));
}
