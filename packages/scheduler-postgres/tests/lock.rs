//! Integration tests for `PgSingletonLock` (P8, S6 from spec §8).
//!
//! There is exactly one lock row (`system#scheduler`/`lock#main`) by
//! design — it's a process-wide singleton, not a per-test resource — so
//! every test here runs under `#[serial]` to avoid racing each other for
//! it within this test binary.

mod common;

use chrono::Duration;
use scheduler_core::{AcquireOutcome, RefreshOutcome, SingletonLock};
use scheduler_postgres::PgSingletonLock;
use serial_test::serial;
use uuid::Uuid;

fn process_id(tag: &str) -> String {
    format!("{tag}-{}", Uuid::new_v4())
}

#[tokio::test]
#[serial]
async fn second_acquire_fails_while_lease_live() {
    let lock = PgSingletonLock::new(common::pool().await);
    let p1 = process_id("p1");
    let p2 = process_id("p2");

    let a = lock.acquire(&p1, Duration::seconds(90)).await.unwrap();
    assert_eq!(a, AcquireOutcome::Acquired);
    assert!(lock.is_leader(&p1));

    let b = lock.acquire(&p2, Duration::seconds(90)).await.unwrap();
    assert_eq!(b, AcquireOutcome::HeldByOther);
    assert!(!lock.is_leader(&p2));

    lock.release(&p1).await.unwrap();
}

#[tokio::test]
#[serial]
async fn acquire_succeeds_once_previous_holder_releases() {
    let lock = PgSingletonLock::new(common::pool().await);
    let p1 = process_id("p1");
    let p2 = process_id("p2");

    lock.acquire(&p1, Duration::seconds(90)).await.unwrap();
    lock.release(&p1).await.unwrap();

    let b = lock.acquire(&p2, Duration::seconds(90)).await.unwrap();
    assert_eq!(b, AcquireOutcome::Acquired);

    lock.release(&p2).await.unwrap();
}

#[tokio::test]
#[serial]
async fn refresh_by_non_holder_is_lost() {
    let lock = PgSingletonLock::new(common::pool().await);
    let p1 = process_id("p1");
    let p2 = process_id("p2");

    lock.acquire(&p1, Duration::seconds(90)).await.unwrap();

    let refreshed = lock.refresh(&p1, Duration::seconds(90)).await.unwrap();
    assert_eq!(refreshed, RefreshOutcome::Refreshed);

    let stolen = lock.refresh(&p2, Duration::seconds(90)).await.unwrap();
    assert_eq!(stolen, RefreshOutcome::Lost);
    assert!(!lock.is_leader(&p2));

    lock.release(&p1).await.unwrap();
}

#[tokio::test]
#[serial]
async fn expired_lease_is_acquirable_by_a_new_holder() {
    let lock = PgSingletonLock::new(common::pool().await);
    let p1 = process_id("p1");
    let p2 = process_id("p2");

    // A negative TTL simulates a lease that has already expired, standing
    // in for "L1 was killed and its 90s TTL ran out" (S6) without a sleep.
    lock.acquire(&p1, Duration::seconds(-1)).await.unwrap();

    let b = lock.acquire(&p2, Duration::seconds(90)).await.unwrap();
    assert_eq!(b, AcquireOutcome::Acquired);
    assert!(lock.is_leader(&p2));
    assert!(!lock.is_leader(&p1));

    lock.release(&p2).await.unwrap();
}
