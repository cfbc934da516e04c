//! Scheduler integration tests against a live Redis.
//!
//! Each test uses an isolated key namespace and skips cleanly when no
//! Redis is reachable (set REDIS_URL to point elsewhere).

mod common;

use chrono::{Duration, Utc};
use common::{test_namespace, test_settings, try_redis};
use sitepulse::Scheduler;

macro_rules! require_redis {
    () => {
        match try_redis().await {
            Some(conn) => conn,
            None => {
                eprintln!("skipping: redis unavailable");
                return;
            }
        }
    };
}

fn scheduler(conn: redis::aio::ConnectionManager) -> Scheduler {
    Scheduler::new(conn, &test_settings()).with_namespace(test_namespace())
}

#[tokio::test]
async fn due_projects_are_popped_exactly_once() {
    let conn = require_redis!();
    let scheduler = scheduler(conn);

    let past = Utc::now() - Duration::minutes(5);
    scheduler
        .schedule_full_check("p1", None, Some(past))
        .await
        .unwrap();
    scheduler
        .schedule_full_check("p2", None, Some(past))
        .await
        .unwrap();

    let first = scheduler.get_due_full_checks(10).await.unwrap();
    assert_eq!(first.len(), 2);

    let second = scheduler.get_due_full_checks(10).await.unwrap();
    assert!(second.is_empty(), "a popped project must not reappear");

    scheduler.unschedule_project("p1").await.unwrap();
    scheduler.unschedule_project("p2").await.unwrap();
}

#[tokio::test]
async fn concurrent_dispatchers_never_double_dispatch() {
    let conn = require_redis!();
    let scheduler = scheduler(conn);

    let past = Utc::now() - Duration::minutes(1);
    for i in 0..20 {
        scheduler
            .schedule_full_check(&format!("proj-{i}"), None, Some(past))
            .await
            .unwrap();
    }

    let a = scheduler.clone();
    let b = scheduler.clone();
    let (left, right) = tokio::join!(
        tokio::spawn(async move { a.get_due_full_checks(20).await.unwrap() }),
        tokio::spawn(async move { b.get_due_full_checks(20).await.unwrap() }),
    );
    let left = left.unwrap();
    let right = right.unwrap();

    // Every id is seen by at most one dispatcher.
    for id in &left {
        assert!(!right.contains(id), "{id} dispatched twice");
    }
    assert_eq!(left.len() + right.len(), 20);

    for i in 0..20 {
        scheduler
            .unschedule_project(&format!("proj-{i}"))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn future_schedules_are_not_due() {
    let conn = require_redis!();
    let scheduler = scheduler(conn);

    scheduler
        .schedule_full_check("future", Some(24), None)
        .await
        .unwrap();
    let due = scheduler.get_due_full_checks(10).await.unwrap();
    assert!(due.is_empty());

    // Still scheduled though.
    let stats = scheduler.stats().await.unwrap();
    assert_eq!(stats.full_scheduled, 1);

    scheduler.unschedule_project("future").await.unwrap();
}

#[tokio::test]
async fn scheduling_twice_keeps_one_entry() {
    let conn = require_redis!();
    let scheduler = scheduler(conn);

    scheduler
        .schedule_full_check("p", Some(1), None)
        .await
        .unwrap();
    scheduler
        .schedule_full_check("p", Some(48), None)
        .await
        .unwrap();

    let stats = scheduler.stats().await.unwrap();
    assert_eq!(stats.full_scheduled, 1, "ZADD upserts, never duplicates");

    scheduler.unschedule_project("p").await.unwrap();
}

#[tokio::test]
async fn backoff_applies_and_clamps() {
    let conn = require_redis!();
    let scheduler = scheduler(conn);

    // Defaults: 24h stored interval, bounds [6, 168].
    assert_eq!(scheduler.get_check_interval("p").await.unwrap(), 24);
    assert_eq!(scheduler.apply_backoff("p", false).await.unwrap(), 48);
    assert_eq!(scheduler.apply_backoff("p", false).await.unwrap(), 96);
    assert_eq!(scheduler.apply_backoff("p", false).await.unwrap(), 168);
    assert_eq!(scheduler.apply_backoff("p", false).await.unwrap(), 168);
    assert_eq!(scheduler.apply_backoff("p", true).await.unwrap(), 6);

    scheduler.set_check_interval("p", 10_000).await.unwrap();
    assert_eq!(scheduler.get_check_interval("p").await.unwrap(), 168);

    scheduler.unschedule_project("p").await.unwrap();
}

#[tokio::test]
async fn cooldown_gates_and_lazily_expires() {
    let conn = require_redis!();
    let scheduler = scheduler(conn);

    assert!(!scheduler.is_in_cooldown("p").await.unwrap());

    scheduler.set_cooldown("p", Some(4)).await.unwrap();
    assert!(scheduler.is_in_cooldown("p").await.unwrap());
    let remaining = scheduler
        .cooldown_remaining_hours("p")
        .await
        .unwrap()
        .expect("in cooldown");
    assert!(remaining > 3.9 && remaining <= 4.0);

    // Zero-hour cooldown expires immediately and is evicted on read.
    scheduler.set_cooldown("q", Some(0)).await.unwrap();
    assert!(!scheduler.is_in_cooldown("q").await.unwrap());

    scheduler.clear_cooldown("p").await.unwrap();
    assert!(!scheduler.is_in_cooldown("p").await.unwrap());

    scheduler.unschedule_project("p").await.unwrap();
    scheduler.unschedule_project("q").await.unwrap();
}

#[tokio::test]
async fn unschedule_clears_every_key() {
    let conn = require_redis!();
    let scheduler = scheduler(conn);

    scheduler.schedule_project("p").await.unwrap();
    scheduler.set_cooldown("p", Some(4)).await.unwrap();
    scheduler.set_check_interval("p", 48).await.unwrap();

    scheduler.unschedule_project("p").await.unwrap();

    let stats = scheduler.stats().await.unwrap();
    assert_eq!(stats.full_scheduled, 0);
    assert_eq!(stats.lightweight_scheduled, 0);
    assert_eq!(stats.cooldowns_active, 0);
    assert_eq!(stats.intervals_stored, 0);
}

#[tokio::test]
async fn cancel_is_idempotent() {
    let conn = require_redis!();
    let scheduler = scheduler(conn);

    scheduler
        .schedule_lightweight_check("p", None)
        .await
        .unwrap();
    assert!(scheduler.cancel_lightweight_check("p").await.unwrap());
    assert!(!scheduler.cancel_lightweight_check("p").await.unwrap());
    assert!(!scheduler.cancel_full_check("p").await.unwrap());
}
