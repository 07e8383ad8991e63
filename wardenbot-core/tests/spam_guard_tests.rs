// wardenbot-core/tests/spam_guard_tests.rs

use std::sync::Arc;
use chrono::{Duration, Utc};
use uuid::Uuid;

use wardenbot_core::repositories::memory::MemoryRateWindowStore;
use wardenbot_core::services::spam_guard::SpamGuard;
use wardenbot_common::models::policy::{Punishment, SpamPolicy};
use wardenbot_common::models::rate::{RateEntry, SpamReason};
use wardenbot_common::traits::repository_traits::RateWindowStore;
use wardenbot_common::Error;

fn policy(max_messages: usize, duplicate_threshold: usize) -> SpamPolicy {
    SpamPolicy {
        enabled: true,
        time_window_s: 10,
        max_messages,
        duplicate_threshold,
        punishment: Punishment::Delete,
    }
}

fn setup() -> (Arc<MemoryRateWindowStore>, SpamGuard) {
    let store = Arc::new(MemoryRateWindowStore::new());
    let guard = SpamGuard::new(store.clone());
    (store, guard)
}

#[tokio::test]
async fn fifth_message_in_window_is_frequency_spam() -> Result<(), Error> {
    let (_store, guard) = setup();
    let room = Uuid::new_v4();
    let policy = policy(5, 100);

    for i in 0..4 {
        let verdict = guard
            .check(room, "member-1", &format!("message {}", i), &policy)
            .await?;
        assert!(!verdict.is_spam, "message {} should be clean", i);
    }

    let verdict = guard.check(room, "member-1", "message 4", &policy).await?;
    assert!(verdict.is_spam);
    assert_eq!(verdict.reason, SpamReason::Frequency);
    assert!((verdict.confidence - 1.0).abs() < f32::EPSILON);
    Ok(())
}

#[tokio::test]
async fn third_duplicate_is_duplicate_spam() -> Result<(), Error> {
    let (_store, guard) = setup();
    let room = Uuid::new_v4();
    let policy = policy(100, 3);

    assert!(!guard.check(room, "member-1", "Buy now", &policy).await?.is_spam);
    // Same fingerprint despite case/whitespace differences.
    assert!(!guard.check(room, "member-1", "  BUY NOW ", &policy).await?.is_spam);
    let verdict = guard.check(room, "member-1", "buy now", &policy).await?;
    assert!(verdict.is_spam);
    assert_eq!(verdict.reason, SpamReason::Duplicate);
    Ok(())
}

#[tokio::test]
async fn frequency_wins_when_both_thresholds_trip() -> Result<(), Error> {
    let (_store, guard) = setup();
    let room = Uuid::new_v4();
    let policy = policy(3, 3);

    guard.check(room, "member-1", "same text", &policy).await?;
    guard.check(room, "member-1", "same text", &policy).await?;
    let verdict = guard.check(room, "member-1", "same text", &policy).await?;
    assert!(verdict.is_spam);
    assert_eq!(verdict.reason, SpamReason::Frequency);
    Ok(())
}

#[tokio::test]
async fn entries_outside_the_window_are_dropped() -> Result<(), Error> {
    let (store, guard) = setup();
    let room = Uuid::new_v4();
    let policy = policy(3, 3);

    // Pre-populate the window with entries older than time_window_s.
    let stale: Vec<RateEntry> = (0..5)
        .map(|i| RateEntry {
            sent_at: Utc::now() - Duration::seconds(60 + i),
            fingerprint: "old message".to_string(),
        })
        .collect();
    store
        .store(room, "member-1", &stale, Duration::seconds(600))
        .await?;

    let verdict = guard.check(room, "member-1", "old message", &policy).await?;
    assert!(!verdict.is_spam, "stale entries must not count");
    Ok(())
}

#[tokio::test]
async fn members_do_not_share_windows() -> Result<(), Error> {
    let (_store, guard) = setup();
    let room = Uuid::new_v4();
    let policy = policy(3, 3);

    guard.check(room, "member-1", "hello", &policy).await?;
    guard.check(room, "member-1", "hello", &policy).await?;
    // A different member starts from an empty window.
    let verdict = guard.check(room, "member-2", "hello", &policy).await?;
    assert!(!verdict.is_spam);
    Ok(())
}

#[tokio::test]
async fn sweep_drops_expired_keys() -> Result<(), Error> {
    let (store, guard) = setup();
    let room = Uuid::new_v4();
    let policy = SpamPolicy {
        time_window_s: 1,
        ..policy(5, 3)
    };

    guard.check(room, "member-1", "hi", &policy).await?;
    assert_eq!(store.len(), 1);

    // After the TTL lapses the key is reclaimable.
    let removed = store.sweep(Utc::now() + Duration::seconds(5)).await?;
    assert_eq!(removed, 1);
    assert!(store.is_empty());
    Ok(())
}
