// wardenbot-core/tests/verification_tests.rs

use std::sync::Arc;
use chrono::{Duration, Utc};

use wardenbot_core::repositories::memory::MemoryVerificationRepository;
use wardenbot_core::services::challenge;
use wardenbot_core::services::verification_service::{AnswerOutcome, VerificationService};
use wardenbot_core::test_utils::{sample_room, PlatformCall, RecordingPlatform};
use wardenbot_common::models::policy::{ChallengeType, VerificationPolicy};
use wardenbot_common::models::room::Room;
use wardenbot_common::models::verification::{
    ChallengePayload, VerificationRecord, VerificationStatus,
};
use wardenbot_common::traits::platform_traits::MembershipStatus;
use wardenbot_common::traits::repository_traits::VerificationRepository;
use wardenbot_common::Error;

fn setup() -> (
    Arc<MemoryVerificationRepository>,
    Arc<RecordingPlatform>,
    VerificationService,
) {
    let repo = Arc::new(MemoryVerificationRepository::new());
    let platform = Arc::new(RecordingPlatform::new());
    let service = VerificationService::new(repo.clone(), platform.clone());
    (repo, platform, service)
}

fn enabled_policy(challenge_type: ChallengeType) -> VerificationPolicy {
    VerificationPolicy {
        enabled: true,
        challenge_type,
        timeout_s: 300,
        max_attempts: 3,
        bypass_member_ids: Vec::new(),
        membership_channel: Some("@announcements".to_string()),
        restrict_safety_s: 86_400,
    }
}

/// Inserts a code-type record with a known code, bypassing generation.
async fn seed_code_record(
    repo: &Arc<MemoryVerificationRepository>,
    room: &Room,
    member_id: &str,
    code: &str,
) -> VerificationRecord {
    let record = VerificationRecord::new(
        room.room_id,
        member_id,
        ChallengePayload::Code {
            code: code.to_string(),
        },
        300,
        3,
    );
    assert!(repo.create_if_absent(&record).await.unwrap());
    record
}

#[tokio::test]
async fn disabled_verification_never_creates_a_record() -> Result<(), Error> {
    let (repo, _platform, service) = setup();
    let room = sample_room("chat-1");
    let policy = VerificationPolicy {
        enabled: false,
        ..enabled_policy(ChallengeType::Code)
    };

    let issued = service.handle_join(&room, "member-1", &policy).await?;
    assert!(issued.is_none());
    assert!(repo.find_pending(room.room_id, "member-1").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn bypassed_member_skips_verification() -> Result<(), Error> {
    let (repo, _platform, service) = setup();
    let room = sample_room("chat-1");
    let mut policy = enabled_policy(ChallengeType::Code);
    policy.bypass_member_ids = vec!["vip".to_string()];

    assert!(service.handle_join(&room, "vip", &policy).await?.is_none());
    assert!(repo.find_pending(room.room_id, "vip").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn join_issues_challenge_and_restricts_posting() -> Result<(), Error> {
    let (repo, platform, service) = setup();
    let room = sample_room("chat-1");
    let policy = enabled_policy(ChallengeType::Code);

    let issued = service.handle_join(&room, "member-1", &policy).await?;
    let record = issued.expect("record issued");
    assert_eq!(record.status, VerificationStatus::Pending);
    assert!(repo.find_pending(room.room_id, "member-1").await?.is_some());

    // The safety-net restriction outlives the challenge timeout.
    let restrict = platform
        .calls()
        .into_iter()
        .find_map(|c| match c {
            PlatformCall::Restrict { until, .. } => Some(until),
            _ => None,
        })
        .expect("restrict call");
    let until = restrict.expect("deadline set");
    assert!(until > record.expires_at);

    // And the prompt went out.
    assert!(!platform.sent_texts().is_empty());
    Ok(())
}

#[tokio::test]
async fn second_join_is_a_noop_while_pending() -> Result<(), Error> {
    let (repo, _platform, service) = setup();
    let room = sample_room("chat-1");
    let policy = enabled_policy(ChallengeType::Code);

    let first = service.handle_join(&room, "member-1", &policy).await?;
    assert!(first.is_some());
    let second = service.handle_join(&room, "member-1", &policy).await?;
    assert!(second.is_none());

    assert_eq!(repo.all_pending_for(room.room_id, "member-1").await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn concurrent_joins_issue_exactly_one_record() -> Result<(), Error> {
    let (repo, platform, _service) = setup();
    let room = sample_room("chat-1");
    let policy = enabled_policy(ChallengeType::Arithmetic);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let repo = repo.clone();
        let platform = platform.clone();
        let room = room.clone();
        let policy = policy.clone();
        handles.push(tokio::spawn(async move {
            let service = VerificationService::new(repo, platform);
            service.handle_join(&room, "member-1", &policy).await
        }));
    }

    let mut issued = 0;
    for h in handles {
        if h.await.unwrap()?.is_some() {
            issued += 1;
        }
    }
    assert_eq!(issued, 1, "exactly one worker wins the issuance race");
    assert_eq!(repo.all_pending_for(room.room_id, "member-1").await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn code_answer_matches_case_insensitively() -> Result<(), Error> {
    let (repo, platform, service) = setup();
    let room = sample_room("chat-1");
    let record = seed_code_record(&repo, &room, "member-1", "7K2P").await;

    let outcome = service.answer_record(&record, "7k2p").await?;
    assert_eq!(outcome, AnswerOutcome::Passed);

    let stored = repo.get(record.verification_id).await?.unwrap();
    assert_eq!(stored.status, VerificationStatus::Passed);
    assert!(stored.completed_at.is_some());

    // Passing lifts the posting restriction.
    assert!(platform
        .calls()
        .iter()
        .any(|c| matches!(c, PlatformCall::Unrestrict { .. })));
    Ok(())
}

#[tokio::test]
async fn third_wrong_answer_fails_terminally() -> Result<(), Error> {
    let (repo, platform, service) = setup();
    let room = sample_room("chat-1");
    let record = seed_code_record(&repo, &room, "member-1", "7K2P").await;

    let first = service.answer_record(&record, "nope").await?;
    assert_eq!(first, AnswerOutcome::Retry { attempts_remaining: 2 });
    let second = service.answer_record(&record, "still no").await?;
    assert_eq!(second, AnswerOutcome::Retry { attempts_remaining: 1 });
    let third = service.answer_record(&record, "wrong").await?;
    assert_eq!(third, AnswerOutcome::Failed);

    let stored = repo.get(record.verification_id).await?.unwrap();
    assert_eq!(stored.status, VerificationStatus::Failed);
    assert_eq!(stored.attempt_count, 3);

    // Failure does not lift the restriction.
    assert!(!platform
        .calls()
        .iter()
        .any(|c| matches!(c, PlatformCall::Unrestrict { .. })));
    Ok(())
}

#[tokio::test]
async fn expired_record_reports_expired_even_for_correct_answer() -> Result<(), Error> {
    let (repo, _platform, service) = setup();
    let room = sample_room("chat-1");
    let mut record = VerificationRecord::new(
        room.room_id,
        "member-1",
        ChallengePayload::Code {
            code: "7K2P".to_string(),
        },
        300,
        3,
    );
    record.expires_at = Utc::now() - Duration::seconds(5);
    assert!(repo.create_if_absent(&record).await.unwrap());

    let outcome = service.answer_record(&record, "7K2P").await?;
    assert_eq!(outcome, AnswerOutcome::Expired);

    let stored = repo.get(record.verification_id).await?.unwrap();
    assert_eq!(stored.status, VerificationStatus::Expired);
    Ok(())
}

#[tokio::test]
async fn closed_record_rejects_further_answers() -> Result<(), Error> {
    let (repo, _platform, service) = setup();
    let room = sample_room("chat-1");
    let record = seed_code_record(&repo, &room, "member-1", "7K2P").await;

    assert_eq!(service.answer_record(&record, "7K2P").await?, AnswerOutcome::Passed);
    assert_eq!(service.answer_record(&record, "7K2P").await?, AnswerOutcome::Closed);
    Ok(())
}

#[tokio::test]
async fn membership_challenge_probes_the_target_channel() -> Result<(), Error> {
    let (repo, platform, service) = setup();
    let room = sample_room("chat-1");
    let record = VerificationRecord::new(
        room.room_id,
        "member-1",
        ChallengePayload::Membership {
            channel_ref: "@announcements".to_string(),
        },
        300,
        3,
    );
    assert!(repo.create_if_absent(&record).await.unwrap());

    platform.set_membership(MembershipStatus::NotMember);
    let outcome = service.answer_record(&record, "").await?;
    assert_eq!(outcome, AnswerOutcome::Retry { attempts_remaining: 2 });

    platform.set_membership(MembershipStatus::Member);
    let outcome = service.answer_record(&record, "").await?;
    assert_eq!(outcome, AnswerOutcome::Passed);

    assert!(platform
        .calls()
        .iter()
        .any(|c| matches!(c, PlatformCall::QueryMembership { channel_ref, .. } if channel_ref == "@announcements")));
    Ok(())
}

#[tokio::test]
async fn private_answer_resolves_most_recent_pending_record() -> Result<(), Error> {
    let (repo, _platform, service) = setup();
    let room_a = sample_room("chat-a");
    let room_b = sample_room("chat-b");

    let older = VerificationRecord::new(
        room_a.room_id,
        "member-1",
        ChallengePayload::Code { code: "AAAA".to_string() },
        300,
        3,
    );
    assert!(repo.create_if_absent(&older).await.unwrap());

    let mut newer = VerificationRecord::new(
        room_b.room_id,
        "member-1",
        ChallengePayload::Code { code: "BBBB".to_string() },
        300,
        3,
    );
    newer.created_at = older.created_at + Duration::seconds(10);
    assert!(repo.create_if_absent(&newer).await.unwrap());

    // The newer room's code is the one that counts.
    let outcome = service.answer_private("member-1", "bbbb").await?;
    assert_eq!(outcome, AnswerOutcome::Passed);

    let stored_newer = repo.get(newer.verification_id).await?.unwrap();
    assert_eq!(stored_newer.status, VerificationStatus::Passed);
    let stored_older = repo.get(older.verification_id).await?.unwrap();
    assert_eq!(stored_older.status, VerificationStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn private_answer_without_pending_record_is_not_found() -> Result<(), Error> {
    let (_repo, _platform, service) = setup();
    let outcome = service.answer_private("stranger", "anything").await?;
    assert_eq!(outcome, AnswerOutcome::NotFound);
    Ok(())
}

#[tokio::test]
async fn callback_answer_resolves_by_record_id() -> Result<(), Error> {
    let (repo, _platform, service) = setup();
    let room = sample_room("chat-1");
    let record = VerificationRecord::new(
        room.room_id,
        "member-1",
        ChallengePayload::Arithmetic {
            question: "3 + 4".to_string(),
            answer: 7,
        },
        300,
        3,
    );
    assert!(repo.create_if_absent(&record).await.unwrap());

    let token = challenge::callback_token(record.verification_id, "7");
    let outcome = service.handle_callback("member-1", &token).await?;
    assert_eq!(outcome, AnswerOutcome::Passed);
    Ok(())
}

#[tokio::test]
async fn callback_from_another_member_is_ignored() -> Result<(), Error> {
    let (repo, _platform, service) = setup();
    let room = sample_room("chat-1");
    let record = seed_code_record(&repo, &room, "member-1", "7K2P").await;

    let token = challenge::callback_token(record.verification_id, "7K2P");
    let outcome = service.handle_callback("member-2", &token).await?;
    assert_eq!(outcome, AnswerOutcome::NotFound);

    let stored = repo.get(record.verification_id).await?.unwrap();
    assert_eq!(stored.status, VerificationStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn deferred_record_waits_for_operator_decision() -> Result<(), Error> {
    let (repo, _platform, service) = setup();
    let room = sample_room("chat-1");
    let record = VerificationRecord::new(
        room.room_id,
        "member-1",
        ChallengePayload::Deferred,
        3_600,
        3,
    );
    assert!(repo.create_if_absent(&record).await.unwrap());

    // The member's own text does not resolve a deferred challenge.
    let outcome = service.answer_record(&record, "let me in").await?;
    assert_eq!(outcome, AnswerOutcome::AwaitingOperator);
    assert_eq!(
        repo.get(record.verification_id).await?.unwrap().status,
        VerificationStatus::Pending
    );

    let approve = challenge::callback_token(record.verification_id, "approve");
    let outcome = service.handle_callback("operator-9", &approve).await?;
    assert_eq!(outcome, AnswerOutcome::Passed);
    Ok(())
}

#[tokio::test]
async fn deferred_deny_fails_terminally() -> Result<(), Error> {
    let (repo, _platform, service) = setup();
    let room = sample_room("chat-1");
    let record = VerificationRecord::new(
        room.room_id,
        "member-1",
        ChallengePayload::Deferred,
        3_600,
        3,
    );
    assert!(repo.create_if_absent(&record).await.unwrap());

    let deny = challenge::callback_token(record.verification_id, "deny");
    let outcome = service.handle_callback("operator-9", &deny).await?;
    assert_eq!(outcome, AnswerOutcome::Failed);
    assert_eq!(
        repo.get(record.verification_id).await?.unwrap().status,
        VerificationStatus::Failed
    );
    Ok(())
}

#[tokio::test]
async fn leaving_expires_the_pending_challenge() -> Result<(), Error> {
    let (repo, _platform, service) = setup();
    let room = sample_room("chat-1");
    let record = seed_code_record(&repo, &room, "member-1", "7K2P").await;

    service.handle_leave(room.room_id, "member-1").await?;
    let stored = repo.get(record.verification_id).await?.unwrap();
    assert_eq!(stored.status, VerificationStatus::Expired);

    // A rejoin issues a fresh challenge.
    let policy = enabled_policy(ChallengeType::Code);
    let reissued = service.handle_join(&room, "member-1", &policy).await?;
    assert!(reissued.is_some());
    Ok(())
}
