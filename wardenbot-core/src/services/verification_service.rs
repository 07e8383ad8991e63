// File: wardenbot-core/src/services/verification_service.rs

use std::sync::Arc;
use chrono::{Duration, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use wardenbot_common::error::Error;
use wardenbot_common::models::policy::VerificationPolicy;
use wardenbot_common::models::room::Room;
use wardenbot_common::models::verification::{
    ChallengePayload, VerificationRecord, VerificationStatus,
};
use wardenbot_common::traits::platform_traits::{ChatPlatform, MembershipStatus};
use wardenbot_common::traits::repository_traits::VerificationRepository;

use crate::services::challenge;

/// What one answer attempt produced. `NotFound`, `Closed` and `Expired`
/// reach the member as templated replies, never as internal errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    Passed,
    Retry { attempts_remaining: i32 },
    Failed,
    Expired,
    Closed,
    NotFound,
    AwaitingOperator,
}

enum AnswerInput<'a> {
    Text(&'a str),
    Operator { approve: bool },
}

/// Owns the challenge lifecycle: issuance on join, answer evaluation with
/// attempt counting and expiry, and the posting-permission side effects.
///
/// All state transitions go through the repository's atomic conditional
/// primitives, so concurrent workers racing on the same record resolve to
/// exactly one winner.
pub struct VerificationService {
    verification_repo: Arc<dyn VerificationRepository + Send + Sync>,
    platform: Arc<dyn ChatPlatform + Send + Sync>,
}

impl VerificationService {
    pub fn new(
        verification_repo: Arc<dyn VerificationRepository + Send + Sync>,
        platform: Arc<dyn ChatPlatform + Send + Sync>,
    ) -> Self {
        Self {
            verification_repo,
            platform,
        }
    }

    /// Issues a challenge for a newly joined member. Skips when verification
    /// is disabled, the member is bypassed, or a pending record already
    /// exists — losing the issuance race is a no-op, not an error.
    pub async fn handle_join(
        &self,
        room: &Room,
        member_id: &str,
        policy: &VerificationPolicy,
    ) -> Result<Option<VerificationRecord>, Error> {
        if !policy.enabled {
            return Ok(None);
        }
        if policy.bypass_member_ids.iter().any(|m| m == member_id) {
            debug!("member {} bypasses verification in {}", member_id, room.room_id);
            return Ok(None);
        }

        let max_attempts = if policy.max_attempts > 0 {
            policy.max_attempts
        } else {
            3
        };
        let payload = challenge::generate_payload(policy);
        let record = VerificationRecord::new(
            room.room_id,
            member_id,
            payload,
            policy.timeout_s,
            max_attempts,
        );

        if !self.verification_repo.create_if_absent(&record).await? {
            debug!(
                "pending challenge already exists for ({}, {})",
                room.room_id, member_id
            );
            return Ok(None);
        }

        // Safety-net restriction: deliberately longer than the challenge
        // timeout, from its own config knob.
        let until = Utc::now() + Duration::seconds(policy.restrict_safety_s);
        if let Err(e) = self
            .platform
            .restrict_member(room.room_id, member_id, Some(until))
            .await
        {
            warn!("failed to restrict {} in {}: {:?}", member_id, room.room_id, e);
        }

        if let Some(prompt) = challenge::prompt_for(&record.challenge) {
            let keyboard = challenge::keyboard_for(record.verification_id, &record.challenge);
            if let Err(e) = self
                .platform
                .send_message(room.room_id, &prompt, keyboard.as_ref())
                .await
            {
                warn!("failed to send challenge prompt in {}: {:?}", room.room_id, e);
            }
        }

        info!(
            "issued {} challenge {} for member {} in room {}",
            record.challenge.challenge_type(),
            record.verification_id,
            member_id,
            room.room_id
        );
        Ok(Some(record))
    }

    /// A member who leaves with a pending challenge gets it expired, so a
    /// rejoin issues a fresh one and the private-answer lookup cannot serve
    /// a challenge for a room they already left.
    pub async fn handle_leave(&self, room_id: Uuid, member_id: &str) -> Result<(), Error> {
        if let Some(record) = self.pending_record(room_id, member_id).await? {
            self.verification_repo
                .transition_if_pending(record.verification_id, VerificationStatus::Expired, None)
                .await?;
            debug!(
                "expired pending challenge {} after {} left {}",
                record.verification_id, member_id, room_id
            );
        }
        Ok(())
    }

    /// The pending record for a (room, member) pair, resolving the
    /// two-pending anomaly if it is ever observed: the most recently created
    /// record is authoritative and the others are expired.
    pub async fn pending_record(
        &self,
        room_id: Uuid,
        member_id: &str,
    ) -> Result<Option<VerificationRecord>, Error> {
        let mut pendings = self
            .verification_repo
            .all_pending_for(room_id, member_id)
            .await?;
        if pendings.len() > 1 {
            error!(
                "{}",
                Error::InvariantViolation(format!(
                    "{} pending records for ({}, {})",
                    pendings.len(),
                    room_id,
                    member_id
                ))
            );
            for stale in pendings.split_off(1) {
                let _ = self
                    .verification_repo
                    .transition_if_pending(stale.verification_id, VerificationStatus::Expired, None)
                    .await;
            }
        }
        Ok(pendings.into_iter().next())
    }

    /// In-room answer path: a message from a member with a pending record is
    /// consumed as an answer attempt. Membership challenges probe the target
    /// channel instead of comparing text.
    pub async fn answer_record(
        &self,
        record: &VerificationRecord,
        text: &str,
    ) -> Result<AnswerOutcome, Error> {
        let outcome = self.evaluate(record, AnswerInput::Text(text)).await?;
        self.send_outcome_reply(record, &outcome).await;
        Ok(outcome)
    }

    /// Callback-button answer path, resolved by record id from the token.
    /// Deferred records accept operator approve/deny here; everything else
    /// must come from the challenged member.
    pub async fn handle_callback(
        &self,
        caller_member_id: &str,
        token: &str,
    ) -> Result<AnswerOutcome, Error> {
        let Some((verification_id, answer)) = parse_callback_token(token) else {
            debug!("unparseable callback token '{}'", token);
            return Ok(AnswerOutcome::NotFound);
        };
        let Some(record) = self.verification_repo.get(verification_id).await? else {
            debug!("callback for unknown record {}", verification_id);
            return Ok(AnswerOutcome::NotFound);
        };

        let outcome = match &record.challenge {
            ChallengePayload::Deferred => {
                let approve = answer.eq_ignore_ascii_case("approve");
                if !approve && !answer.eq_ignore_ascii_case("deny") {
                    debug!("unexpected operator token '{}' for {}", answer, verification_id);
                    return Ok(AnswerOutcome::NotFound);
                }
                self.evaluate(&record, AnswerInput::Operator { approve })
                    .await?
            }
            _ => {
                if record.member_id != caller_member_id {
                    debug!(
                        "callback for {} from non-owner {}",
                        verification_id, caller_member_id
                    );
                    return Ok(AnswerOutcome::NotFound);
                }
                self.evaluate(&record, AnswerInput::Text(answer)).await?
            }
        };

        self.send_outcome_reply(&record, &outcome).await;
        Ok(outcome)
    }

    /// Private-channel answer path: the one member-scoped lookup. Finds the
    /// member's most recent pending record system-wide and applies the same
    /// evaluation.
    pub async fn answer_private(
        &self,
        member_id: &str,
        text: &str,
    ) -> Result<AnswerOutcome, Error> {
        let Some(record) = self
            .verification_repo
            .latest_pending_for_member(member_id)
            .await?
        else {
            debug!("private answer from {} with no pending record", member_id);
            return Ok(AnswerOutcome::NotFound);
        };
        self.answer_record(&record, text).await
    }

    async fn evaluate(
        &self,
        record: &VerificationRecord,
        input: AnswerInput<'_>,
    ) -> Result<AnswerOutcome, Error> {
        let now = Utc::now();

        if record.status.is_terminal() {
            return Ok(AnswerOutcome::Closed);
        }
        if record.is_expired_at(now) {
            // Transition on read; the record must not be served as live.
            self.verification_repo
                .transition_if_pending(record.verification_id, VerificationStatus::Expired, None)
                .await?;
            return Ok(AnswerOutcome::Expired);
        }

        let matched = match (&record.challenge, &input) {
            (ChallengePayload::Deferred, AnswerInput::Operator { approve }) => {
                if !*approve {
                    self.verification_repo
                        .transition_if_pending(
                            record.verification_id,
                            VerificationStatus::Failed,
                            Some(now),
                        )
                        .await?;
                    return Ok(AnswerOutcome::Failed);
                }
                true
            }
            (ChallengePayload::Deferred, AnswerInput::Text(_)) => {
                return Ok(AnswerOutcome::AwaitingOperator);
            }
            (ChallengePayload::Membership { channel_ref }, _) => {
                let status = self
                    .platform
                    .query_membership(channel_ref, &record.member_id)
                    .await?;
                status == MembershipStatus::Member
            }
            (ChallengePayload::Code { code }, AnswerInput::Text(t)) => {
                t.trim().eq_ignore_ascii_case(code)
            }
            (ChallengePayload::Arithmetic { answer, .. }, AnswerInput::Text(t)) => {
                t.trim().parse::<i64>().map(|v| v == *answer).unwrap_or(false)
            }
            (ChallengePayload::MediaCaption { answer, .. }, AnswerInput::Text(t)) => {
                t.trim().eq_ignore_ascii_case(answer)
            }
            (_, AnswerInput::Operator { .. }) => {
                debug!(
                    "operator input for non-deferred record {}",
                    record.verification_id
                );
                return Ok(AnswerOutcome::Closed);
            }
        };

        if matched {
            let won = self
                .verification_repo
                .transition_if_pending(record.verification_id, VerificationStatus::Passed, Some(now))
                .await?;
            if !won {
                // A concurrent worker closed it first.
                return Ok(AnswerOutcome::Closed);
            }
            if let Err(e) = self
                .platform
                .unrestrict_member(record.room_id, &record.member_id)
                .await
            {
                warn!(
                    "failed to unrestrict {} in {}: {:?}",
                    record.member_id, record.room_id, e
                );
            }
            info!(
                "member {} passed verification {} in room {}",
                record.member_id, record.verification_id, record.room_id
            );
            return Ok(AnswerOutcome::Passed);
        }

        let Some(attempt_count) = self
            .verification_repo
            .record_attempt(record.verification_id)
            .await?
        else {
            return Ok(AnswerOutcome::Closed);
        };

        if attempt_count >= record.max_attempts {
            self.verification_repo
                .transition_if_pending(record.verification_id, VerificationStatus::Failed, Some(now))
                .await?;
            // The posting restriction is not lifted; that is an operator or
            // policy concern.
            info!(
                "member {} failed verification {} in room {}",
                record.member_id, record.verification_id, record.room_id
            );
            return Ok(AnswerOutcome::Failed);
        }

        Ok(AnswerOutcome::Retry {
            attempts_remaining: record.max_attempts - attempt_count,
        })
    }

    async fn send_outcome_reply(&self, record: &VerificationRecord, outcome: &AnswerOutcome) {
        let text = match outcome {
            AnswerOutcome::Passed => "Verification passed — you can post now.".to_string(),
            AnswerOutcome::Retry { attempts_remaining } => format!(
                "That's not the right answer. Attempts remaining: {}.",
                attempts_remaining
            ),
            AnswerOutcome::Failed => {
                "Verification failed. Please contact a room operator.".to_string()
            }
            AnswerOutcome::Expired => "Your verification challenge has expired.".to_string(),
            AnswerOutcome::Closed => "This verification is already closed.".to_string(),
            AnswerOutcome::AwaitingOperator => {
                "Your join request is awaiting operator review.".to_string()
            }
            AnswerOutcome::NotFound => return,
        };
        if let Err(e) = self
            .platform
            .send_message(record.room_id, &text, None)
            .await
        {
            warn!(
                "failed to send verification reply in {}: {:?}",
                record.room_id, e
            );
        }
    }
}

fn parse_callback_token(token: &str) -> Option<(Uuid, &str)> {
    let mut parts = token.splitn(3, ':');
    if parts.next() != Some(challenge::CALLBACK_PREFIX) {
        return None;
    }
    let id = parts.next()?.parse::<Uuid>().ok()?;
    let answer = parts.next()?;
    Some((id, answer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_token_round_trips() {
        let id = Uuid::new_v4();
        let token = challenge::callback_token(id, "7");
        assert_eq!(parse_callback_token(&token), Some((id, "7")));
        assert_eq!(parse_callback_token("verify:not-a-uuid:7"), None);
        assert_eq!(parse_callback_token("other:x"), None);
    }
}
