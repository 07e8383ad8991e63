// File: wardenbot-common/src/models/verification.rs

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::policy::ChallengeType;

/// Lifecycle of a challenge record. `Pending` is the only live state;
/// the other three are terminal and never reopened.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Passed,
    Failed,
    Expired,
}

impl VerificationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, VerificationStatus::Pending)
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationStatus::Pending => write!(f, "pending"),
            VerificationStatus::Passed => write!(f, "passed"),
            VerificationStatus::Failed => write!(f, "failed"),
            VerificationStatus::Expired => write!(f, "expired"),
        }
    }
}

impl FromStr for VerificationStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(VerificationStatus::Pending),
            "passed" => Ok(VerificationStatus::Passed),
            "failed" => Ok(VerificationStatus::Failed),
            "expired" => Ok(VerificationStatus::Expired),
            _ => Err(format!("Unknown verification status: {}", s)),
        }
    }
}

/// Type-specific challenge material. Persisted as JSON alongside the record.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChallengePayload {
    /// Satisfied by an external "is current member of target channel" query.
    Membership { channel_ref: String },
    Code { code: String },
    Arithmetic { question: String, answer: i64 },
    MediaCaption { media_ref: String, answer: String },
    /// No material; resolved only by an operator decision or expiry.
    Deferred,
}

impl ChallengePayload {
    pub fn challenge_type(&self) -> ChallengeType {
        match self {
            ChallengePayload::Membership { .. } => ChallengeType::Membership,
            ChallengePayload::Code { .. } => ChallengeType::Code,
            ChallengePayload::Arithmetic { .. } => ChallengeType::Arithmetic,
            ChallengePayload::MediaCaption { .. } => ChallengeType::MediaCaption,
            ChallengePayload::Deferred => ChallengeType::Deferred,
        }
    }
}

/// One issued challenge for a (room, member) pair.
///
/// Invariant: at most one record with `status = pending` exists per
/// (room_id, member_id) at any instant. The store enforces this with an
/// atomic insert-if-absent; see `VerificationRepository::create_if_absent`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VerificationRecord {
    pub verification_id: Uuid,
    pub room_id: Uuid,
    pub member_id: String,
    pub challenge: ChallengePayload,
    pub status: VerificationStatus,
    pub attempt_count: i32,
    pub max_attempts: i32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl VerificationRecord {
    pub fn new(
        room_id: Uuid,
        member_id: &str,
        challenge: ChallengePayload,
        timeout_s: i64,
        max_attempts: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            verification_id: Uuid::new_v4(),
            room_id,
            member_id: member_id.to_string(),
            challenge,
            status: VerificationStatus::Pending,
            attempt_count: 0,
            max_attempts,
            created_at: now,
            expires_at: now + Duration::seconds(timeout_s),
            completed_at: None,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn attempts_remaining(&self) -> i32 {
        (self.max_attempts - self.attempt_count).max(0)
    }
}
