// File: wardenbot-common/src/traits/platform_traits.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::models::auto_reply::ReplyContent;
use crate::models::message::Keyboard;
use crate::models::policy::Punishment;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    Member,
    NotMember,
    Unknown,
}

/// Outbound surface to the chat platform. The transport layer implements
/// this; the core never talks to the network itself. Every method is a
/// potential suspension point and may fail transiently; call sites own
/// their fallback.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Sends a plain text message, optionally with an inline keyboard.
    /// Returns the platform message id when the platform reports one.
    async fn send_message(
        &self,
        room_id: Uuid,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<Option<String>, Error>;

    /// Sends rich auto-reply content. Delivery formatting is the
    /// implementation's concern.
    async fn send_reply(
        &self,
        room_id: Uuid,
        content: &ReplyContent,
    ) -> Result<Option<String>, Error>;

    async fn delete_message(&self, room_id: Uuid, message_id: &str) -> Result<(), Error>;

    /// Revokes a member's posting permission, optionally until a deadline.
    async fn restrict_member(
        &self,
        room_id: Uuid,
        member_id: &str,
        until: Option<DateTime<Utc>>,
    ) -> Result<(), Error>;

    async fn unrestrict_member(&self, room_id: Uuid, member_id: &str) -> Result<(), Error>;

    /// Removes a member from the room; `permanent` distinguishes ban from
    /// kick.
    async fn remove_member(
        &self,
        room_id: Uuid,
        member_id: &str,
        permanent: bool,
    ) -> Result<(), Error>;

    /// Membership probe for membership-type challenges.
    async fn query_membership(
        &self,
        channel_ref: &str,
        member_id: &str,
    ) -> Result<MembershipStatus, Error>;
}

/// A content-policy hit, as reported by the opaque predicate.
#[derive(Debug, Clone)]
pub struct ContentViolation {
    pub rule: String,
    pub punishment: Punishment,
}

/// Opaque content-policy predicate (advertisement heuristics and friends
/// live behind this). The core only applies the configured punishment.
#[async_trait]
pub trait ContentPolicy: Send + Sync {
    async fn review(
        &self,
        room_id: Uuid,
        member_id: &str,
        text: &str,
    ) -> Result<Option<ContentViolation>, Error>;
}

/// External command handling; the pipeline dispatches and stops.
#[async_trait]
pub trait CommandSink: Send + Sync {
    async fn dispatch(&self, room_id: Uuid, member_id: &str, text: &str) -> Result<(), Error>;
}

/// Points/gamification collaborator. Called fire-and-forget for messages
/// that pass every check.
#[async_trait]
pub trait PointsSink: Send + Sync {
    async fn award_activity(&self, room_id: Uuid, member_id: &str, text: &str)
        -> Result<(), Error>;
}
