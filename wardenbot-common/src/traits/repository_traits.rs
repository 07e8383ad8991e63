// File: wardenbot-common/src/traits/repository_traits.rs

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::Error;
use crate::models::policy::PolicyConfig;
use crate::models::rate::RateEntry;
use crate::models::room::Room;
use crate::models::verification::{VerificationRecord, VerificationStatus};

#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn create_room(&self, room: &Room) -> Result<(), Error>;
    async fn get_room(&self, room_id: Uuid) -> Result<Option<Room>, Error>;
    async fn get_room_by_chat_id(&self, platform_chat_id: &str) -> Result<Option<Room>, Error>;
    async fn list_rooms(&self) -> Result<Vec<Room>, Error>;
}

#[async_trait]
pub trait PolicyRepository: Send + Sync {
    async fn get_policy(&self, room_id: Uuid) -> Result<Option<PolicyConfig>, Error>;
    async fn set_policy(&self, room_id: Uuid, config: &PolicyConfig) -> Result<(), Error>;
    /// Usage bookkeeping for auto-reply rules. Called best-effort after a
    /// reply is sent; not part of the matching decision.
    async fn increment_rule_usage(&self, room_id: Uuid, rule_id: Uuid) -> Result<(), Error>;
}

/// Read side of the policy config as the pipeline sees it. Implementations
/// may cache; the core only requires eventual consistency. A room with no
/// stored policy yields the all-disabled default.
#[async_trait]
pub trait PolicyProvider: Send + Sync {
    async fn get_policy_config(&self, room_id: Uuid) -> Result<PolicyConfig, Error>;
}

#[async_trait]
pub trait VerificationRepository: Send + Sync {
    /// Atomic insert-if-absent against the one-pending-per-(room, member)
    /// constraint. Returns false when a pending record already exists; the
    /// loser of a concurrent race sees false, never an error.
    async fn create_if_absent(&self, record: &VerificationRecord) -> Result<bool, Error>;

    async fn get(&self, verification_id: Uuid) -> Result<Option<VerificationRecord>, Error>;

    async fn find_pending(
        &self,
        room_id: Uuid,
        member_id: &str,
    ) -> Result<Option<VerificationRecord>, Error>;

    /// All pending records for the pair, newest first. Under the invariant
    /// this returns at most one row; more than one is an anomaly the caller
    /// resolves.
    async fn all_pending_for(
        &self,
        room_id: Uuid,
        member_id: &str,
    ) -> Result<Vec<VerificationRecord>, Error>;

    /// Member-scoped lookup for the private-answer path: the most recent
    /// pending record system-wide, by creation time descending.
    async fn latest_pending_for_member(
        &self,
        member_id: &str,
    ) -> Result<Option<VerificationRecord>, Error>;

    /// Atomic update-if-status-pending. Returns false when the record was
    /// not pending (already transitioned by a concurrent worker).
    async fn transition_if_pending(
        &self,
        verification_id: Uuid,
        to: VerificationStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<bool, Error>;

    /// Atomically increments the attempt counter of a pending record and
    /// returns the new count, or None when the record was not pending.
    async fn record_attempt(&self, verification_id: Uuid) -> Result<Option<i32>, Error>;

    /// Bulk-transitions overdue pending records to expired. Returns how many
    /// rows changed.
    async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<u64, Error>;
}

/// Pluggable store for the ephemeral rate windows: a shared TTL store in
/// production, a bounded in-memory map in tests or single-instance mode.
/// Loss of this state only resets spam-detection memory.
#[async_trait]
pub trait RateWindowStore: Send + Sync {
    async fn fetch(&self, room_id: Uuid, member_id: &str) -> Result<Vec<RateEntry>, Error>;

    /// Replaces the window for the key and (re)arms its TTL.
    async fn store(
        &self,
        room_id: Uuid,
        member_id: &str,
        entries: &[RateEntry],
        ttl: Duration,
    ) -> Result<(), Error>;

    async fn clear(&self, room_id: Uuid, member_id: &str) -> Result<(), Error>;

    /// Drops keys whose TTL has lapsed. Returns how many keys were removed.
    async fn sweep(&self, now: DateTime<Utc>) -> Result<u64, Error>;
}
