// File: wardenbot-core/src/repositories/memory/verification.rs

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use wardenbot_common::error::Error;
use wardenbot_common::models::verification::{VerificationRecord, VerificationStatus};
use wardenbot_common::traits::repository_traits::VerificationRepository;

/// One mutex guards the whole map so that check-and-insert and
/// check-and-update are as atomic here as the conditional SQL statements are
/// in the Postgres implementation.
#[derive(Default)]
pub struct MemoryVerificationRepository {
    records: Mutex<HashMap<Uuid, VerificationRecord>>,
}

impl MemoryVerificationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VerificationRepository for MemoryVerificationRepository {
    async fn create_if_absent(&self, record: &VerificationRecord) -> Result<bool, Error> {
        let mut lock = self.records.lock().unwrap();
        let already_pending = lock.values().any(|r| {
            r.room_id == record.room_id
                && r.member_id == record.member_id
                && r.status == VerificationStatus::Pending
        });
        if already_pending {
            return Ok(false);
        }
        lock.insert(record.verification_id, record.clone());
        Ok(true)
    }

    async fn get(&self, verification_id: Uuid) -> Result<Option<VerificationRecord>, Error> {
        let lock = self.records.lock().unwrap();
        Ok(lock.get(&verification_id).cloned())
    }

    async fn find_pending(
        &self,
        room_id: Uuid,
        member_id: &str,
    ) -> Result<Option<VerificationRecord>, Error> {
        let lock = self.records.lock().unwrap();
        Ok(lock
            .values()
            .filter(|r| {
                r.room_id == room_id
                    && r.member_id == member_id
                    && r.status == VerificationStatus::Pending
            })
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn all_pending_for(
        &self,
        room_id: Uuid,
        member_id: &str,
    ) -> Result<Vec<VerificationRecord>, Error> {
        let lock = self.records.lock().unwrap();
        let mut out: Vec<VerificationRecord> = lock
            .values()
            .filter(|r| {
                r.room_id == room_id
                    && r.member_id == member_id
                    && r.status == VerificationStatus::Pending
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn latest_pending_for_member(
        &self,
        member_id: &str,
    ) -> Result<Option<VerificationRecord>, Error> {
        let lock = self.records.lock().unwrap();
        Ok(lock
            .values()
            .filter(|r| r.member_id == member_id && r.status == VerificationStatus::Pending)
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn transition_if_pending(
        &self,
        verification_id: Uuid,
        to: VerificationStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<bool, Error> {
        let mut lock = self.records.lock().unwrap();
        match lock.get_mut(&verification_id) {
            Some(r) if r.status == VerificationStatus::Pending => {
                r.status = to;
                r.completed_at = completed_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_attempt(&self, verification_id: Uuid) -> Result<Option<i32>, Error> {
        let mut lock = self.records.lock().unwrap();
        match lock.get_mut(&verification_id) {
            Some(r) if r.status == VerificationStatus::Pending => {
                r.attempt_count += 1;
                Ok(Some(r.attempt_count))
            }
            _ => Ok(None),
        }
    }

    async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        let mut lock = self.records.lock().unwrap();
        let mut changed = 0u64;
        for r in lock.values_mut() {
            if r.status == VerificationStatus::Pending && r.expires_at < now {
                r.status = VerificationStatus::Expired;
                changed += 1;
            }
        }
        Ok(changed)
    }
}
