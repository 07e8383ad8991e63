// File: wardenbot-core/src/repositories/memory/rate_window.rs

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use wardenbot_common::error::Error;
use wardenbot_common::models::rate::RateEntry;
use wardenbot_common::traits::repository_traits::RateWindowStore;

#[derive(Debug, Clone)]
struct StoredWindow {
    entries: Vec<RateEntry>,
    expires_at: DateTime<Utc>,
}

/// Bounded in-memory fallback for the rate windows. Keys expire by TTL; an
/// explicit `sweep` drops dead keys, and `MAX_KEYS` caps growth between
/// sweeps.
#[derive(Default)]
pub struct MemoryRateWindowStore {
    windows: DashMap<(Uuid, String), StoredWindow>,
}

const MAX_KEYS: usize = 100_000;

impl MemoryRateWindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[async_trait]
impl RateWindowStore for MemoryRateWindowStore {
    async fn fetch(&self, room_id: Uuid, member_id: &str) -> Result<Vec<RateEntry>, Error> {
        let key = (room_id, member_id.to_string());
        match self.windows.get(&key) {
            Some(w) if w.expires_at > Utc::now() => Ok(w.entries.clone()),
            _ => Ok(Vec::new()),
        }
    }

    async fn store(
        &self,
        room_id: Uuid,
        member_id: &str,
        entries: &[RateEntry],
        ttl: Duration,
    ) -> Result<(), Error> {
        if self.windows.len() >= MAX_KEYS {
            let now = Utc::now();
            self.windows.retain(|_, w| w.expires_at > now);
        }
        self.windows.insert(
            (room_id, member_id.to_string()),
            StoredWindow {
                entries: entries.to_vec(),
                expires_at: Utc::now() + ttl,
            },
        );
        Ok(())
    }

    async fn clear(&self, room_id: Uuid, member_id: &str) -> Result<(), Error> {
        self.windows.remove(&(room_id, member_id.to_string()));
        Ok(())
    }

    async fn sweep(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        let before = self.windows.len();
        self.windows.retain(|_, w| w.expires_at > now);
        Ok((before - self.windows.len()) as u64)
    }
}
