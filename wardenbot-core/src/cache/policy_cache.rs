// File: wardenbot-core/src/cache/policy_cache.rs

use std::sync::Arc;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use wardenbot_common::error::Error;
use wardenbot_common::models::policy::PolicyConfig;
use wardenbot_common::traits::repository_traits::{PolicyProvider, PolicyRepository};

#[derive(Debug, Clone)]
struct CachedPolicy {
    config: PolicyConfig,
    fetched_at: DateTime<Utc>,
}

/// Read-through cache over the policy repository. Entries are reused for
/// `max_age_s` seconds, so a policy edit can take up to that long to reach
/// the pipeline — eventual consistency is all the core requires.
pub struct CachedPolicyProvider {
    repo: Arc<dyn PolicyRepository + Send + Sync>,
    cache: DashMap<Uuid, CachedPolicy>,
    max_age_s: i64,
}

impl CachedPolicyProvider {
    pub fn new(repo: Arc<dyn PolicyRepository + Send + Sync>, max_age_s: i64) -> Self {
        Self {
            repo,
            cache: DashMap::new(),
            max_age_s,
        }
    }

    pub fn invalidate(&self, room_id: Uuid) {
        self.cache.remove(&room_id);
    }

    fn prune(&self) {
        let now = Utc::now();
        let mut to_remove = Vec::new();
        for entry in self.cache.iter() {
            let age = now.signed_duration_since(entry.value().fetched_at);
            if age.num_seconds() >= self.max_age_s {
                to_remove.push(*entry.key());
            }
        }
        for key in to_remove {
            self.cache.remove(&key);
        }
    }
}

#[async_trait]
impl PolicyProvider for CachedPolicyProvider {
    async fn get_policy_config(&self, room_id: Uuid) -> Result<PolicyConfig, Error> {
        self.prune();

        if let Some(entry) = self.cache.get(&room_id) {
            return Ok(entry.config.clone());
        }

        // Rooms with no stored policy get the all-disabled default.
        let config = self.repo.get_policy(room_id).await?.unwrap_or_default();
        debug!("policy cache miss for room {}", room_id);
        self.cache.insert(
            room_id,
            CachedPolicy {
                config: config.clone(),
                fetched_at: Utc::now(),
            },
        );
        Ok(config)
    }
}
