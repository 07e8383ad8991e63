// File: wardenbot-core/src/repositories/memory/policies.rs

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use wardenbot_common::error::Error;
use wardenbot_common::models::policy::PolicyConfig;
use wardenbot_common::traits::repository_traits::PolicyRepository;

#[derive(Default)]
pub struct MemoryPolicyRepository {
    policies: DashMap<Uuid, PolicyConfig>,
}

impl MemoryPolicyRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PolicyRepository for MemoryPolicyRepository {
    async fn get_policy(&self, room_id: Uuid) -> Result<Option<PolicyConfig>, Error> {
        Ok(self.policies.get(&room_id).map(|p| p.clone()))
    }

    async fn set_policy(&self, room_id: Uuid, config: &PolicyConfig) -> Result<(), Error> {
        self.policies.insert(room_id, config.clone());
        Ok(())
    }

    async fn increment_rule_usage(&self, room_id: Uuid, rule_id: Uuid) -> Result<(), Error> {
        if let Some(mut entry) = self.policies.get_mut(&room_id) {
            for rule in entry.auto_reply.rules.iter_mut() {
                if rule.rule_id == rule_id {
                    rule.usage_count += 1;
                    break;
                }
            }
        }
        Ok(())
    }
}
