// File: wardenbot-core/src/repositories/postgres/policies.rs

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use tracing::warn;
use uuid::Uuid;

use wardenbot_common::error::Error;
use wardenbot_common::models::policy::PolicyConfig;
use wardenbot_common::traits::repository_traits::PolicyRepository;

pub struct PostgresPolicyRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresPolicyRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PolicyRepository for PostgresPolicyRepository {
    async fn get_policy(&self, room_id: Uuid) -> Result<Option<PolicyConfig>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT config
            FROM room_policies
            WHERE room_id = $1
            "#,
        )
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await?;

        match row_opt {
            Some(r) => {
                let value: serde_json::Value = r.try_get("config")?;
                let config: PolicyConfig = serde_json::from_value(value)?;
                Ok(Some(config))
            }
            None => Ok(None),
        }
    }

    async fn set_policy(&self, room_id: Uuid, config: &PolicyConfig) -> Result<(), Error> {
        let value = serde_json::to_value(config)?;
        sqlx::query(
            r#"
            INSERT INTO room_policies (room_id, config, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (room_id)
            DO UPDATE SET config = EXCLUDED.config, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(room_id)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn increment_rule_usage(&self, room_id: Uuid, rule_id: Uuid) -> Result<(), Error> {
        // Bookkeeping only; a lost increment under concurrency is acceptable.
        let maybe = self.get_policy(room_id).await?;
        let Some(mut config) = maybe else {
            warn!("increment_rule_usage: no policy stored for room {}", room_id);
            return Ok(());
        };

        let mut touched = false;
        for rule in config.auto_reply.rules.iter_mut() {
            if rule.rule_id == rule_id {
                rule.usage_count += 1;
                touched = true;
                break;
            }
        }
        if touched {
            self.set_policy(room_id, &config).await?;
        }
        Ok(())
    }
}
