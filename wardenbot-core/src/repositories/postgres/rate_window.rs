// File: wardenbot-core/src/repositories/postgres/rate_window.rs

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use wardenbot_common::error::Error;
use wardenbot_common::models::rate::RateEntry;
use wardenbot_common::traits::repository_traits::RateWindowStore;

/// Shared TTL store for rate windows. One row per (room, member); stale rows
/// read as absent and are reaped by `sweep`.
pub struct PostgresRateWindowStore {
    pub pool: Pool<Postgres>,
}

impl PostgresRateWindowStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateWindowStore for PostgresRateWindowStore {
    async fn fetch(&self, room_id: Uuid, member_id: &str) -> Result<Vec<RateEntry>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT entries
            FROM rate_windows
            WHERE room_id = $1 AND member_id = $2 AND expires_at > $3
            "#,
        )
        .bind(room_id)
        .bind(member_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match row_opt {
            Some(r) => {
                let value: serde_json::Value = r.try_get("entries")?;
                let entries: Vec<RateEntry> = serde_json::from_value(value)?;
                Ok(entries)
            }
            None => Ok(Vec::new()),
        }
    }

    async fn store(
        &self,
        room_id: Uuid,
        member_id: &str,
        entries: &[RateEntry],
        ttl: Duration,
    ) -> Result<(), Error> {
        let value = serde_json::to_value(entries)?;
        sqlx::query(
            r#"
            INSERT INTO rate_windows (room_id, member_id, entries, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (room_id, member_id)
            DO UPDATE SET entries = EXCLUDED.entries, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(room_id)
        .bind(member_id)
        .bind(value)
        .bind(Utc::now() + ttl)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear(&self, room_id: Uuid, member_id: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM rate_windows WHERE room_id = $1 AND member_id = $2")
            .bind(room_id)
            .bind(member_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn sweep(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM rate_windows WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
