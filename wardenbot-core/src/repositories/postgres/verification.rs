// File: wardenbot-core/src/repositories/postgres/verification.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use wardenbot_common::error::Error;
use wardenbot_common::models::verification::{
    ChallengePayload, VerificationRecord, VerificationStatus,
};
use wardenbot_common::traits::repository_traits::VerificationRepository;

pub struct PostgresVerificationRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresVerificationRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

const RECORD_COLUMNS: &str = r#"
    verification_id,
    room_id,
    member_id,
    challenge,
    status,
    attempt_count,
    max_attempts,
    created_at,
    expires_at,
    completed_at
"#;

fn row_to_record(r: &sqlx::postgres::PgRow) -> Result<VerificationRecord, Error> {
    let challenge_value: serde_json::Value = r.try_get("challenge")?;
    let challenge: ChallengePayload = serde_json::from_value(challenge_value)?;
    Ok(VerificationRecord {
        verification_id: r.try_get("verification_id")?,
        room_id: r.try_get("room_id")?,
        member_id: r.try_get("member_id")?,
        challenge,
        status: r.try_get("status")?,
        attempt_count: r.try_get("attempt_count")?,
        max_attempts: r.try_get("max_attempts")?,
        created_at: r.try_get("created_at")?,
        expires_at: r.try_get("expires_at")?,
        completed_at: r.try_get("completed_at")?,
    })
}

#[async_trait]
impl VerificationRepository for PostgresVerificationRepository {
    async fn create_if_absent(&self, record: &VerificationRecord) -> Result<bool, Error> {
        let challenge = serde_json::to_value(&record.challenge)?;
        // The conflict target is the partial unique index on
        // (room_id, member_id) WHERE status = 'pending'; the loser of a
        // concurrent issuance race inserts zero rows.
        let result = sqlx::query(
            r#"
            INSERT INTO verification_records (
                verification_id,
                room_id,
                member_id,
                challenge_type,
                challenge,
                status,
                attempt_count,
                max_attempts,
                created_at,
                expires_at,
                completed_at
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
            ON CONFLICT (room_id, member_id) WHERE status = 'pending'
            DO NOTHING
            "#,
        )
        .bind(record.verification_id)
        .bind(record.room_id)
        .bind(&record.member_id)
        .bind(record.challenge.challenge_type())
        .bind(challenge)
        .bind(record.status)
        .bind(record.attempt_count)
        .bind(record.max_attempts)
        .bind(record.created_at)
        .bind(record.expires_at)
        .bind(record.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get(&self, verification_id: Uuid) -> Result<Option<VerificationRecord>, Error> {
        let row_opt = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM verification_records WHERE verification_id = $1"
        ))
        .bind(verification_id)
        .fetch_optional(&self.pool)
        .await?;

        match row_opt {
            Some(r) => Ok(Some(row_to_record(&r)?)),
            None => Ok(None),
        }
    }

    async fn find_pending(
        &self,
        room_id: Uuid,
        member_id: &str,
    ) -> Result<Option<VerificationRecord>, Error> {
        let row_opt = sqlx::query(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM verification_records
            WHERE room_id = $1 AND member_id = $2 AND status = 'pending'
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(room_id)
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;

        match row_opt {
            Some(r) => Ok(Some(row_to_record(&r)?)),
            None => Ok(None),
        }
    }

    async fn all_pending_for(
        &self,
        room_id: Uuid,
        member_id: &str,
    ) -> Result<Vec<VerificationRecord>, Error> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM verification_records
            WHERE room_id = $1 AND member_id = $2 AND status = 'pending'
            ORDER BY created_at DESC
            "#
        ))
        .bind(room_id)
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::new();
        for r in rows {
            out.push(row_to_record(&r)?);
        }
        Ok(out)
    }

    async fn latest_pending_for_member(
        &self,
        member_id: &str,
    ) -> Result<Option<VerificationRecord>, Error> {
        let row_opt = sqlx::query(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM verification_records
            WHERE member_id = $1 AND status = 'pending'
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;

        match row_opt {
            Some(r) => Ok(Some(row_to_record(&r)?)),
            None => Ok(None),
        }
    }

    async fn transition_if_pending(
        &self,
        verification_id: Uuid,
        to: VerificationStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<bool, Error> {
        let result = sqlx::query(
            r#"
            UPDATE verification_records
            SET status = $2, completed_at = $3
            WHERE verification_id = $1 AND status = 'pending'
            "#,
        )
        .bind(verification_id)
        .bind(to)
        .bind(completed_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_attempt(&self, verification_id: Uuid) -> Result<Option<i32>, Error> {
        let row_opt = sqlx::query(
            r#"
            UPDATE verification_records
            SET attempt_count = attempt_count + 1
            WHERE verification_id = $1 AND status = 'pending'
            RETURNING attempt_count
            "#,
        )
        .bind(verification_id)
        .fetch_optional(&self.pool)
        .await?;

        match row_opt {
            Some(r) => Ok(Some(r.try_get("attempt_count")?)),
            None => Ok(None),
        }
    }

    async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            UPDATE verification_records
            SET status = 'expired'
            WHERE status = 'pending' AND expires_at < $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
