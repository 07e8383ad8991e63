// File: wardenbot-core/src/repositories/postgres/rooms.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use wardenbot_common::error::Error;
use wardenbot_common::models::room::Room;
use wardenbot_common::traits::repository_traits::RoomRepository;

pub struct PostgresRoomRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresRoomRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_room(r: &sqlx::postgres::PgRow) -> Result<Room, Error> {
    Ok(Room {
        room_id: r.try_get("room_id")?,
        platform_chat_id: r.try_get("platform_chat_id")?,
        title: r.try_get("title")?,
        is_active: r.try_get("is_active")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

#[async_trait]
impl RoomRepository for PostgresRoomRepository {
    async fn create_room(&self, room: &Room) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO rooms (
                room_id,
                platform_chat_id,
                title,
                is_active,
                created_at,
                updated_at
            )
            VALUES ($1,$2,$3,$4,$5,$6)
            "#,
        )
        .bind(room.room_id)
        .bind(&room.platform_chat_id)
        .bind(&room.title)
        .bind(room.is_active)
        .bind(room.created_at)
        .bind(room.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_room(&self, room_id: Uuid) -> Result<Option<Room>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT room_id, platform_chat_id, title, is_active, created_at, updated_at
            FROM rooms
            WHERE room_id = $1
            "#,
        )
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await?;

        match row_opt {
            Some(r) => Ok(Some(row_to_room(&r)?)),
            None => Ok(None),
        }
    }

    async fn get_room_by_chat_id(&self, platform_chat_id: &str) -> Result<Option<Room>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT room_id, platform_chat_id, title, is_active, created_at, updated_at
            FROM rooms
            WHERE platform_chat_id = $1
            "#,
        )
        .bind(platform_chat_id)
        .fetch_optional(&self.pool)
        .await?;

        match row_opt {
            Some(r) => Ok(Some(row_to_room(&r)?)),
            None => Ok(None),
        }
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT room_id, platform_chat_id, title, is_active, created_at, updated_at
            FROM rooms
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::new();
        for r in rows {
            out.push(row_to_room(&r)?);
        }
        Ok(out)
    }
}
