// File: wardenbot-core/src/repositories/memory/rooms.rs

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use wardenbot_common::error::Error;
use wardenbot_common::models::room::Room;
use wardenbot_common::traits::repository_traits::RoomRepository;

#[derive(Default)]
pub struct MemoryRoomRepository {
    rooms: DashMap<Uuid, Room>,
}

impl MemoryRoomRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomRepository for MemoryRoomRepository {
    async fn create_room(&self, room: &Room) -> Result<(), Error> {
        self.rooms.insert(room.room_id, room.clone());
        Ok(())
    }

    async fn get_room(&self, room_id: Uuid) -> Result<Option<Room>, Error> {
        Ok(self.rooms.get(&room_id).map(|r| r.clone()))
    }

    async fn get_room_by_chat_id(&self, platform_chat_id: &str) -> Result<Option<Room>, Error> {
        Ok(self
            .rooms
            .iter()
            .find(|r| r.platform_chat_id == platform_chat_id)
            .map(|r| r.clone()))
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, Error> {
        let mut rooms: Vec<Room> = self.rooms.iter().map(|r| r.clone()).collect();
        rooms.sort_by_key(|r| r.created_at);
        Ok(rooms)
    }
}
