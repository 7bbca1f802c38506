use async_trait::async_trait;

use super::{CreateRoomOptions, RoomProvider};
use crate::error::{Result, RoomError};
use crate::repository::Room;

const BACKEND: &str = "cluster";

/// Placeholder for a cluster-of-processes backend. Selectable by
/// configuration so deployments can wire it up ahead of time, but every
/// operation fails until the backend lands.
pub struct ClusterProvider;

impl ClusterProvider {
    pub fn new() -> Self {
        tracing::warn!(backend = BACKEND, "Selected provider backend is a stub");
        Self
    }
}

impl Default for ClusterProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomProvider for ClusterProvider {
    async fn create_room(&self, _room_id: &str, _options: CreateRoomOptions) -> Result<Room> {
        Err(RoomError::ProviderUnimplemented(BACKEND.to_string()))
    }

    async fn delete_room(&self, _room_id: &str) -> Result<()> {
        Err(RoomError::ProviderUnimplemented(BACKEND.to_string()))
    }

    async fn get_room_status(&self, _room_id: &str) -> Result<Option<Room>> {
        Err(RoomError::ProviderUnimplemented(BACKEND.to_string()))
    }

    async fn list_rooms(&self) -> Result<Vec<Room>> {
        Err(RoomError::ProviderUnimplemented(BACKEND.to_string()))
    }

    async fn cleanup(&self) -> Result<()> {
        Err(RoomError::ProviderUnimplemented(BACKEND.to_string()))
    }

    async fn get_room_info(&self, _room_id: &str) -> Result<Option<Room>> {
        Err(RoomError::ProviderUnimplemented(BACKEND.to_string()))
    }
}
