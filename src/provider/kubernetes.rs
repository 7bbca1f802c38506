use async_trait::async_trait;

use super::{CreateRoomOptions, RoomProvider};
use crate::error::{Result, RoomError};
use crate::repository::Room;

const BACKEND: &str = "kubernetes";

/// Placeholder for a Kubernetes backend (one pod or deployment per room).
/// Every operation fails until the backend lands.
pub struct KubernetesProvider;

impl KubernetesProvider {
    pub fn new() -> Self {
        tracing::warn!(backend = BACKEND, "Selected provider backend is a stub");
        Self
    }
}

impl Default for KubernetesProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomProvider for KubernetesProvider {
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
