use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::config::ProviderConfig;
use crate::error::{Result, RoomError};
use crate::provider::{CreateRoomOptions, RoomProvider};
use crate::repository::{Room, RoomRepository};

/// Orchestration entry point: allocates room codes, delegates provisioning
/// to the configured backend, and drives the periodic cleanup sweep.
pub struct RoomsController {
    provider: Arc<dyn RoomProvider>,
    repository: Arc<dyn RoomRepository>,
    id_length: usize,
    max_id_attempts: u32,
}

impl RoomsController {
    pub fn new(
        provider: Arc<dyn RoomProvider>,
        repository: Arc<dyn RoomRepository>,
        config: &ProviderConfig,
    ) -> Self {
        Self {
            provider,
            repository,
            id_length: config.room_id_length,
            max_id_attempts: config.create_max_attempts,
        }
    }

    /// A fixed-length digit string. Uniqueness is not guaranteed here; the
    /// allocation loop and the store's write-time check handle collisions.
    pub fn generate_room_id(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.id_length)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }

    /// Optimistic allocation: probe a candidate id, then create. A
    /// collision at either step regenerates, bounded so an exhausted id
    /// space (or a dead backend answering "taken" forever) surfaces as an
    /// allocation error instead of an infinite loop.
    pub async fn create_room(&self, options: CreateRoomOptions) -> Result<Room> {
        for attempt in 1..=self.max_id_attempts {
            let candidate = self.generate_room_id();

            if self.provider.get_room_info(&candidate).await?.is_some() {
                tracing::debug!(room_id = %candidate, attempt, "Candidate id taken, regenerating");
                continue;
            }

            match self.provider.create_room(&candidate, options.clone()).await {
                Ok(room) => {
                    tracing::info!(room_id = %room.id, attempt, "Room created");
                    return Ok(room);
                }
                // Lost the check-then-act race; another create claimed the
                // id between our probe and our write.
                Err(RoomError::RoomAlreadyExists(_)) => {
                    tracing::warn!(room_id = %candidate, attempt, "Id claimed concurrently, regenerating");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(RoomError::IdSpaceExhausted {
            attempts: self.max_id_attempts,
        })
    }

    pub async fn delete_room(&self, room_id: &str) -> Result<()> {
        self.provider.delete_room(room_id).await
    }

    pub async fn get_room_status(&self, room_id: &str) -> Result<Option<Room>> {
        self.provider.get_room_status(room_id).await
    }

    pub async fn list_rooms(&self) -> Result<Vec<Room>> {
        self.provider.list_rooms().await
    }

    pub async fn get_room_info(&self, room_id: &str) -> Result<Option<Room>> {
        self.provider.get_room_info(room_id).await
    }

    pub async fn get_rooms_by_owner(&self, owner_id: &str) -> Result<Vec<Room>> {
        self.repository.get_by_owner(owner_id).await
    }

    /// Persists caller-modified room fields. False means the room is gone.
    pub async fn update_room(&self, room: &Room) -> Result<bool> {
        self.repository.update(room).await
    }

    /// Repository-level rename. Returns false for an absent room; a title
    /// already used by another of the owner's rooms is a conflict.
    pub async fn rename_room(&self, room_id: &str, name: &str) -> Result<bool> {
        let Some(mut room) = self.repository.get(room_id).await? else {
            return Ok(false);
        };

        if let Some(owner) = &room.owner_id {
            let siblings = self.repository.get_by_owner(owner).await?;
            if siblings.iter().any(|r| r.id != room.id && r.name == name) {
                return Err(RoomError::TitleAlreadyExists(name.to_string()));
            }
        }

        room.name = name.to_string();
        self.repository.update(&room).await
    }

    /// Fire-and-forget cleanup ticks: a failing pass is logged and the next
    /// tick proceeds independently.
    pub fn start_cleanup_scheduler(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let provider = self.provider.clone();
        tokio::spawn(async move {
            tracing::info!(interval_secs = interval.as_secs(), "Cleanup scheduler started");
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = provider.cleanup().await {
                    tracing::error!(error = %e, "Cleanup pass failed");
                }
            }
        })
    }
}
