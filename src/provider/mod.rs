mod cluster;
mod docker;
mod kubernetes;

pub use cluster::ClusterProvider;
pub use docker::{DockerApi, DockerProvider};
pub use kubernetes::KubernetesProvider;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::{Result, RoomError};
use crate::repository::{Room, RoomRepository};

/// Caller-supplied settings for a new room
#[derive(Debug, Clone, Default)]
pub struct CreateRoomOptions {
    /// Display title; falls back to the room id
    pub title: Option<String>,
    /// User that owns the room
    pub owner_id: Option<String>,
}

/// Contract every provisioning backend implements. The controller owns id
/// allocation; providers trust the room id they are handed and never
/// re-check it against other backends.
#[async_trait]
pub trait RoomProvider: Send + Sync {
    /// Provisions a runtime for `room_id`, registers it in the repository
    /// and returns its record. Must never report success while leaving the
    /// runtime and the repository out of step.
    async fn create_room(&self, room_id: &str, options: CreateRoomOptions) -> Result<Room>;

    /// Tears down the runtime and removes the repository record.
    /// Infrastructure failures propagate; a room that is already gone does
    /// not.
    async fn delete_room(&self, room_id: &str) -> Result<()>;

    /// Inspects live runtime state, persists the refreshed status and
    /// returns it. Unknown rooms yield `None`.
    async fn get_room_status(&self, room_id: &str) -> Result<Option<Room>>;

    /// Every room the repository considers active
    async fn list_rooms(&self) -> Result<Vec<Room>>;

    /// Teardown sweep over rooms flagged by reconciliation. Detection and
    /// deletion stay decoupled so either can fail without blocking the
    /// other.
    async fn cleanup(&self) -> Result<()>;

    /// Repository read used by the controller to probe id availability
    async fn get_room_info(&self, room_id: &str) -> Result<Option<Room>>;
}

/// Builds the backend named by configuration. Selection happens once at
/// startup; everything downstream sees only the trait object.
pub fn from_config(
    config: &Config,
    repository: Arc<dyn RoomRepository>,
) -> Result<Arc<dyn RoomProvider>> {
    match config.provider.backend.as_str() {
        "docker" => {
            let provider = DockerProvider::new(&config.docker, repository)?;
            Ok(Arc::new(provider))
        }
        "cluster" => Ok(Arc::new(ClusterProvider::new())),
        "kubernetes" => Ok(Arc::new(KubernetesProvider::new())),
        other => Err(RoomError::InvalidConfiguration(format!(
            "unknown room provider backend: {}",
            other
        ))),
    }
}
