mod memory;
mod mongo;

pub use memory::InMemoryRoomRepository;
pub use mongo::MongoRoomRepository;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::StoreConfig;
use crate::error::{Result, RoomError};

/// Name of the document collection holding room records
pub const ROOM_COLLECTION: &str = "rooms";

/// Lifecycle of a room compute unit.
///
/// A room is `Provisioning` from creation until its runtime answers a health
/// check, `Active` while healthy, `MarkedForCleanup` once reconciliation
/// finds it stale, and `Deleting` while teardown is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoomStatus {
    Provisioning,
    Active,
    MarkedForCleanup,
    Deleting,
}

/// One live or recently-live quiz session compute unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    /// Public join code, unique among active rooms
    pub id: String,
    /// Display name, defaults to the join code
    pub name: String,
    /// Endpoint where the room runtime answers health checks; always
    /// carries a scheme
    pub host: String,
    pub student_count: u32,
    /// Derived by the reconciliation loop; acted on by the cleanup sweep
    pub must_be_cleaned: bool,
    pub status: RoomStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub created_at: u64,
}

impl Room {
    pub fn new(id: &str, name: Option<&str>, host: &str, owner_id: Option<String>) -> Self {
        Self {
            id: id.to_string(),
            name: name.unwrap_or(id).to_string(),
            host: normalize_host(host),
            student_count: 0,
            must_be_cleaned: false,
            status: RoomStatus::Provisioning,
            owner_id,
            created_at: epoch_secs(),
        }
    }
}

/// Prepends `http://` when the host carries no scheme
pub fn normalize_host(host: &str) -> String {
    if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// The "partial success counts as success" rule for updates: an update only
/// failed when the filter matched nothing and nothing changed. Writing the
/// same student count twice matches without modifying and must still
/// report success.
pub(crate) fn update_applied(matched: u64, modified: u64) -> bool {
    matched > 0 || modified > 0
}

/// Persistence boundary for room records. CRUD plus existence checks keyed
/// by the room's public id; no provisioning logic lives here.
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Persists a new room, returning a storage handle. The duplicate check
    /// here is authoritative: callers may pre-check ids, but two concurrent
    /// creates can both observe a free id, so the conflict must be detected
    /// again at write time.
    async fn create(&self, room: &Room) -> Result<String>;

    /// Absent rooms are ordinary control flow, not an error
    async fn get(&self, room_id: &str) -> Result<Option<Room>>;

    /// Unordered; used by reconciliation and listing
    async fn get_all(&self) -> Result<Vec<Room>>;

    /// Rooms created by a given user
    async fn get_by_owner(&self, owner_id: &str) -> Result<Vec<Room>>;

    /// Returns false iff no record matched and none was modified
    async fn update(&self, room: &Room) -> Result<bool>;

    /// Returns true only when exactly one record was removed
    async fn delete(&self, room_id: &str) -> Result<bool>;
}

/// Builds the configured repository. The MongoDB client is constructed here
/// and injected; nothing in this crate holds a global connection.
pub async fn from_config(config: &StoreConfig) -> Result<Arc<dyn RoomRepository>> {
    match config.backend.as_str() {
        "memory" => {
            tracing::info!("Using in-memory room store");
            Ok(Arc::new(InMemoryRoomRepository::new()))
        }
        "mongodb" => {
            let client = mongodb::Client::with_uri_str(&config.mongodb_url).await?;
            let collection = client
                .database(&config.mongodb_database)
                .collection::<Room>(ROOM_COLLECTION);
            tracing::info!(
                database = %config.mongodb_database,
                collection = ROOM_COLLECTION,
                "Connected room store"
            );
            Ok(Arc::new(MongoRoomRepository::new(collection)))
        }
        other => Err(RoomError::InvalidConfiguration(format!(
            "unknown room store backend: {}",
            other
        ))),
    }
}
