use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::Collection;

use super::{update_applied, Room, RoomRepository};
use crate::error::{Result, RoomError};

/// Document-collection room store. The collection is injected by the caller
/// that owns the MongoDB client; this type never opens connections itself.
pub struct MongoRoomRepository {
    collection: Collection<Room>,
}

impl MongoRoomRepository {
    pub fn new(collection: Collection<Room>) -> Self {
        Self { collection }
    }
}

/// All documents are looked up by the public join code, not the storage
/// `_id`; the join code is unique among active rooms.
fn id_filter(room_id: &str) -> Document {
    doc! { "id": room_id }
}

fn owner_title_filter(owner_id: &str, name: &str) -> Document {
    doc! { "ownerId": owner_id, "name": name }
}

#[async_trait]
impl RoomRepository for MongoRoomRepository {
    async fn create(&self, room: &Room) -> Result<String> {
        // Write-time duplicate checks; the controller's pre-check is only
        // an optimization and loses races.
        if self.collection.find_one(id_filter(&room.id), None).await?.is_some() {
            return Err(RoomError::RoomAlreadyExists(room.id.clone()));
        }
        if let Some(owner) = &room.owner_id {
            let clash = self
                .collection
                .find_one(owner_title_filter(owner, &room.name), None)
                .await?;
            if clash.is_some() {
                return Err(RoomError::TitleAlreadyExists(room.name.clone()));
            }
        }

        let result = self.collection.insert_one(room, None).await?;
        let storage_id = result
            .inserted_id
            .as_object_id()
            .map(|oid| oid.to_hex())
            .unwrap_or_else(|| result.inserted_id.to_string());

        tracing::debug!(room_id = %room.id, storage_id = %storage_id, "Room record inserted");
        Ok(storage_id)
    }

    async fn get(&self, room_id: &str) -> Result<Option<Room>> {
        Ok(self.collection.find_one(id_filter(room_id), None).await?)
    }

    async fn get_all(&self) -> Result<Vec<Room>> {
        let cursor = self.collection.find(None, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn get_by_owner(&self, owner_id: &str) -> Result<Vec<Room>> {
        let cursor = self
            .collection
            .find(doc! { "ownerId": owner_id }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update(&self, room: &Room) -> Result<bool> {
        let result = self
            .collection
            .replace_one(id_filter(&room.id), room, None)
            .await?;
        Ok(update_applied(result.matched_count, result.modified_count))
    }

    async fn delete(&self, room_id: &str) -> Result<bool> {
        let result = self.collection.delete_one(id_filter(room_id), None).await?;
        Ok(result.deleted_count == 1)
    }
}
