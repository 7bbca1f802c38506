use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Room, RoomRepository};
use crate::error::{Result, RoomError};

/// HashMap-backed room store. Used as the development store and as the test
/// double for every component that takes a repository.
pub struct InMemoryRoomRepository {
    rooms: Arc<RwLock<HashMap<String, Room>>>,
}

impl InMemoryRoomRepository {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryRoomRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn create(&self, room: &Room) -> Result<String> {
        let mut rooms = self.rooms.write().await;

        if rooms.contains_key(&room.id) {
            return Err(RoomError::RoomAlreadyExists(room.id.clone()));
        }
        if let Some(owner) = &room.owner_id {
            let title_taken = rooms
                .values()
                .any(|r| r.owner_id.as_deref() == Some(owner) && r.name == room.name);
            if title_taken {
                return Err(RoomError::TitleAlreadyExists(room.name.clone()));
            }
        }

        rooms.insert(room.id.clone(), room.clone());
        // The public id doubles as the storage handle here
        Ok(room.id.clone())
    }

    async fn get(&self, room_id: &str) -> Result<Option<Room>> {
        let rooms = self.rooms.read().await;
        Ok(rooms.get(room_id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Room>> {
        let rooms = self.rooms.read().await;
        Ok(rooms.values().cloned().collect())
    }

    async fn get_by_owner(&self, owner_id: &str) -> Result<Vec<Room>> {
        let rooms = self.rooms.read().await;
        Ok(rooms
            .values()
            .filter(|r| r.owner_id.as_deref() == Some(owner_id))
            .cloned()
            .collect())
    }

    async fn update(&self, room: &Room) -> Result<bool> {
        let mut rooms = self.rooms.write().await;
        match rooms.get_mut(&room.id) {
            Some(existing) => {
                *existing = room.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, room_id: &str) -> Result<bool> {
        let mut rooms = self.rooms.write().await;
        Ok(rooms.remove(room_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_room(id: &str) -> Room {
        Room::new(id, None, &format!("quizroom-{}:3000", id), None)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = InMemoryRoomRepository::new();
        let room = sample_room("123456");

        let storage_id = repo.create(&room).await.unwrap();
        assert_eq!(storage_id, "123456");

        let fetched = repo.get("123456").await.unwrap();
        assert_eq!(fetched, Some(room));
    }

    #[tokio::test]
    async fn test_get_absent_is_none_not_error() {
        let repo = InMemoryRoomRepository::new();
        assert!(repo.get("999999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_id_rejected() {
        let repo = InMemoryRoomRepository::new();
        repo.create(&sample_room("123456")).await.unwrap();

        let err = repo.create(&sample_room("123456")).await.unwrap_err();
        assert!(matches!(err, RoomError::RoomAlreadyExists(_)));

        // No duplicate record was inserted
        assert_eq!(repo.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_duplicate_title_same_owner_rejected() {
        let repo = InMemoryRoomRepository::new();
        let first = Room::new("111111", Some("Biology"), "a:1", Some("teacher-1".into()));
        repo.create(&first).await.unwrap();

        let clash = Room::new("222222", Some("Biology"), "b:1", Some("teacher-1".into()));
        let err = repo.create(&clash).await.unwrap_err();
        assert!(matches!(err, RoomError::TitleAlreadyExists(_)));

        // A different owner may reuse the title
        let other_owner = Room::new("333333", Some("Biology"), "c:1", Some("teacher-2".into()));
        assert!(repo.create(&other_owner).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_absent_returns_false() {
        let repo = InMemoryRoomRepository::new();
        assert!(!repo.update(&sample_room("123456")).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_unchanged_still_succeeds() {
        let repo = InMemoryRoomRepository::new();
        let room = sample_room("123456");
        repo.create(&room).await.unwrap();

        // Writing the identical record matches without modifying
        assert!(repo.update(&room).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_changes_fields() {
        let repo = InMemoryRoomRepository::new();
        let mut room = sample_room("123456");
        repo.create(&room).await.unwrap();

        room.student_count = 12;
        room.must_be_cleaned = true;
        assert!(repo.update(&room).await.unwrap());

        let fetched = repo.get("123456").await.unwrap().unwrap();
        assert_eq!(fetched.student_count, 12);
        assert!(fetched.must_be_cleaned);
    }

    #[tokio::test]
    async fn test_delete_absent_returns_false() {
        let repo = InMemoryRoomRepository::new();
        assert!(!repo.delete("999999").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let repo = InMemoryRoomRepository::new();
        repo.create(&sample_room("123456")).await.unwrap();

        assert!(repo.delete("123456").await.unwrap());
        assert!(repo.get("123456").await.unwrap().is_none());
        // Second delete finds nothing
        assert!(!repo.delete("123456").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_by_owner() {
        let repo = InMemoryRoomRepository::new();
        repo.create(&Room::new("111111", Some("A"), "a:1", Some("teacher-1".into())))
            .await
            .unwrap();
        repo.create(&Room::new("222222", Some("B"), "b:1", Some("teacher-1".into())))
            .await
            .unwrap();
        repo.create(&Room::new("333333", Some("C"), "c:1", Some("teacher-2".into())))
            .await
            .unwrap();

        let rooms = repo.get_by_owner("teacher-1").await.unwrap();
        assert_eq!(rooms.len(), 2);
        assert!(repo.get_by_owner("teacher-3").await.unwrap().is_empty());
    }
}
