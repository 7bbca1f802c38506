use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{CreateRoomOptions, RoomProvider};
use crate::config::DockerConfig;
use crate::error::{Result, RoomError};
use crate::repository::{Room, RoomRepository, RoomStatus};

/// Response from the container create endpoint
#[derive(Debug, Deserialize)]
struct CreateContainerResponse {
    #[serde(rename = "Id")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct ContainerInspect {
    #[serde(rename = "State")]
    state: ContainerState,
}

#[derive(Debug, Deserialize)]
pub struct ContainerState {
    #[serde(rename = "Running")]
    pub running: bool,
    #[serde(rename = "Status", default)]
    pub status: String,
}

/// Thin client for the Docker Engine HTTP API. Containers are addressed by
/// name throughout; the Engine accepts names wherever it accepts ids.
pub struct DockerApi {
    base_url: String,
    client: reqwest::Client,
}

impl DockerApi {
    pub fn new(config: &DockerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| RoomError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Creates a container and returns its id. A name conflict means a
    /// runtime for this room already exists and surfaces as
    /// `RoomAlreadyExists`.
    pub async fn create_container(&self, name: &str, body: &serde_json::Value) -> Result<String> {
        let url = format!("{}/containers/create?name={}", self.base_url, name);
        let response = self.client.post(&url).json(body).send().await?;

        match response.status() {
            s if s.is_success() => {
                let created: CreateContainerResponse = response
                    .json()
                    .await
                    .map_err(|e| RoomError::backend(format!("Bad create response: {}", e)))?;
                Ok(created.id)
            }
            reqwest::StatusCode::CONFLICT => Err(RoomError::RoomAlreadyExists(name.to_string())),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(RoomError::backend(format!(
                    "Container create returned {}: {}",
                    status, text
                )))
            }
        }
    }

    pub async fn start_container(&self, id: &str) -> Result<()> {
        let url = format!("{}/containers/{}/start", self.base_url, id);
        let response = self.client.post(&url).send().await?;

        // 304 means the container was already running
        match response.status() {
            s if s.is_success() || s == reqwest::StatusCode::NOT_MODIFIED => Ok(()),
            status => Err(RoomError::backend(format!(
                "Container start returned {}",
                status
            ))),
        }
    }

    /// Returns false when the container is already gone
    pub async fn stop_container(&self, id: &str) -> Result<bool> {
        let url = format!("{}/containers/{}/stop", self.base_url, id);
        let response = self.client.post(&url).send().await?;

        match response.status() {
            s if s.is_success() || s == reqwest::StatusCode::NOT_MODIFIED => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            status => Err(RoomError::backend(format!(
                "Container stop returned {}",
                status
            ))),
        }
    }

    /// Returns false when the container is already gone
    pub async fn remove_container(&self, id: &str) -> Result<bool> {
        let url = format!("{}/containers/{}?force=true", self.base_url, id);
        let response = self.client.delete(&url).send().await?;

        match response.status() {
            s if s.is_success() => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            status => Err(RoomError::backend(format!(
                "Container remove returned {}",
                status
            ))),
        }
    }

    pub async fn inspect_container(&self, id: &str) -> Result<Option<ContainerState>> {
        let url = format!("{}/containers/{}/json", self.base_url, id);
        let response = self.client.get(&url).send().await?;

        match response.status() {
            s if s.is_success() => {
                let inspect: ContainerInspect = response
                    .json()
                    .await
                    .map_err(|e| RoomError::backend(format!("Bad inspect response: {}", e)))?;
                Ok(Some(inspect.state))
            }
            reqwest::StatusCode::NOT_FOUND => Ok(None),
            status => Err(RoomError::backend(format!(
                "Container inspect returned {}",
                status
            ))),
        }
    }
}

/// Reference provider: one Docker container per live room, joined to a
/// shared network and reached by container name.
pub struct DockerProvider {
    docker: DockerApi,
    repository: Arc<dyn RoomRepository>,
    config: DockerConfig,
}

impl DockerProvider {
    pub fn new(config: &DockerConfig, repository: Arc<dyn RoomRepository>) -> Result<Self> {
        Ok(Self {
            docker: DockerApi::new(config)?,
            repository,
            config: config.clone(),
        })
    }

    fn container_name(&self, room_id: &str) -> String {
        format!("{}-{}", self.config.container_prefix, room_id)
    }

    fn room_host(&self, room_id: &str) -> String {
        format!("{}:{}", self.container_name(room_id), self.config.room_port)
    }

    fn create_body(&self, room_id: &str) -> serde_json::Value {
        serde_json::json!({
            "Image": self.config.image,
            "Env": [format!("ROOM_ID={}", room_id)],
            "Labels": { "quiz.room/id": room_id },
            "HostConfig": { "NetworkMode": self.config.network },
        })
    }
}

#[async_trait]
impl RoomProvider for DockerProvider {
    async fn create_room(&self, room_id: &str, options: CreateRoomOptions) -> Result<Room> {
        let name = self.container_name(room_id);
        let container_id = self
            .docker
            .create_container(&name, &self.create_body(room_id))
            .await?;

        if let Err(start_err) = self.docker.start_container(&container_id).await {
            // Nothing was persisted yet; take the runtime back down
            if let Err(remove_err) = self.docker.remove_container(&container_id).await {
                return Err(RoomError::InconsistentState(format!(
                    "room {} container failed to start ({}) and could not be removed: {}",
                    room_id, start_err, remove_err
                )));
            }
            return Err(start_err);
        }

        let room = Room::new(
            room_id,
            options.title.as_deref(),
            &self.room_host(room_id),
            options.owner_id,
        );

        match self.repository.create(&room).await {
            Ok(storage_id) => {
                tracing::info!(
                    room_id = %room_id,
                    container = %name,
                    storage_id = %storage_id,
                    "Room provisioned"
                );
                Ok(room)
            }
            Err(create_err) => {
                // The runtime is up but the record is not; roll the
                // container back so the failure leaves no orphan.
                tracing::warn!(
                    room_id = %room_id,
                    error = %create_err,
                    "Room record rejected, removing container"
                );
                if let Err(remove_err) = self.docker.remove_container(&container_id).await {
                    tracing::error!(
                        room_id = %room_id,
                        container = %name,
                        error = %remove_err,
                        "Orphaned room container requires manual removal"
                    );
                    return Err(RoomError::InconsistentState(format!(
                        "room {} container is running but unregistered ({}); removal failed: {}",
                        room_id, create_err, remove_err
                    )));
                }
                Err(create_err)
            }
        }
    }

    async fn delete_room(&self, room_id: &str) -> Result<()> {
        if let Some(mut room) = self.repository.get(room_id).await? {
            room.status = RoomStatus::Deleting;
            if let Err(e) = self.repository.update(&room).await {
                tracing::warn!(room_id = %room_id, error = %e, "Failed to mark room as deleting");
            }
        }

        let name = self.container_name(room_id);
        let stopped = self.docker.stop_container(&name).await?;
        let removed = self.docker.remove_container(&name).await?;
        if !stopped || !removed {
            tracing::debug!(room_id = %room_id, "Room container was already gone");
        }

        if !self.repository.delete(room_id).await? {
            tracing::debug!(room_id = %room_id, "Room record was already gone");
        }

        tracing::info!(room_id = %room_id, "Room deleted");
        Ok(())
    }

    async fn get_room_status(&self, room_id: &str) -> Result<Option<Room>> {
        let Some(mut room) = self.repository.get(room_id).await? else {
            return Ok(None);
        };

        match self.docker.inspect_container(&self.container_name(room_id)).await? {
            Some(state) if state.running => {
                if room.status == RoomStatus::Provisioning {
                    room.status = RoomStatus::Active;
                }
            }
            state => {
                tracing::warn!(
                    room_id = %room_id,
                    container_status = state.map(|s| s.status).as_deref().unwrap_or("absent"),
                    "Room runtime is not running"
                );
                room.must_be_cleaned = true;
                room.status = RoomStatus::MarkedForCleanup;
            }
        }

        self.repository.update(&room).await?;
        Ok(Some(room))
    }

    async fn list_rooms(&self) -> Result<Vec<Room>> {
        self.repository.get_all().await
    }

    async fn cleanup(&self) -> Result<()> {
        let rooms = self.repository.get_all().await?;
        let mut torn_down = 0usize;

        for room in rooms.into_iter().filter(|r| r.must_be_cleaned) {
            match self.delete_room(&room.id).await {
                Ok(()) => torn_down += 1,
                // One room failing to die must not spare the rest
                Err(e) => {
                    tracing::error!(room_id = %room.id, error = %e, "Failed to tear down stale room")
                }
            }
        }

        if torn_down > 0 {
            tracing::info!(count = torn_down, "Cleanup pass removed stale rooms");
        }
        Ok(())
    }

    async fn get_room_info(&self, room_id: &str) -> Result<Option<Room>> {
        self.repository.get(room_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRoomRepository;
    use std::collections::HashMap;
    use std::convert::Infallible;
    use tokio::sync::RwLock;
    use warp::http::StatusCode;
    use warp::Filter;

    /// name -> running
    type Containers = Arc<RwLock<HashMap<String, bool>>>;

    /// Minimal Docker Engine API stand-in: create/start/stop/remove/inspect,
    /// keyed by container name (ids echo the name back, as the Engine
    /// accepts either).
    fn spawn_fake_docker() -> (String, Containers) {
        let containers: Containers = Arc::new(RwLock::new(HashMap::new()));

        let state = containers.clone();
        let create = warp::path!("containers" / "create")
            .and(warp::post())
            .and(warp::query::<HashMap<String, String>>())
            .and_then(move |query: HashMap<String, String>| {
                let state = state.clone();
                async move {
                    let name = query.get("name").cloned().unwrap_or_default();
                    let mut guard = state.write().await;
                    if guard.contains_key(&name) {
                        return Ok::<_, Infallible>(warp::reply::with_status(
                            warp::reply::json(&serde_json::json!({"message": "name in use"})),
                            StatusCode::CONFLICT,
                        ));
                    }
                    guard.insert(name.clone(), false);
                    Ok(warp::reply::with_status(
                        warp::reply::json(&serde_json::json!({"Id": name, "Warnings": []})),
                        StatusCode::CREATED,
                    ))
                }
            });

        let state = containers.clone();
        let start = warp::path!("containers" / String / "start")
            .and(warp::post())
            .and_then(move |name: String| {
                let state = state.clone();
                async move {
                    let mut guard = state.write().await;
                    let status = match guard.get_mut(&name) {
                        Some(running) => {
                            *running = true;
                            StatusCode::NO_CONTENT
                        }
                        None => StatusCode::NOT_FOUND,
                    };
                    Ok::<_, Infallible>(warp::reply::with_status(warp::reply(), status))
                }
            });

        let state = containers.clone();
        let stop = warp::path!("containers" / String / "stop")
            .and(warp::post())
            .and_then(move |name: String| {
                let state = state.clone();
                async move {
                    let mut guard = state.write().await;
                    let status = match guard.get_mut(&name) {
                        Some(running) => {
                            *running = false;
                            StatusCode::NO_CONTENT
                        }
                        None => StatusCode::NOT_FOUND,
                    };
                    Ok::<_, Infallible>(warp::reply::with_status(warp::reply(), status))
                }
            });

        let state = containers.clone();
        let remove = warp::path!("containers" / String)
            .and(warp::delete())
            .and_then(move |name: String| {
                let state = state.clone();
                async move {
                    let status = if state.write().await.remove(&name).is_some() {
                        StatusCode::NO_CONTENT
                    } else {
                        StatusCode::NOT_FOUND
                    };
                    Ok::<_, Infallible>(warp::reply::with_status(warp::reply(), status))
                }
            });

        let state = containers.clone();
        let inspect = warp::path!("containers" / String / "json")
            .and(warp::get())
            .and_then(move |name: String| {
                let state = state.clone();
                async move {
                    let guard = state.read().await;
                    let reply = match guard.get(&name) {
                        Some(&running) => {
                            let status = if running { "running" } else { "exited" };
                            warp::reply::with_status(
                                warp::reply::json(&serde_json::json!({
                                    "State": { "Running": running, "Status": status }
                                })),
                                StatusCode::OK,
                            )
                        }
                        None => warp::reply::with_status(
                            warp::reply::json(&serde_json::json!({"message": "no such container"})),
                            StatusCode::NOT_FOUND,
                        ),
                    };
                    Ok::<_, Infallible>(reply)
                }
            });

        let routes = create.or(inspect).or(start).or(stop).or(remove);
        let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        (format!("http://{}", addr), containers)
    }

    fn test_config(api_url: &str) -> DockerConfig {
        DockerConfig {
            api_url: api_url.to_string(),
            api_timeout_secs: 5,
            image: "quiz-room:test".to_string(),
            network: "quiz-rooms".to_string(),
            container_prefix: "quizroom".to_string(),
            room_port: 3000,
        }
    }

    fn test_provider(api_url: &str) -> (DockerProvider, Arc<InMemoryRoomRepository>) {
        let repository = Arc::new(InMemoryRoomRepository::new());
        let provider = DockerProvider::new(&test_config(api_url), repository.clone()).unwrap();
        (provider, repository)
    }

    #[tokio::test]
    async fn test_container_naming() {
        let repository = Arc::new(InMemoryRoomRepository::new());
        let provider =
            DockerProvider::new(&test_config("http://127.0.0.1:2375"), repository).unwrap();

        assert_eq!(provider.container_name("123456"), "quizroom-123456");
        assert_eq!(provider.room_host("123456"), "quizroom-123456:3000");
    }

    #[tokio::test]
    async fn test_create_room_provisions_and_registers() {
        let (api_url, containers) = spawn_fake_docker();
        let (provider, repository) = test_provider(&api_url);

        let options = CreateRoomOptions {
            title: Some("Biology 101".to_string()),
            owner_id: Some("teacher-1".to_string()),
        };
        let room = provider.create_room("123456", options).await.unwrap();

        assert_eq!(room.id, "123456");
        assert_eq!(room.name, "Biology 101");
        assert_eq!(room.host, "http://quizroom-123456:3000");
        assert_eq!(room.student_count, 0);
        assert_eq!(room.status, RoomStatus::Provisioning);

        // Record persisted and container running
        assert!(repository.get("123456").await.unwrap().is_some());
        assert_eq!(containers.read().await.get("quizroom-123456"), Some(&true));
    }

    #[tokio::test]
    async fn test_create_room_rolls_back_container_on_record_conflict() {
        let (api_url, containers) = spawn_fake_docker();
        let (provider, repository) = test_provider(&api_url);

        // Simulate the id-allocation race: the record appears between the
        // controller's probe and the provider's write.
        repository
            .create(&Room::new("123456", None, "elsewhere:3000", None))
            .await
            .unwrap();

        let err = provider
            .create_room("123456", CreateRoomOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RoomError::RoomAlreadyExists(_)));

        // The freshly started container was taken back down
        assert!(!containers.read().await.contains_key("quizroom-123456"));
    }

    #[tokio::test]
    async fn test_create_room_conflicting_container_name() {
        let (api_url, containers) = spawn_fake_docker();
        let (provider, _repository) = test_provider(&api_url);

        containers
            .write()
            .await
            .insert("quizroom-123456".to_string(), true);

        let err = provider
            .create_room("123456", CreateRoomOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RoomError::RoomAlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_get_room_status_running_activates() {
        let (api_url, _containers) = spawn_fake_docker();
        let (provider, _repository) = test_provider(&api_url);

        provider
            .create_room("123456", CreateRoomOptions::default())
            .await
            .unwrap();

        let room = provider.get_room_status("123456").await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Active);
        assert!(!room.must_be_cleaned);
    }

    #[tokio::test]
    async fn test_get_room_status_dead_container_marks_cleanup() {
        let (api_url, containers) = spawn_fake_docker();
        let (provider, repository) = test_provider(&api_url);

        provider
            .create_room("123456", CreateRoomOptions::default())
            .await
            .unwrap();
        containers.write().await.remove("quizroom-123456");

        let room = provider.get_room_status("123456").await.unwrap().unwrap();
        assert!(room.must_be_cleaned);
        assert_eq!(room.status, RoomStatus::MarkedForCleanup);

        // The refreshed status was persisted, not just returned
        let stored = repository.get("123456").await.unwrap().unwrap();
        assert!(stored.must_be_cleaned);
    }

    #[tokio::test]
    async fn test_get_room_status_unknown_room_is_none() {
        let (api_url, _containers) = spawn_fake_docker();
        let (provider, _repository) = test_provider(&api_url);

        assert!(provider.get_room_status("999999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_room_tears_down_and_tolerates_absence() {
        let (api_url, containers) = spawn_fake_docker();
        let (provider, repository) = test_provider(&api_url);

        provider
            .create_room("123456", CreateRoomOptions::default())
            .await
            .unwrap();

        provider.delete_room("123456").await.unwrap();
        assert!(repository.get("123456").await.unwrap().is_none());
        assert!(!containers.read().await.contains_key("quizroom-123456"));

        // Deleting an already-gone room is not an error
        provider.delete_room("123456").await.unwrap();
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_marked_rooms() {
        let (api_url, containers) = spawn_fake_docker();
        let (provider, repository) = test_provider(&api_url);

        provider
            .create_room("111111", CreateRoomOptions::default())
            .await
            .unwrap();
        provider
            .create_room("222222", CreateRoomOptions::default())
            .await
            .unwrap();

        let mut stale = repository.get("111111").await.unwrap().unwrap();
        stale.must_be_cleaned = true;
        repository.update(&stale).await.unwrap();

        provider.cleanup().await.unwrap();

        assert!(repository.get("111111").await.unwrap().is_none());
        assert!(!containers.read().await.contains_key("quizroom-111111"));
        assert!(repository.get("222222").await.unwrap().is_some());
        assert!(containers.read().await.contains_key("quizroom-222222"));
    }
}
