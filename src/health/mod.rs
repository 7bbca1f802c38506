use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Deserialize;

use crate::config::HealthConfig;
use crate::error::{Result, RoomError};
use crate::repository::{Room, RoomRepository, RoomStatus};

/// Body served by every room runtime at `GET {host}/health`. Runtimes may
/// report more fields; only these two drive reconciliation.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthReport {
    pub connections: u32,
    /// Seconds since the room runtime started
    pub uptime: u64,
}

/// Sole writer of the `must_be_cleaned` flag. Each pass snapshots the
/// repository, probes every room's health endpoint with bounded
/// parallelism, and persists the refreshed counts and staleness verdicts.
pub struct HealthReconciler {
    repository: Arc<dyn RoomRepository>,
    client: reqwest::Client,
    grace_period: Duration,
    max_concurrency: usize,
}

impl HealthReconciler {
    pub fn new(repository: Arc<dyn RoomRepository>, config: &HealthConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| RoomError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            repository,
            client,
            grace_period: Duration::from_secs(config.grace_period_secs),
            max_concurrency: config.max_concurrency.max(1),
        })
    }

    /// Runs the reconciliation task on a fixed interval. Each pass is
    /// error-isolated; nothing a room does can stop future ticks.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                interval_secs = interval.as_secs(),
                grace_secs = self.grace_period.as_secs(),
                "Health reconciliation loop started"
            );
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.reconcile_all().await;
            }
        })
    }

    /// One full pass over every known room. Always runs to completion over
    /// the snapshot so the derived staleness flags cannot go stale
    /// piecemeal.
    pub async fn reconcile_all(&self) {
        let rooms = match self.repository.get_all().await {
            Ok(rooms) => rooms,
            Err(e) => {
                tracing::error!(error = %e, "Could not snapshot rooms for reconciliation");
                return;
            }
        };

        let count = rooms.len();
        stream::iter(rooms)
            .for_each_concurrent(Some(self.max_concurrency), |room| self.reconcile_room(room))
            .await;
        tracing::debug!(rooms = count, "Reconciliation pass complete");
    }

    /// Probes one room and persists the outcome. Failures are logged here,
    /// never propagated, so one unreachable room cannot abort the pass.
    async fn reconcile_room(&self, mut room: Room) {
        match self.fetch_report(&room.host).await {
            Ok(report) => {
                room.student_count = report.connections;
                room.must_be_cleaned =
                    is_stale(report.connections, report.uptime, self.grace_period);
                room.status = if room.must_be_cleaned {
                    RoomStatus::MarkedForCleanup
                } else {
                    RoomStatus::Active
                };
            }
            Err(e) => {
                tracing::warn!(
                    room_id = %room.id,
                    host = %room.host,
                    error = %e,
                    "Room unreachable, marking for cleanup"
                );
                room.must_be_cleaned = true;
                room.status = RoomStatus::MarkedForCleanup;
            }
        }

        if let Err(e) = self.repository.update(&room).await {
            tracing::error!(room_id = %room.id, error = %e, "Failed to persist room health");
        }
    }

    async fn fetch_report(&self, host: &str) -> Result<HealthReport> {
        let response = self.client.get(health_url(host)).send().await?;

        if !response.status().is_success() {
            return Err(RoomError::backend(format!(
                "health endpoint returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| RoomError::backend(format!("bad health body: {}", e)))
    }
}

fn health_url(host: &str) -> String {
    format!("{}/health", host.trim_end_matches('/'))
}

/// A room is stale when nobody is connected and it has been up longer than
/// the grace period; a freshly provisioned empty room is left alone.
fn is_stale(connections: u32, uptime_secs: u64, grace_period: Duration) -> bool {
    connections == 0 && uptime_secs > grace_period.as_secs()
}
