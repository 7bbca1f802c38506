use thiserror::Error;

/// Custom error types for the room provisioning service
#[derive(Debug, Error)]
pub enum RoomError {
    /// Room and allocation errors
    #[error("Room {0} not found")]
    RoomNotFound(String),

    #[error("Room {0} already exists")]
    RoomAlreadyExists(String),

    #[error("A room titled '{0}' already exists for this owner")]
    TitleAlreadyExists(String),

    #[error("Unable to allocate a free room id after {attempts} attempts")]
    IdSpaceExhausted { attempts: u32 },

    /// Provider and orchestration backend errors
    #[error("Provider backend '{0}' is not implemented")]
    ProviderUnimplemented(String),

    #[error("Orchestration backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Runtime provisioned but persistence diverged, or vice versa.
    /// Operators must reconcile manually; never swallowed.
    #[error("Inconsistent room state: {0}")]
    InconsistentState(String),

    /// Persistence errors
    #[error("Room store error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Failed to serialize message: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for Results using RoomError
pub type Result<T> = std::result::Result<T, RoomError>;

impl RoomError {
    /// Helper to create Internal errors with context
    pub fn internal(msg: impl Into<String>) -> Self {
        RoomError::Internal(msg.into())
    }

    /// Helper to create backend errors
    pub fn backend(msg: impl Into<String>) -> Self {
        RoomError::BackendUnavailable(msg.into())
    }

    /// True for the conflict class the caller is expected to recover from
    /// by regenerating an id or surfacing the collision.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            RoomError::RoomAlreadyExists(_) | RoomError::TitleAlreadyExists(_)
        )
    }
}

impl From<mongodb::error::Error> for RoomError {
    fn from(err: mongodb::error::Error) -> Self {
        RoomError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for RoomError {
    fn from(err: reqwest::Error) -> Self {
        RoomError::BackendUnavailable(err.to_string())
    }
}
