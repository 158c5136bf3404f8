use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Entity not found: {entity_type} '{name}' in namespace {namespace}")]
    EntityNotFound {
        namespace: String,
        entity_type: String,
        name: String,
    },

    #[error("Cannot merge entity into itself: {0}")]
    SelfMerge(String),

    #[error("Graph connection lost: {0}")]
    ConnectionLost(String),

    #[error("Unsupported query parameter: {0}")]
    InvalidParameter(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the backend is gone, as opposed to a single statement failing.
    #[must_use]
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            Self::ConnectionLost(_)
                | Self::Database(
                    sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)
                )
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
