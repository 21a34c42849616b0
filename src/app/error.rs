use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Schema migration failed: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported sort order: {0} (only date sorting is supported)")]
    UnsupportedSort(String),

    #[error("Unsupported sort direction: {0} (only descending is supported)")]
    UnsupportedDirection(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Revision {revision} already belongs to entry {owner}")]
    RevisionOwned { revision: i64, owner: i64 },

    #[error("Transaction aborted: {0}")]
    Aborted(String),

    #[error("Storage backend is closed")]
    BackendClosed,

    #[error("Store is not initialized; call init() first")]
    NotInitialized,

    #[error("Backup target {target} failed: {message}")]
    Backup { target: String, message: String },

    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// True for invalid filter or configuration input, which is never worth retrying.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            StoreError::UnsupportedSort(_)
                | StoreError::UnsupportedDirection(_)
                | StoreError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
