use async_trait::async_trait;
use thiserror::Error;

use crate::rates::models::{Snapshot, UpdateDatetime};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Database connection failed: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("Database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Failed to {operation}: {source}")]
    Query {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("No currency metadata for numeric code {num_code} ({char_code})")]
    MissingMetadata { num_code: i32, char_code: String },

    #[error("Refusing to store an empty snapshot")]
    EmptySnapshot,

    #[error("Unknown update datetime id {0}")]
    UnknownUpdate(i32),
}

impl PersistenceError {
    pub fn query(operation: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| Self::Query { operation, source }
    }
}

/// Storage for timestamped currency snapshots.
///
/// Currency metadata (character code, name, multiplier) is seeded ahead of
/// time; only update timestamps and values are written here.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Appends a new update row and returns it with its assigned id
    async fn insert_update_datetime(&self, timestamp: &str) -> Result<UpdateDatetime, PersistenceError>;

    /// The update row with the highest id, `None` when nothing was stored yet
    async fn latest_update_datetime(&self) -> Result<Option<UpdateDatetime>, PersistenceError>;

    /// Stores one value row per record, all tagged with `update_datetime_id`
    async fn insert_currencies(&self, snapshot: &Snapshot, update_datetime_id: i32) -> Result<(), PersistenceError>;

    /// The records stored for `update_datetime_id`, ordered by name
    async fn latest_currencies(&self, update_datetime_id: i32) -> Result<Snapshot, PersistenceError>;

    /// Stores a snapshot under a fresh update row.
    ///
    /// Implementations backed by a transactional store should override this
    /// so a failed value insert leaves no update row behind.
    async fn insert_snapshot(&self, timestamp: &str, snapshot: &Snapshot) -> Result<UpdateDatetime, PersistenceError> {
        if snapshot.is_empty() {
            return Err(PersistenceError::EmptySnapshot);
        }

        let update = self.insert_update_datetime(timestamp).await?;
        self.insert_currencies(snapshot, update.id).await?;

        Ok(update)
    }

    async fn health_check(&self) -> Result<(), PersistenceError>;
}
