use async_trait::async_trait;

use thiserror::Error;

use crate::domain::entities::favorite::FavoriteEntry;

#[derive(Debug, Error)]
pub enum FavoriteEntryRepositoryError {
    #[error("database error: {0}")]
    DbError(#[from] sqlx::Error),
}

/// Snapshot of the favorites as of the last completed sync
#[async_trait]
pub trait FavoriteEntryRepository: Send + Sync {
    async fn get_entries(&self) -> Result<Vec<FavoriteEntry>, FavoriteEntryRepositoryError>;

    async fn replace_entries(
        &self,
        entries: &[FavoriteEntry],
    ) -> Result<(), FavoriteEntryRepositoryError>;

    async fn clear_entries(&self) -> Result<(), FavoriteEntryRepositoryError>;
}
