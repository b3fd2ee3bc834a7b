use async_trait::async_trait;

use thiserror::Error;

use crate::domain::entities::chapter::Chapter;

#[derive(Debug, Error)]
pub enum ChapterRepositoryError {
    #[error("database error: {0}")]
    DbError(#[from] sqlx::Error),
}

#[async_trait]
pub trait ChapterRepository: Send + Sync {
    /// Soft-deleted chapters are only returned when `include_deleted` is set.
    async fn get_chapters_by_manga_id(
        &self,
        manga_id: i64,
        include_deleted: bool,
    ) -> Result<Vec<Chapter>, ChapterRepositoryError>;

    /// Returns the inserted chapters with their ids assigned.
    async fn insert_chapters(
        &self,
        chapters: &[Chapter],
    ) -> Result<Vec<Chapter>, ChapterRepositoryError>;

    /// Writes metadata and the `deleted` flag. Read state is never touched.
    async fn update_chapters(&self, chapters: &[Chapter]) -> Result<(), ChapterRepositoryError>;

    async fn soft_delete_chapters_with_ids(
        &self,
        ids: &[i64],
    ) -> Result<(), ChapterRepositoryError>;
}
