use async_trait::async_trait;

use thiserror::Error;

use super::{
    category::CategoryRepository, chapter::ChapterRepository, favorite::FavoriteEntryRepository,
    manga::MangaRepository,
};

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("database error: {0}")]
    DbError(#[from] sqlx::Error),
}

/// Hands out repositories that share one storage scope.
///
/// Repositories taken from the value returned by [`UnitOfWork::begin`] see and
/// write the same transaction; nothing they wrote is visible to others until
/// [`UnitOfWork::commit`].
#[async_trait]
pub trait UnitOfWork: Send + Sync + Sized {
    type Chapters: ChapterRepository + Clone + 'static;
    type Manga: MangaRepository + Clone + 'static;
    type Categories: CategoryRepository + Clone + 'static;
    type Favorites: FavoriteEntryRepository + Clone + 'static;

    fn chapters(&self) -> Self::Chapters;

    fn manga(&self) -> Self::Manga;

    fn categories(&self) -> Self::Categories;

    fn favorites(&self) -> Self::Favorites;

    async fn begin(&self) -> Result<Self, TransactionError>;

    async fn commit(self) -> Result<(), TransactionError>;

    async fn rollback(self) -> Result<(), TransactionError>;
}
