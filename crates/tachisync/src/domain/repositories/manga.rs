use async_trait::async_trait;

use thiserror::Error;

use crate::domain::entities::manga::Manga;

#[derive(Debug, Error)]
pub enum MangaRepositoryError {
    #[error("database error: {0}")]
    DbError(#[from] sqlx::Error),
}

#[async_trait]
pub trait MangaRepository: Send + Sync {
    async fn get_manga_by_id(&self, id: i64) -> Result<Manga, MangaRepositoryError>;

    async fn get_manga_by_url(
        &self,
        source_id: i64,
        url: &str,
    ) -> Result<Option<Manga>, MangaRepositoryError>;

    async fn get_favorite_manga(&self) -> Result<Vec<Manga>, MangaRepositoryError>;

    async fn insert_manga(&self, manga: &Manga) -> Result<Manga, MangaRepositoryError>;

    async fn update_favorite(&self, id: i64, favorite: bool) -> Result<(), MangaRepositoryError>;

    async fn update_fetch_interval(
        &self,
        id: i64,
        next_update: i64,
        fetch_interval: i32,
    ) -> Result<(), MangaRepositoryError>;

    async fn update_last_update(
        &self,
        id: i64,
        last_update: i64,
    ) -> Result<(), MangaRepositoryError>;
}
