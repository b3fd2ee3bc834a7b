use async_trait::async_trait;

use thiserror::Error;

use crate::domain::entities::{
    favorite::FavoriteEntry,
    gallery::{Gallery, RemoteFavorites},
};

#[derive(Debug, Error)]
pub enum GalleryRepositoryError {
    #[error("gallery not found")]
    NotFound,
    #[error("not logged in to the gallery site")]
    NotLoggedIn,
    #[error("unexpected status code {0}")]
    Status(u16),
    #[error("failed to parse page: {0}")]
    Parse(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait GalleryRepository: Send + Sync {
    async fn fetch_favorites(&self) -> Result<RemoteFavorites, GalleryRepositoryError>;

    async fn fetch_gallery(&self, gid: &str, token: &str)
    -> Result<Gallery, GalleryRepositoryError>;

    /// Removes all `gids` from the remote favorites in a single request.
    async fn delete_favorites(&self, gids: &[String]) -> Result<(), GalleryRepositoryError>;

    async fn add_favorite(&self, entry: &FavoriteEntry) -> Result<(), GalleryRepositoryError>;
}
