use thiserror::Error;

use crate::domain::{
    entities::favorite::{
        is_gallery_source, parse_gallery_url, ChangeSet, FavoriteEntry, MAX_CATEGORIES,
    },
    repositories::{
        category::{CategoryRepository, CategoryRepositoryError},
        favorite::{FavoriteEntryRepository, FavoriteEntryRepositoryError},
        manga::{MangaRepository, MangaRepositoryError},
    },
};

#[derive(Debug, Error)]
pub enum FavoritesStorageError {
    #[error("manga repository error: {0}")]
    MangaRepository(#[from] MangaRepositoryError),
    #[error("category repository error: {0}")]
    CategoryRepository(#[from] CategoryRepositoryError),
    #[error("favorite entry repository error: {0}")]
    FavoriteEntryRepository(#[from] FavoriteEntryRepositoryError),
}

/// Diffs the local library and the remote favorites against the last sync snapshot.
pub struct LocalFavoritesStorage<M, C, F>
where
    M: MangaRepository,
    C: CategoryRepository,
    F: FavoriteEntryRepository,
{
    manga_repo: M,
    category_repo: C,
    favorite_repo: F,
}

impl<M, C, F> LocalFavoritesStorage<M, C, F>
where
    M: MangaRepository,
    C: CategoryRepository,
    F: FavoriteEntryRepository,
{
    pub fn new(manga_repo: M, category_repo: C, favorite_repo: F) -> Self {
        Self {
            manga_repo,
            category_repo,
            favorite_repo,
        }
    }

    pub async fn changed_local_entries(&self) -> Result<ChangeSet, FavoritesStorageError> {
        let current = self.local_entries().await?;

        self.changed_entries(&current).await
    }

    pub async fn changed_remote_entries(
        &self,
        remote: &[FavoriteEntry],
    ) -> Result<ChangeSet, FavoritesStorageError> {
        let current: Vec<FavoriteEntry> = remote
            .iter()
            .filter(|entry| (0..=MAX_CATEGORIES).contains(&entry.category))
            .cloned()
            .collect();

        self.changed_entries(&current).await
    }

    /// Replace the snapshot with the current local favorites.
    pub async fn snapshot_entries(&self) -> Result<(), FavoritesStorageError> {
        let entries = self.local_entries().await?;
        debug!("snapshotting {} favorite entries", entries.len());
        self.favorite_repo.replace_entries(&entries).await?;

        Ok(())
    }

    pub async fn clear_snapshots(&self) -> Result<(), FavoritesStorageError> {
        self.favorite_repo.clear_entries().await?;

        Ok(())
    }

    async fn changed_entries(
        &self,
        current: &[FavoriteEntry],
    ) -> Result<ChangeSet, FavoritesStorageError> {
        let snapshot = self.favorite_repo.get_entries().await?;

        Ok(ChangeSet::between(current, &snapshot))
    }

    /// Favorited gallery manga, keyed by the position of their first category.
    async fn local_entries(&self) -> Result<Vec<FavoriteEntry>, FavoritesStorageError> {
        let categories = self.category_repo.get_categories().await?;
        let manga = self.manga_repo.get_favorite_manga().await?;

        let mut entries = vec![];
        for manga in manga
            .into_iter()
            .filter(|m| m.favorite && is_gallery_source(m.source_id))
        {
            let manga_categories = self
                .category_repo
                .get_categories_by_manga_id(manga.id)
                .await?;
            let Some(first) = manga_categories.first() else {
                continue;
            };
            let Some(index) = categories.iter().position(|c| c.id == first.id) else {
                continue;
            };
            if index as i32 > MAX_CATEGORIES {
                continue;
            }
            let Some((gid, token)) = parse_gallery_url(&manga.url) else {
                warn!("{} has an invalid gallery url: {}", manga.title, manga.url);
                continue;
            };

            entries.push(FavoriteEntry {
                gid,
                token,
                category: index as i32,
                title: manga.title,
            });
        }

        Ok(entries)
    }
}
