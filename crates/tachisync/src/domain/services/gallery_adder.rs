use chrono::Utc;
use tachisync_lib::models::SourceInfo;
use thiserror::Error;

use crate::domain::{
    entities::{
        favorite::{gallery_source_ids, gallery_url, parse_gallery_url},
        manga::Manga,
    },
    repositories::{
        chapter::ChapterRepository,
        gallery::{GalleryRepository, GalleryRepositoryError},
        manga::{MangaRepository, MangaRepositoryError},
    },
    services::{
        chapter_sync::{ChapterSyncError, ChapterSyncService},
        fetch_interval,
    },
};

#[derive(Debug, Error)]
pub enum GalleryAddError {
    #[error("manga repository error: {0}")]
    MangaRepository(#[from] MangaRepositoryError),
    #[error("chapter sync error: {0}")]
    ChapterSync(#[from] ChapterSyncError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryAddFailure {
    /// The gallery was removed or the token is wrong
    NotFound,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryAddEvent {
    Success(Manga),
    Fail(GalleryAddFailure),
}

/// Imports a gallery from the gallery site into the local library.
pub struct GalleryAdder<C, M, G>
where
    C: ChapterRepository,
    M: MangaRepository + Clone,
    G: GalleryRepository,
{
    manga_repo: M,
    chapter_sync: ChapterSyncService<C, M>,
    gallery: G,
    source: SourceInfo,
}

impl<C, M, G> GalleryAdder<C, M, G>
where
    C: ChapterRepository,
    M: MangaRepository + Clone,
    G: GalleryRepository,
{
    pub fn new(chapter_repo: C, manga_repo: M, gallery: G, source: SourceInfo) -> Self {
        Self {
            chapter_sync: ChapterSyncService::new(chapter_repo, manga_repo.clone()),
            manga_repo,
            gallery,
            source,
        }
    }

    /// A gallery is the same manga whether it was added from e-hentai or exhentai.
    pub async fn find_manga(&self, url: &str) -> Result<Option<Manga>, GalleryAddError> {
        for source_id in gallery_source_ids(self.source.id) {
            if let Some(manga) = self.manga_repo.get_manga_by_url(source_id, url).await? {
                return Ok(Some(manga));
            }
        }

        Ok(None)
    }

    /// Remote failures are reported as [`GalleryAddEvent::Fail`]; storage failures are errors.
    pub async fn add_gallery(
        &self,
        url: &str,
        favorite: bool,
    ) -> Result<GalleryAddEvent, GalleryAddError> {
        let Some((gid, token)) = parse_gallery_url(url) else {
            return Ok(GalleryAddEvent::Fail(GalleryAddFailure::Error(format!(
                "'{url}' is not a valid gallery"
            ))));
        };

        let gallery = match self.gallery.fetch_gallery(&gid, &token).await {
            Ok(gallery) => gallery,
            Err(GalleryRepositoryError::NotFound) => {
                return Ok(GalleryAddEvent::Fail(GalleryAddFailure::NotFound));
            }
            Err(e) => {
                return Ok(GalleryAddEvent::Fail(GalleryAddFailure::Error(
                    e.to_string(),
                )));
            }
        };

        let url = gallery_url(&gid, &token);
        let mut manga = match self.find_manga(&url).await? {
            Some(manga) => manga,
            None => {
                self.manga_repo
                    .insert_manga(&Manga {
                        source_id: self.source.id,
                        url,
                        title: gallery.title.clone(),
                        favorite,
                        date_added: Utc::now().timestamp_millis(),
                        ..Default::default()
                    })
                    .await?
            }
        };

        if favorite && !manga.favorite {
            self.manga_repo.update_favorite(manga.id, true).await?;
            manga.favorite = true;
        }

        let window = fetch_interval::window(Utc::now());
        match self
            .chapter_sync
            .sync_chapters_with_source(gallery.chapters(), &manga, &self.source, window)
            .await
        {
            Ok(new_chapters) => {
                debug!("{} added with {} new chapters", manga.title, new_chapters.len());
            }
            Err(ChapterSyncError::NoChapters) => {
                warn!("{} has no chapters", manga.title);
            }
            Err(e) => return Err(e.into()),
        }

        Ok(GalleryAddEvent::Success(manga))
    }
}
