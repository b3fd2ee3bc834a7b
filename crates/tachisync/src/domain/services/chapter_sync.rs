use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tachisync_lib::models::{ChapterInfo, SourceInfo};
use thiserror::Error;

use crate::domain::{
    entities::{chapter::Chapter, manga::Manga},
    repositories::{
        chapter::{ChapterRepository, ChapterRepositoryError},
        manga::{MangaRepository, MangaRepositoryError},
    },
    services::{
        chapter_recognition::{parse_chapter_number, sanitize_chapter_name},
        fetch_interval::{self, FetchWindow},
    },
};

#[derive(Debug, Error)]
pub enum ChapterSyncError {
    #[error("no chapters found")]
    NoChapters,
    #[error("chapter repository error: {0}")]
    ChapterRepository(#[from] ChapterRepositoryError),
    #[error("manga repository error: {0}")]
    MangaRepository(#[from] MangaRepositoryError),
}

/// Metadata the source is authoritative for. Read state is not part of it.
pub fn should_update_db_chapter(db_chapter: &Chapter, source_chapter: &Chapter) -> bool {
    db_chapter.scanlator != source_chapter.scanlator
        || db_chapter.name != source_chapter.name
        || db_chapter.date_upload != source_chapter.date_upload
        || db_chapter.chapter_number != source_chapter.chapter_number
        || db_chapter.source_order != source_chapter.source_order
}

#[derive(Clone)]
pub struct ChapterSyncService<C, M>
where
    C: ChapterRepository,
    M: MangaRepository,
{
    chapter_repo: C,
    manga_repo: M,
}

impl<C, M> ChapterSyncService<C, M>
where
    C: ChapterRepository,
    M: MangaRepository,
{
    pub fn new(chapter_repo: C, manga_repo: M) -> Self {
        Self {
            chapter_repo,
            manga_repo,
        }
    }

    pub async fn sync_chapters_with_source(
        &self,
        source_chapters: Vec<ChapterInfo>,
        manga: &Manga,
        source: &SourceInfo,
        fetch_window: FetchWindow,
    ) -> Result<Vec<Chapter>, ChapterSyncError> {
        self.sync_chapters_at(source_chapters, manga, source, fetch_window, Utc::now())
            .await
    }

    /// Reconcile stored chapters of `manga` with a fresh scrape of its source.
    ///
    /// Chapters are matched by url only. Stored chapters missing from the scrape
    /// are soft-deleted, soft-deleted chapters that show up again are restored with
    /// their read state intact. Returns the chapters that are genuinely new.
    pub async fn sync_chapters_at(
        &self,
        raw_source_chapters: Vec<ChapterInfo>,
        manga: &Manga,
        source: &SourceInfo,
        fetch_window: FetchWindow,
        now: DateTime<Utc>,
    ) -> Result<Vec<Chapter>, ChapterSyncError> {
        if raw_source_chapters.is_empty() && !source.local {
            return Err(ChapterSyncError::NoChapters);
        }

        let now_millis = now.timestamp_millis();

        let mut seen_urls = HashSet::new();
        let source_chapters: Vec<Chapter> = raw_source_chapters
            .into_iter()
            .filter(|ch| seen_urls.insert(ch.url.clone()))
            .enumerate()
            .map(|(index, ch)| {
                let mut chapter = Chapter::from_source(ch, manga.id, index as i64);
                chapter.name = sanitize_chapter_name(&chapter.name, &manga.title);
                chapter.chapter_number = parse_chapter_number(
                    &manga.title,
                    &chapter.name,
                    Some(chapter.chapter_number),
                );
                chapter
            })
            .collect();

        let db_chapters = self
            .chapter_repo
            .get_chapters_by_manga_id(manga.id, true)
            .await?;
        let db_chapters_by_url: HashMap<&str, &Chapter> =
            db_chapters.iter().map(|c| (c.url.as_str(), c)).collect();
        let source_urls: HashSet<&str> = source_chapters.iter().map(|c| c.url.as_str()).collect();

        // already soft-deleted chapters stay as they are
        let removed_chapters: Vec<&Chapter> = db_chapters
            .iter()
            .filter(|c| !c.deleted && !source_urls.contains(c.url.as_str()))
            .collect();

        let mut new_chapters = vec![];
        let mut updated_chapters = vec![];
        // keeps older chapters without a date from getting a later date than newer ones
        let mut max_seen_upload_date = 0;

        for chapter in &source_chapters {
            match db_chapters_by_url.get(chapter.url.as_str()) {
                None => {
                    let mut chapter = chapter.clone();
                    if chapter.date_upload == 0 {
                        chapter.date_upload = if max_seen_upload_date == 0 {
                            now_millis
                        } else {
                            max_seen_upload_date
                        };
                    } else {
                        max_seen_upload_date = max_seen_upload_date.max(chapter.date_upload);
                    }
                    new_chapters.push(chapter);
                }
                Some(db_chapter) => {
                    let metadata_changed = should_update_db_chapter(db_chapter, chapter);
                    if !metadata_changed && !db_chapter.deleted {
                        continue;
                    }

                    let mut to_change = (*db_chapter).clone();
                    if metadata_changed {
                        to_change.name = chapter.name.clone();
                        to_change.chapter_number = chapter.chapter_number;
                        to_change.scanlator = chapter.scanlator.clone();
                        to_change.source_order = chapter.source_order;
                        if chapter.date_upload != 0 {
                            to_change.date_upload = chapter.date_upload;
                        }
                    }
                    if db_chapter.deleted {
                        debug!("restoring chapter {} of {}", db_chapter.url, manga.title);
                    }
                    to_change.deleted = false;
                    updated_chapters.push(to_change);
                }
            }
        }

        if new_chapters.is_empty() && removed_chapters.is_empty() && updated_chapters.is_empty() {
            debug!("{} chapters are up to date", manga.title);
            self.update_fetch_interval(manga, now, fetch_window).await?;
            return Ok(vec![]);
        }

        let mut deleted_numbers = vec![];
        let mut deleted_read_numbers = vec![];
        let mut deleted_bookmarked_numbers = vec![];
        for chapter in &removed_chapters {
            if chapter.read {
                deleted_read_numbers.push(chapter.chapter_number);
            }
            if chapter.bookmark {
                deleted_bookmarked_numbers.push(chapter.chapter_number);
            }
            deleted_numbers.push(chapter.chapter_number);
        }

        // for duplicated numbers the oldest fetch date wins
        let mut deleted_date_fetch: Vec<(f64, i64)> = vec![];
        let mut by_fetch_date = removed_chapters.clone();
        by_fetch_date.sort_by(|a, b| b.date_fetch.cmp(&a.date_fetch));
        for chapter in by_fetch_date {
            match deleted_date_fetch
                .iter_mut()
                .find(|(number, _)| *number == chapter.chapter_number)
            {
                Some(entry) => entry.1 = chapter.date_fetch,
                None => deleted_date_fetch.push((chapter.chapter_number, chapter.date_fetch)),
            }
        }

        // sources list chapters newest first, keep that order in the fetch dates
        let mut item_count = new_chapters.len() as i64;
        let mut re_added_urls = HashSet::new();
        let chapters_to_add: Vec<Chapter> = new_chapters
            .into_iter()
            .map(|mut chapter| {
                chapter.date_fetch = now_millis + item_count;
                item_count -= 1;

                if !chapter.is_recognized_number()
                    || !deleted_numbers.contains(&chapter.chapter_number)
                {
                    return chapter;
                }

                chapter.read = deleted_read_numbers.contains(&chapter.chapter_number);
                chapter.bookmark = deleted_bookmarked_numbers.contains(&chapter.chapter_number);
                if let Some((_, date_fetch)) = deleted_date_fetch
                    .iter()
                    .find(|(number, _)| *number == chapter.chapter_number)
                {
                    chapter.date_fetch = *date_fetch;
                }
                re_added_urls.insert(chapter.url.clone());

                chapter
            })
            .collect();

        if !removed_chapters.is_empty() {
            let ids: Vec<i64> = removed_chapters.iter().map(|c| c.id).collect();
            info!(
                "{}: {} chapters no longer in source, soft-deleting",
                manga.title,
                ids.len()
            );
            self.chapter_repo.soft_delete_chapters_with_ids(&ids).await?;
        }

        let inserted = if chapters_to_add.is_empty() {
            vec![]
        } else {
            self.chapter_repo.insert_chapters(&chapters_to_add).await?
        };

        if !updated_chapters.is_empty() {
            self.chapter_repo.update_chapters(&updated_chapters).await?;
        }

        self.update_fetch_interval(manga, now, fetch_window).await?;

        // the chapter list changed
        self.manga_repo
            .update_last_update(manga.id, now_millis)
            .await?;

        Ok(inserted
            .into_iter()
            .filter(|c| !re_added_urls.contains(&c.url))
            .collect())
    }

    async fn update_fetch_interval(
        &self,
        manga: &Manga,
        now: DateTime<Utc>,
        fetch_window: FetchWindow,
    ) -> Result<(), ChapterSyncError> {
        let chapters = self
            .chapter_repo
            .get_chapters_by_manga_id(manga.id, false)
            .await?;
        let (next_update, interval) =
            fetch_interval::to_manga_update(manga, &chapters, now, fetch_window);

        self.manga_repo
            .update_fetch_interval(manga.id, next_update, interval)
            .await?;

        Ok(())
    }
}
