//! In-memory repositories and a scripted gallery site for service tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use tachisync_lib::models::{ChapterInfo, SourceInfo};
use tokio::sync::Notify;

use crate::domain::{
    entities::{
        category::Category,
        chapter::Chapter,
        favorite::{gallery_url, FavoriteEntry, EXH_SOURCE_ID},
        gallery::{Gallery, RemoteFavorites},
        manga::Manga,
    },
    repositories::{
        category::{CategoryRepository, CategoryRepositoryError},
        chapter::{ChapterRepository, ChapterRepositoryError},
        favorite::{FavoriteEntryRepository, FavoriteEntryRepositoryError},
        gallery::{GalleryRepository, GalleryRepositoryError},
        manga::{MangaRepository, MangaRepositoryError},
        unit_of_work::{TransactionError, UnitOfWork},
    },
};

pub fn source_info() -> SourceInfo {
    SourceInfo {
        id: EXH_SOURCE_ID,
        name: "ExHentai".to_string(),
        url: "https://exhentai.org".to_string(),
        nsfw: true,
        local: false,
    }
}

pub fn source_chapter(url: &str, name: &str, date_upload: i64) -> ChapterInfo {
    ChapterInfo {
        url: url.to_string(),
        name: name.to_string(),
        scanlator: None,
        chapter_number: -1.0,
        date_upload,
    }
}

pub fn favorite_entry(gid: &str, token: &str, category: i32) -> FavoriteEntry {
    FavoriteEntry {
        gid: gid.to_string(),
        token: token.to_string(),
        category,
        title: format!("Gallery {gid}"),
    }
}

pub fn gallery(gid: &str, token: &str, title: &str) -> Gallery {
    Gallery {
        gid: gid.to_string(),
        token: token.to_string(),
        title: title.to_string(),
        posted: 1_000,
        newer_versions: vec![],
    }
}

fn injected() -> sqlx::Error {
    sqlx::Error::Protocol("injected failure".to_string())
}

#[derive(Default, Clone)]
struct State {
    next_id: i64,
    manga: Vec<Manga>,
    chapters: Vec<Chapter>,
    categories: Vec<Category>,
    manga_categories: Vec<(i64, i64)>,
    snapshot: Vec<FavoriteEntry>,
    soft_delete_calls: Vec<Vec<i64>>,
    inserted_chapters: Vec<Chapter>,
    updated_chapters: Vec<Chapter>,
    fetch_interval_updates: usize,
    last_update_calls: usize,
    fail_chapter_writes: bool,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    parent: Option<Arc<Mutex<State>>>,
}

impl InMemoryStore {
    fn with<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    pub fn add_manga_with_source(
        &self,
        source_id: i64,
        url: &str,
        title: &str,
        favorite: bool,
    ) -> Manga {
        self.with(|state| {
            let manga = Manga {
                id: state.next_id(),
                source_id,
                url: url.to_string(),
                title: title.to_string(),
                favorite,
                ..Default::default()
            };
            state.manga.push(manga.clone());
            manga
        })
    }

    pub fn add_manga(&self, title: &str, favorite: bool) -> Manga {
        let url = format!("/manga/{}", title.to_lowercase().replace(' ', "-"));
        self.add_manga_with_source(1, &url, title, favorite)
    }

    pub fn add_gallery_manga(&self, gid: &str, token: &str, title: &str, favorite: bool) -> Manga {
        self.add_manga_with_source(EXH_SOURCE_ID, &gallery_url(gid, token), title, favorite)
    }

    pub fn manga_by_id(&self, id: i64) -> Manga {
        self.with(|state| state.manga.iter().find(|m| m.id == id).cloned().unwrap())
    }

    pub fn favorite_manga(&self) -> Vec<Manga> {
        self.with(|state| state.manga.iter().filter(|m| m.favorite).cloned().collect())
    }

    pub fn add_chapter(
        &self,
        manga_id: i64,
        url: &str,
        name: &str,
        chapter_number: f64,
        deleted: bool,
    ) -> Chapter {
        self.with(|state| {
            let chapter = Chapter {
                id: state.next_id(),
                manga_id,
                url: url.to_string(),
                name: name.to_string(),
                chapter_number,
                deleted,
                ..Default::default()
            };
            state.chapters.push(chapter.clone());
            chapter
        })
    }

    pub fn update_read_state(&self, chapter_id: i64, read: bool, last_page_read: i64) {
        self.with(|state| {
            let chapter = state
                .chapters
                .iter_mut()
                .find(|c| c.id == chapter_id)
                .unwrap();
            chapter.read = read;
            chapter.last_page_read = last_page_read;
        })
    }

    pub fn chapters_of(&self, manga_id: i64) -> Vec<Chapter> {
        self.with(|state| {
            state
                .chapters
                .iter()
                .filter(|c| c.manga_id == manga_id)
                .cloned()
                .collect()
        })
    }

    pub fn visible_chapters_of(&self, manga_id: i64) -> Vec<Chapter> {
        self.chapters_of(manga_id)
            .into_iter()
            .filter(|c| !c.deleted)
            .collect()
    }

    pub fn chapter_by_url(&self, manga_id: i64, url: &str) -> Option<Chapter> {
        self.chapters_of(manga_id).into_iter().find(|c| c.url == url)
    }

    pub fn soft_delete_calls(&self) -> Vec<Vec<i64>> {
        self.with(|state| state.soft_delete_calls.clone())
    }

    pub fn inserted_chapters(&self) -> Vec<Chapter> {
        self.with(|state| state.inserted_chapters.clone())
    }

    pub fn updated_chapters(&self) -> Vec<Chapter> {
        self.with(|state| state.updated_chapters.clone())
    }

    pub fn fetch_interval_updates(&self) -> usize {
        self.with(|state| state.fetch_interval_updates)
    }

    pub fn last_update_calls(&self) -> usize {
        self.with(|state| state.last_update_calls)
    }

    pub fn reset_calls(&self) {
        self.with(|state| {
            state.soft_delete_calls.clear();
            state.inserted_chapters.clear();
            state.updated_chapters.clear();
            state.fetch_interval_updates = 0;
            state.last_update_calls = 0;
        })
    }

    pub fn fail_chapter_writes(&self, fail: bool) {
        self.with(|state| state.fail_chapter_writes = fail)
    }

    pub fn add_category(&self, name: &str, sort_order: i64) -> Category {
        self.with(|state| {
            let category = Category {
                id: state.next_id(),
                name: name.to_string(),
                sort_order,
            };
            state.categories.push(category.clone());
            category
        })
    }

    pub fn assign_category(&self, manga_id: i64, category_id: i64) {
        self.with(|state| state.manga_categories.push((manga_id, category_id)))
    }

    pub fn category_names(&self) -> Vec<String> {
        self.with(|state| {
            let mut categories = state.categories.clone();
            categories.sort_by_key(|c| c.sort_order);
            categories.into_iter().map(|c| c.name).collect()
        })
    }

    pub fn category_ids_of(&self, manga_id: i64) -> Vec<i64> {
        self.with(|state| {
            state
                .manga_categories
                .iter()
                .filter(|(m, _)| *m == manga_id)
                .map(|(_, c)| *c)
                .collect()
        })
    }

    pub fn snapshot(&self) -> Vec<FavoriteEntry> {
        self.with(|state| state.snapshot.clone())
    }

    pub fn set_snapshot(&self, entries: Vec<FavoriteEntry>) {
        self.with(|state| state.snapshot = entries)
    }
}

#[async_trait]
impl ChapterRepository for InMemoryStore {
    async fn get_chapters_by_manga_id(
        &self,
        manga_id: i64,
        include_deleted: bool,
    ) -> Result<Vec<Chapter>, ChapterRepositoryError> {
        Ok(self
            .chapters_of(manga_id)
            .into_iter()
            .filter(|c| include_deleted || !c.deleted)
            .collect())
    }

    async fn insert_chapters(
        &self,
        chapters: &[Chapter],
    ) -> Result<Vec<Chapter>, ChapterRepositoryError> {
        self.with(|state| {
            if state.fail_chapter_writes {
                return Err(injected().into());
            }
            let mut inserted = vec![];
            for chapter in chapters {
                let mut chapter = chapter.clone();
                chapter.id = state.next_id();
                state.chapters.push(chapter.clone());
                state.inserted_chapters.push(chapter.clone());
                inserted.push(chapter);
            }
            Ok(inserted)
        })
    }

    async fn update_chapters(&self, chapters: &[Chapter]) -> Result<(), ChapterRepositoryError> {
        self.with(|state| {
            if state.fail_chapter_writes {
                return Err(injected().into());
            }
            for update in chapters {
                if let Some(chapter) = state.chapters.iter_mut().find(|c| c.id == update.id) {
                    chapter.name = update.name.clone();
                    chapter.scanlator = update.scanlator.clone();
                    chapter.chapter_number = update.chapter_number;
                    chapter.source_order = update.source_order;
                    chapter.date_upload = update.date_upload;
                    chapter.deleted = update.deleted;
                }
                state.updated_chapters.push(update.clone());
            }
            Ok(())
        })
    }

    async fn soft_delete_chapters_with_ids(
        &self,
        ids: &[i64],
    ) -> Result<(), ChapterRepositoryError> {
        self.with(|state| {
            if state.fail_chapter_writes {
                return Err(injected().into());
            }
            for chapter in state.chapters.iter_mut().filter(|c| ids.contains(&c.id)) {
                chapter.deleted = true;
            }
            state.soft_delete_calls.push(ids.to_vec());
            Ok(())
        })
    }
}

#[async_trait]
impl MangaRepository for InMemoryStore {
    async fn get_manga_by_id(&self, id: i64) -> Result<Manga, MangaRepositoryError> {
        self.with(|state| {
            state
                .manga
                .iter()
                .find(|m| m.id == id)
                .cloned()
                .ok_or(MangaRepositoryError::DbError(sqlx::Error::RowNotFound))
        })
    }

    async fn get_manga_by_url(
        &self,
        source_id: i64,
        url: &str,
    ) -> Result<Option<Manga>, MangaRepositoryError> {
        Ok(self.with(|state| {
            state
                .manga
                .iter()
                .find(|m| m.source_id == source_id && m.url == url)
                .cloned()
        }))
    }

    async fn get_favorite_manga(&self) -> Result<Vec<Manga>, MangaRepositoryError> {
        Ok(self.favorite_manga())
    }

    async fn insert_manga(&self, manga: &Manga) -> Result<Manga, MangaRepositoryError> {
        Ok(self.with(|state| {
            let mut manga = manga.clone();
            manga.id = state.next_id();
            state.manga.push(manga.clone());
            manga
        }))
    }

    async fn update_favorite(&self, id: i64, favorite: bool) -> Result<(), MangaRepositoryError> {
        self.with(|state| {
            if let Some(manga) = state.manga.iter_mut().find(|m| m.id == id) {
                manga.favorite = favorite;
            }
        });
        Ok(())
    }

    async fn update_fetch_interval(
        &self,
        id: i64,
        next_update: i64,
        fetch_interval: i32,
    ) -> Result<(), MangaRepositoryError> {
        self.with(|state| {
            if let Some(manga) = state.manga.iter_mut().find(|m| m.id == id) {
                manga.next_update = next_update;
                manga.fetch_interval = fetch_interval;
            }
            state.fetch_interval_updates += 1;
        });
        Ok(())
    }

    async fn update_last_update(
        &self,
        id: i64,
        last_update: i64,
    ) -> Result<(), MangaRepositoryError> {
        self.with(|state| {
            if let Some(manga) = state.manga.iter_mut().find(|m| m.id == id) {
                manga.last_update = last_update;
            }
            state.last_update_calls += 1;
        });
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for InMemoryStore {
    async fn get_categories(&self) -> Result<Vec<Category>, CategoryRepositoryError> {
        Ok(self.with(|state| {
            let mut categories = state.categories.clone();
            categories.sort_by_key(|c| c.sort_order);
            categories
        }))
    }

    async fn get_categories_by_manga_id(
        &self,
        manga_id: i64,
    ) -> Result<Vec<Category>, CategoryRepositoryError> {
        Ok(self.with(|state| {
            let ids: HashSet<i64> = state
                .manga_categories
                .iter()
                .filter(|(m, _)| *m == manga_id)
                .map(|(_, c)| *c)
                .collect();
            let mut categories: Vec<Category> = state
                .categories
                .iter()
                .filter(|c| ids.contains(&c.id))
                .cloned()
                .collect();
            categories.sort_by_key(|c| c.sort_order);
            categories
        }))
    }

    async fn create_category(
        &self,
        name: &str,
        sort_order: i64,
    ) -> Result<Category, CategoryRepositoryError> {
        Ok(self.add_category(name, sort_order))
    }

    async fn update_category(&self, category: &Category) -> Result<(), CategoryRepositoryError> {
        self.with(|state| {
            if let Some(existing) = state.categories.iter_mut().find(|c| c.id == category.id) {
                *existing = category.clone();
            }
        });
        Ok(())
    }

    async fn set_manga_categories(
        &self,
        manga_ids: &[i64],
        category_ids: &[i64],
    ) -> Result<(), CategoryRepositoryError> {
        self.with(|state| {
            state
                .manga_categories
                .retain(|(m, _)| !manga_ids.contains(m));
            for manga_id in manga_ids {
                for category_id in category_ids {
                    state.manga_categories.push((*manga_id, *category_id));
                }
            }
        });
        Ok(())
    }
}

#[async_trait]
impl FavoriteEntryRepository for InMemoryStore {
    async fn get_entries(&self) -> Result<Vec<FavoriteEntry>, FavoriteEntryRepositoryError> {
        Ok(self.snapshot())
    }

    async fn replace_entries(
        &self,
        entries: &[FavoriteEntry],
    ) -> Result<(), FavoriteEntryRepositoryError> {
        self.set_snapshot(entries.to_vec());
        Ok(())
    }

    async fn clear_entries(&self) -> Result<(), FavoriteEntryRepositoryError> {
        self.set_snapshot(vec![]);
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for InMemoryStore {
    type Chapters = InMemoryStore;
    type Manga = InMemoryStore;
    type Categories = InMemoryStore;
    type Favorites = InMemoryStore;

    fn chapters(&self) -> Self::Chapters {
        self.clone()
    }

    fn manga(&self) -> Self::Manga {
        self.clone()
    }

    fn categories(&self) -> Self::Categories {
        self.clone()
    }

    fn favorites(&self) -> Self::Favorites {
        self.clone()
    }

    async fn begin(&self) -> Result<Self, TransactionError> {
        let copy = self.with(|state| state.clone());
        Ok(Self {
            state: Arc::new(Mutex::new(copy)),
            parent: Some(self.state.clone()),
        })
    }

    async fn commit(self) -> Result<(), TransactionError> {
        if let Some(parent) = self.parent {
            let state = self.state.lock().unwrap().clone();
            *parent.lock().unwrap() = state;
        }
        Ok(())
    }

    async fn rollback(self) -> Result<(), TransactionError> {
        Ok(())
    }
}

#[derive(Default)]
struct GalleryState {
    galleries: HashMap<String, Gallery>,
    favorites: RemoteFavorites,
    fail_fetch_favorites: bool,
    fetch_gate: Option<Arc<Notify>>,
    broken_galleries: HashSet<String>,
    add_failures: usize,
    delete_failures: usize,
    add_attempts: usize,
    delete_attempts: usize,
    added: Vec<FavoriteEntry>,
    deleted: Vec<Vec<String>>,
}

/// Scripted stand-in for the gallery site
#[derive(Default, Clone)]
pub struct FakeGallery {
    state: Arc<Mutex<GalleryState>>,
}

impl FakeGallery {
    fn with<T>(&self, f: impl FnOnce(&mut GalleryState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    pub fn add_gallery(&self, gallery: Gallery) {
        self.with(|state| state.galleries.insert(gallery.gid.clone(), gallery));
    }

    pub fn set_favorites(&self, categories: &[&str], galleries: Vec<FavoriteEntry>) {
        self.with(|state| {
            state.favorites = RemoteFavorites {
                categories: categories.iter().map(|c| c.to_string()).collect(),
                galleries,
            }
        });
    }

    pub fn fail_fetch_favorites(&self) {
        self.with(|state| state.fail_fetch_favorites = true);
    }

    /// `fetch_favorites` waits until the returned gate is notified
    pub fn hold_fetch_favorites(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.with(|state| state.fetch_gate = Some(gate.clone()));
        gate
    }

    /// Fetching this gallery fails with a server error
    pub fn break_gallery(&self, gid: &str) {
        self.with(|state| state.broken_galleries.insert(gid.to_string()));
    }

    pub fn fail_adds(&self, times: usize) {
        self.with(|state| state.add_failures = times);
    }

    pub fn fail_deletes(&self, times: usize) {
        self.with(|state| state.delete_failures = times);
    }

    pub fn add_attempts(&self) -> usize {
        self.with(|state| state.add_attempts)
    }

    pub fn delete_attempts(&self) -> usize {
        self.with(|state| state.delete_attempts)
    }

    pub fn added(&self) -> Vec<FavoriteEntry> {
        self.with(|state| state.added.clone())
    }

    pub fn deleted(&self) -> Vec<Vec<String>> {
        self.with(|state| state.deleted.clone())
    }
}

#[async_trait]
impl GalleryRepository for FakeGallery {
    async fn fetch_favorites(&self) -> Result<RemoteFavorites, GalleryRepositoryError> {
        if let Some(gate) = self.with(|state| state.fetch_gate.clone()) {
            gate.notified().await;
        }

        self.with(|state| {
            if state.fail_fetch_favorites {
                return Err(GalleryRepositoryError::NotLoggedIn);
            }
            Ok(state.favorites.clone())
        })
    }

    async fn fetch_gallery(
        &self,
        gid: &str,
        token: &str,
    ) -> Result<Gallery, GalleryRepositoryError> {
        self.with(|state| {
            if state.broken_galleries.contains(gid) {
                return Err(GalleryRepositoryError::Status(503));
            }
            state
                .galleries
                .get(gid)
                .filter(|g| g.token == token)
                .cloned()
                .ok_or(GalleryRepositoryError::NotFound)
        })
    }

    async fn delete_favorites(&self, gids: &[String]) -> Result<(), GalleryRepositoryError> {
        self.with(|state| {
            state.delete_attempts += 1;
            if state.delete_failures > 0 {
                state.delete_failures -= 1;
                return Err(GalleryRepositoryError::Status(500));
            }
            state
                .favorites
                .galleries
                .retain(|entry| !gids.contains(&entry.gid));
            state.deleted.push(gids.to_vec());
            Ok(())
        })
    }

    async fn add_favorite(&self, entry: &FavoriteEntry) -> Result<(), GalleryRepositoryError> {
        self.with(|state| {
            state.add_attempts += 1;
            if state.add_failures > 0 {
                state.add_failures -= 1;
                return Err(GalleryRepositoryError::Status(500));
            }
            state.favorites.galleries.push(entry.clone());
            state.added.push(entry.clone());
            Ok(())
        })
    }
}
