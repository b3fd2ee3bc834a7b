use std::{collections::BTreeMap, future::Future};

use tachisync_lib::models::SourceInfo;
use thiserror::Error;
use tokio::sync::watch;

use crate::{
    application::worker::updates::{ChapterUpdateCommand, ChapterUpdateCommandSender},
    domain::{
        entities::{
            category::Category,
            favorite::{gallery_source_ids, is_gallery_source, ChangeSet},
            gallery::RemoteFavorites,
            manga::Manga,
        },
        repositories::{
            category::{CategoryRepository, CategoryRepositoryError},
            gallery::{GalleryRepository, GalleryRepositoryError},
            manga::{MangaRepository, MangaRepositoryError},
            unit_of_work::{TransactionError, UnitOfWork},
        },
        services::{
            favorites_storage::{FavoritesStorageError, LocalFavoritesStorage},
            gallery_adder::{GalleryAddError, GalleryAddEvent, GalleryAddFailure, GalleryAdder},
            throttle::ThrottleManager,
        },
    },
    infrastructure::config::FavoritesConfig,
};

/// Attempts per request to the gallery site
const MAX_RETRIES: usize = 10;
/// Manga written per category or favorite batch
const BATCH_SIZE: usize = 10;

const FETCH_FAILED: &str = "Failed to fetch favorites from remote server";

#[derive(Debug, Clone, PartialEq)]
pub enum BadLibraryState {
    MangaInMultipleCategories {
        manga: Manga,
        categories: Vec<Category>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FavoritesSyncStatus {
    Idle,
    Initializing,
    Processing {
        message: String,
        title: Option<String>,
    },
    Error(String),
    CompleteWithErrors(Vec<String>),
    BadLibraryState(BadLibraryState),
}

impl FavoritesSyncStatus {
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            FavoritesSyncStatus::Initializing | FavoritesSyncStatus::Processing { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum FavoritesSyncError {
    /// a remote failure in strict mode
    #[error("{0}")]
    Remote(String),
    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),
    #[error("favorites storage error: {0}")]
    Storage(#[from] FavoritesStorageError),
    #[error("manga repository error: {0}")]
    MangaRepository(#[from] MangaRepositoryError),
    #[error("category repository error: {0}")]
    CategoryRepository(#[from] CategoryRepositoryError),
    #[error("gallery add error: {0}")]
    GalleryAdd(#[from] GalleryAddError),
}

enum Outcome {
    Done(Vec<String>),
    BadLibrary(BadLibraryState),
}

/// Two-way sync between the local library and the gallery site favorites.
///
/// Both sides are diffed against the snapshot taken at the end of the last
/// successful sync, remote changes are applied locally and local changes are
/// pushed to the site. All local writes happen in one transaction.
pub struct FavoritesSyncHelper<U, G>
where
    U: UnitOfWork,
    G: GalleryRepository + Clone + 'static,
{
    uow: U,
    gallery: G,
    source: SourceInfo,
    config: FavoritesConfig,
    worker: Option<ChapterUpdateCommandSender>,
    status_tx: watch::Sender<FavoritesSyncStatus>,
}

impl<U, G> FavoritesSyncHelper<U, G>
where
    U: UnitOfWork,
    G: GalleryRepository + Clone + 'static,
{
    pub fn new(uow: U, gallery: G, source: SourceInfo, config: FavoritesConfig) -> Self {
        let (status_tx, _) = watch::channel(FavoritesSyncStatus::Idle);

        Self {
            uow,
            gallery,
            source,
            config,
            worker: None,
            status_tx,
        }
    }

    /// Pause this update worker while a sync runs.
    pub fn with_worker(mut self, worker: ChapterUpdateCommandSender) -> Self {
        self.worker = Some(worker);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<FavoritesSyncStatus> {
        self.status_tx.subscribe()
    }

    pub fn status(&self) -> FavoritesSyncStatus {
        self.status_tx.borrow().clone()
    }

    /// Returns right away when a sync is already running.
    pub async fn run_sync(&self) {
        let started = self.status_tx.send_if_modified(|status| {
            if status.is_running() {
                return false;
            }
            *status = FavoritesSyncStatus::Initializing;
            true
        });
        if !started {
            info!("favorites sync already running");
            return;
        }

        self.send_worker(ChapterUpdateCommand::Pause).await;
        let result = self.sync().await;
        self.send_worker(ChapterUpdateCommand::Resume).await;

        let status = match result {
            Ok(Outcome::Done(errors)) if errors.is_empty() => {
                info!("favorites sync done");
                FavoritesSyncStatus::Idle
            }
            Ok(Outcome::Done(errors)) => {
                warn!("favorites sync done with {} errors", errors.len());
                FavoritesSyncStatus::CompleteWithErrors(errors)
            }
            Ok(Outcome::BadLibrary(state)) => {
                warn!("favorites sync stopped: {state:?}");
                FavoritesSyncStatus::BadLibraryState(state)
            }
            Err(e) => {
                error!("favorites sync failed: {e}");
                FavoritesSyncStatus::Error(e.to_string())
            }
        };
        self.status_tx.send_replace(status);
    }

    /// Forget the last sync, the next one treats every favorite on both sides as new.
    pub async fn clear_snapshots(&self) -> Result<(), FavoritesSyncError> {
        LocalFavoritesStorage::new(self.uow.manga(), self.uow.categories(), self.uow.favorites())
            .clear_snapshots()
            .await?;

        Ok(())
    }

    async fn send_worker(&self, command: ChapterUpdateCommand) {
        if let Some(worker) = &self.worker {
            if let Err(e) = worker.send_async(command).await {
                warn!("update worker is gone: {e}");
            }
        }
    }

    fn processing(&self, message: impl Into<String>, title: Option<String>) {
        let message = message.into();
        debug!("{message}");
        self.status_tx
            .send_replace(FavoritesSyncStatus::Processing { message, title });
    }

    fn report(&self, errors: &mut Vec<String>, message: String) -> Result<(), FavoritesSyncError> {
        if self.config.lenient {
            warn!("{message}");
            errors.push(message);
            Ok(())
        } else {
            Err(FavoritesSyncError::Remote(message))
        }
    }

    async fn sync(&self) -> Result<Outcome, FavoritesSyncError> {
        if let Some(state) = self.check_library_state().await? {
            return Ok(Outcome::BadLibrary(state));
        }

        self.processing("Downloading favorites from remote server", None);
        let remote = match self.gallery.fetch_favorites().await {
            Ok(remote) => remote,
            Err(e) => {
                error!("{FETCH_FAILED}: {e}");
                return Err(FavoritesSyncError::Remote(FETCH_FAILED.to_string()));
            }
        };

        let tx = self.uow.begin().await?;
        let mut errors = vec![];
        match self.sync_in_transaction(&tx, &remote, &mut errors).await {
            Ok(()) => tx.commit().await?,
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    error!("failed to roll back favorites sync: {rollback}");
                }
                return Err(e);
            }
        }

        Ok(Outcome::Done(errors))
    }

    async fn check_library_state(&self) -> Result<Option<BadLibraryState>, FavoritesSyncError> {
        self.processing("Verifying local library", None);

        let categories_repo = self.uow.categories();
        for manga in self
            .uow
            .manga()
            .get_favorite_manga()
            .await?
            .into_iter()
            .filter(|m| is_gallery_source(m.source_id))
        {
            let categories = categories_repo.get_categories_by_manga_id(manga.id).await?;
            if categories.len() > 1 {
                return Ok(Some(BadLibraryState::MangaInMultipleCategories {
                    manga,
                    categories,
                }));
            }
        }

        Ok(None)
    }

    async fn sync_in_transaction(
        &self,
        tx: &U,
        remote: &RemoteFavorites,
        errors: &mut Vec<String>,
    ) -> Result<(), FavoritesSyncError> {
        let storage = LocalFavoritesStorage::new(tx.manga(), tx.categories(), tx.favorites());

        self.processing("Calculating remote changes", None);
        let remote_changes = storage.changed_remote_entries(&remote.galleries).await?;

        let local_changes = if self.config.read_only {
            None
        } else {
            self.processing("Calculating local changes", None);
            Some(storage.changed_local_entries().await?)
        };

        self.processing("Updating category names", None);
        self.apply_remote_categories(tx, &remote.categories).await?;

        let mut throttle = ThrottleManager::default();
        self.apply_changes_to_local(tx, &remote_changes, &mut throttle, errors)
            .await?;

        if let Some(local_changes) = local_changes {
            self.apply_changes_to_remote(&local_changes, &mut throttle, errors)
                .await?;
        }

        self.processing("Cleaning up", None);
        storage.snapshot_entries().await?;

        Ok(())
    }

    /// The first categories take the names and order of the remote favorite slots.
    async fn apply_remote_categories(
        &self,
        tx: &U,
        names: &[String],
    ) -> Result<(), FavoritesSyncError> {
        let categories_repo = tx.categories();
        let existing = categories_repo.get_categories().await?;

        for (index, name) in names.iter().enumerate() {
            let sort_order = index as i64;
            match existing.get(index) {
                Some(category) if category.name == *name && category.sort_order == sort_order => {}
                Some(category) => {
                    categories_repo
                        .update_category(&Category {
                            name: name.clone(),
                            sort_order,
                            ..category.clone()
                        })
                        .await?;
                }
                None => {
                    categories_repo.create_category(name, sort_order).await?;
                }
            }
        }

        Ok(())
    }

    async fn find_local_manga(&self, tx: &U, url: &str) -> Result<Option<Manga>, FavoritesSyncError> {
        let manga_repo = tx.manga();
        for source_id in gallery_source_ids(self.source.id) {
            if let Some(manga) = manga_repo.get_manga_by_url(source_id, url).await? {
                return Ok(Some(manga));
            }
        }

        Ok(None)
    }

    async fn apply_changes_to_local(
        &self,
        tx: &U,
        changes: &ChangeSet,
        throttle: &mut ThrottleManager,
        errors: &mut Vec<String>,
    ) -> Result<(), FavoritesSyncError> {
        let manga_repo = tx.manga();
        let categories_repo = tx.categories();

        if !changes.removed.is_empty() {
            self.processing(
                format!("Removing {} galleries from local library", changes.removed.len()),
                None,
            );

            let mut removed = vec![];
            for entry in &changes.removed {
                match self.find_local_manga(tx, &entry.gallery_url()).await? {
                    Some(manga) if manga.favorite => removed.push(manga.id),
                    _ => debug!("{} is not in the local library", entry.title),
                }
            }

            for chunk in removed.chunks(BATCH_SIZE) {
                for id in chunk {
                    manga_repo.update_favorite(*id, false).await?;
                }
                categories_repo.set_manga_categories(chunk, &[]).await?;
            }
        }

        if changes.added.is_empty() {
            return Ok(());
        }

        let categories = categories_repo.get_categories().await?;
        let adder = GalleryAdder::new(
            tx.chapters(),
            tx.manga(),
            self.gallery.clone(),
            self.source.clone(),
        );

        // category id -> manga ids
        let mut to_categorize: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
        throttle.reset();
        let total = changes.added.len();
        for (index, entry) in changes.added.iter().enumerate() {
            self.processing(
                format!("Adding gallery {} of {total} to the local library", index + 1),
                Some(entry.title.clone()),
            );
            throttle.throttle().await;

            match adder.add_gallery(&entry.gallery_url(), true).await? {
                GalleryAddEvent::Success(manga) => {
                    match categories.get(entry.category as usize) {
                        Some(category) => to_categorize.entry(category.id).or_default().push(manga.id),
                        None => warn!("no local category for favorite slot {}", entry.category),
                    }
                }
                GalleryAddEvent::Fail(GalleryAddFailure::NotFound) => {
                    info!("{} no longer exists, skipping", entry.title);
                }
                GalleryAddEvent::Fail(GalleryAddFailure::Error(e)) => {
                    self.report(
                        errors,
                        format!("Failed to add gallery to local database: '{}' ({e})", entry.title),
                    )?;
                }
            }
        }

        for (category_id, manga_ids) in to_categorize {
            for chunk in manga_ids.chunks(BATCH_SIZE) {
                categories_repo
                    .set_manga_categories(chunk, &[category_id])
                    .await?;
            }
        }

        Ok(())
    }

    async fn apply_changes_to_remote(
        &self,
        changes: &ChangeSet,
        throttle: &mut ThrottleManager,
        errors: &mut Vec<String>,
    ) -> Result<(), FavoritesSyncError> {
        if !changes.removed.is_empty() {
            self.processing(
                format!("Removing {} galleries from remote server", changes.removed.len()),
                None,
            );

            let gids: Vec<String> = changes.removed.iter().map(|e| e.gid.clone()).collect();
            if let Err(e) = with_retries(|| self.gallery.delete_favorites(&gids)).await {
                self.report(
                    errors,
                    format!("Unable to delete galleries from the remote servers ({e})"),
                )?;
            }
        }

        throttle.reset();
        let total = changes.added.len();
        for (index, entry) in changes.added.iter().enumerate() {
            self.processing(
                format!("Adding gallery {} of {total} to remote server", index + 1),
                Some(entry.title.clone()),
            );
            throttle.throttle().await;

            if let Err(e) = with_retries(|| self.gallery.add_favorite(entry)).await {
                self.report(
                    errors,
                    format!("Unable to add gallery to remote server: '{}' ({e})", entry.title),
                )?;
            }
        }

        Ok(())
    }
}

/// A missing gallery is not retried.
async fn with_retries<F, Fut>(mut request: F) -> Result<(), GalleryRepositoryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), GalleryRepositoryError>>,
{
    let mut attempt = 1;
    loop {
        match request().await {
            Ok(()) => return Ok(()),
            Err(GalleryRepositoryError::NotFound) => return Err(GalleryRepositoryError::NotFound),
            Err(e) if attempt >= MAX_RETRIES => return Err(e),
            Err(e) => {
                debug!("attempt {attempt} failed: {e}");
                attempt += 1;
            }
        }
    }
}
