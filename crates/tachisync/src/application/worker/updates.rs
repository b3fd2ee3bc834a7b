use std::fmt::Display;

use chrono::Utc;
use tachisync_lib::prelude::SourceRegistry;
use tokio::{
    task::JoinHandle,
    time::{self, Instant},
};

use crate::domain::{
    entities::{chapter::Chapter, manga::Manga},
    repositories::{chapter::ChapterRepository, manga::MangaRepository},
    services::{
        chapter_sync::{ChapterSyncError, ChapterSyncService},
        fetch_interval::{self, FetchWindow},
    },
};

#[derive(Debug, Clone)]
pub struct ChapterUpdate {
    pub manga: Manga,
    pub chapter: Chapter,
}

pub type ChapterUpdateReceiver = tokio::sync::broadcast::Receiver<ChapterUpdate>;
pub type ChapterUpdateSender = tokio::sync::broadcast::Sender<ChapterUpdate>;

pub enum ChapterUpdateCommand {
    All(tokio::sync::oneshot::Sender<Result<(), anyhow::Error>>),
    Manga(i64, tokio::sync::oneshot::Sender<Result<(), anyhow::Error>>),
    /// Periodic and manual updates are refused until `Resume`
    Pause,
    Resume,
}

impl Display for ChapterUpdateCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChapterUpdateCommand::All(_) => write!(f, "ChapterUpdateCommand::All"),
            ChapterUpdateCommand::Manga(id, _) => write!(f, "ChapterUpdateCommand::Manga({id})"),
            ChapterUpdateCommand::Pause => write!(f, "ChapterUpdateCommand::Pause"),
            ChapterUpdateCommand::Resume => write!(f, "ChapterUpdateCommand::Resume"),
        }
    }
}

pub type ChapterUpdateCommandReceiver = flume::Receiver<ChapterUpdateCommand>;
pub type ChapterUpdateCommandSender = flume::Sender<ChapterUpdateCommand>;

/// Favorite manga whose next update is due by the end of the window.
pub fn due_manga(manga: Vec<Manga>, window: FetchWindow) -> Vec<Manga> {
    manga
        .into_iter()
        .filter(|m| m.favorite && m.next_update <= window.1)
        .collect()
}

struct UpdatesWorker<C, M>
where
    C: ChapterRepository + 'static,
    M: MangaRepository + Clone + 'static,
{
    period: u64,
    paused: bool,
    manga_repo: M,
    chapter_sync: ChapterSyncService<C, M>,
    sources: SourceRegistry,
    broadcast_tx: ChapterUpdateSender,
    command_rx: ChapterUpdateCommandReceiver,
}

impl<C, M> UpdatesWorker<C, M>
where
    C: ChapterRepository + 'static,
    M: MangaRepository + Clone + 'static,
{
    fn new(
        period: u64,
        chapter_repo: C,
        manga_repo: M,
        sources: SourceRegistry,
        broadcast_tx: ChapterUpdateSender,
    ) -> (Self, ChapterUpdateCommandSender) {
        #[cfg(not(debug_assertions))]
        let period = if period > 0 && period < 3600 {
            3600
        } else {
            period
        };
        info!("periodic updates every {} seconds", period);

        // a sent command is only accepted between update runs
        let (command_tx, command_rx) = flume::bounded(0);

        (
            Self {
                period,
                paused: false,
                chapter_sync: ChapterSyncService::new(chapter_repo, manga_repo.clone()),
                manga_repo,
                sources,
                broadcast_tx,
                command_rx,
            },
            command_tx,
        )
    }

    async fn check_chapter_update(&self, manga_list: Vec<Manga>) -> Result<(), anyhow::Error> {
        let window = fetch_interval::window(Utc::now());

        for manga in manga_list {
            debug!("Checking updates: {}", manga.title);

            let source = match self.sources.get(manga.source_id) {
                Ok(source) => source,
                Err(e) => {
                    warn!("skip {}: {e}", manga.title);
                    continue;
                }
            };

            let source_chapters = match source.get_chapters(manga.url.clone()).await {
                Ok(chapters) => chapters,
                Err(e) => {
                    error!(
                        "error fetch new chapters for {}, source {}, reason: {}",
                        manga.title, manga.source_id, e
                    );
                    continue;
                }
            };

            match self
                .chapter_sync
                .sync_chapters_with_source(
                    source_chapters,
                    &manga,
                    &source.get_source_info(),
                    window,
                )
                .await
            {
                Ok(chapters) if chapters.is_empty() => {
                    debug!("{} has no new chapters", manga.title);
                }
                Ok(chapters) => {
                    info!("{} has {} new chapters", manga.title, chapters.len());
                    for chapter in chapters {
                        if let Err(e) = self.broadcast_tx.send(ChapterUpdate {
                            manga: manga.clone(),
                            chapter,
                        }) {
                            debug!("no chapter update subscriber: {e}");
                        }
                    }
                }
                Err(ChapterSyncError::NoChapters) => {
                    warn!("{} returned no chapters", manga.title);
                }
                Err(e) => return Err(e.into()),
            }

            time::sleep(time::Duration::from_secs(1)).await;
        }

        Ok(())
    }

    async fn update_all(&self) -> Result<(), anyhow::Error> {
        let manga = self.manga_repo.get_favorite_manga().await?;
        self.check_chapter_update(manga).await
    }

    async fn update_manga(&self, manga_id: i64) -> Result<(), anyhow::Error> {
        let manga = self.manga_repo.get_manga_by_id(manga_id).await?;
        self.check_chapter_update(vec![manga]).await
    }

    async fn update_due(&self) -> Result<(), anyhow::Error> {
        let window = fetch_interval::window(Utc::now());
        let manga = due_manga(self.manga_repo.get_favorite_manga().await?, window);
        info!("{} manga due for update", manga.len());
        self.check_chapter_update(manga).await
    }

    async fn run(mut self) {
        let period = if self.period == 0 { 3600 } else { self.period };
        let mut chapter_update_interval = time::interval(time::Duration::from_secs(period));

        loop {
            tokio::select! {
                Ok(cmd) = self.command_rx.recv_async() => {
                    info!("received command: {cmd}");
                    match cmd {
                        ChapterUpdateCommand::Pause => self.paused = true,
                        ChapterUpdateCommand::Resume => self.paused = false,
                        ChapterUpdateCommand::All(tx) => {
                            let res = if self.paused {
                                Err(anyhow::anyhow!("update worker is paused"))
                            } else {
                                self.update_all().await
                            };
                            if tx.send(res).is_err() {
                                info!("failed to send chapter update result");
                            }
                        },
                        ChapterUpdateCommand::Manga(manga_id, tx) => {
                            let res = if self.paused {
                                Err(anyhow::anyhow!("update worker is paused"))
                            } else {
                                self.update_manga(manga_id).await
                            };
                            if tx.send(res).is_err() {
                                info!("failed to send chapter update result");
                            }
                        },
                    }
                }
                start = chapter_update_interval.tick() => {
                    if self.period == 0 {
                        continue;
                    }
                    if self.paused {
                        info!("updates paused, skip periodic updates");
                        continue;
                    }

                    info!("start periodic updates");

                    if let Err(e) = self.update_due().await {
                        error!("failed check chapter update: {e}")
                    }

                    info!("periodic updates done in {:?}", Instant::now() - start);
                }
            }
        }
    }
}

pub fn start<C, M>(
    period: u64,
    chapter_repo: C,
    manga_repo: M,
    sources: SourceRegistry,
) -> (
    ChapterUpdateReceiver,
    ChapterUpdateCommandSender,
    JoinHandle<()>,
)
where
    C: ChapterRepository + 'static,
    M: MangaRepository + Clone + 'static,
{
    let (broadcast_tx, broadcast_rx) = tokio::sync::broadcast::channel(10);
    let (worker, command_tx) =
        UpdatesWorker::new(period, chapter_repo, manga_repo, sources, broadcast_tx);

    let handle = tokio::spawn(worker.run());

    (broadcast_rx, command_tx, handle)
}
