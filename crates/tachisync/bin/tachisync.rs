#[macro_use]
extern crate log;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tachisync::{
    application::{
        favorites_sync::{FavoritesSyncHelper, FavoritesSyncStatus},
        worker::{self, updates::ChapterUpdateCommand},
    },
    infrastructure::{
        config::{Config, GLOBAL_CONFIG},
        database,
        domain::repositories::{
            chapter::ChapterRepositoryImpl, manga::MangaRepositoryImpl,
            unit_of_work::SqliteUnitOfWork,
        },
        gallery::{client::GalleryClient, source::GallerySource},
    },
};
use tachisync_lib::prelude::{Source, SourceRegistry};
use tokio::time;

#[derive(Parser)]
#[command(version, about)]
struct Opts {
    /// Path to config file
    #[clap(long)]
    config: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sync local favorites with the gallery site once
    SyncFavorites,
    /// Check every favorite manga for new chapters once
    UpdateLibrary,
    /// Run periodic library updates and favorites syncs until interrupted
    Daemon,
    /// Forget the last favorites sync
    ClearSnapshots,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    if let Ok(rust_log) = std::env::var("RUST_LOG") {
        info!("rust_log: {}", rust_log);
    } else if let Ok(tachisync_log) = std::env::var("TACHISYNC_LOG") {
        info!("tachisync_log: {}", tachisync_log);
        // SAFETY: no other thread reads the environment yet
        unsafe {
            std::env::set_var(
                "RUST_LOG",
                format!("tachisync={tachisync_log},tachisync_lib={tachisync_log}"),
            );
        }
    }

    env_logger::init();

    let opts: Opts = Opts::parse();
    let config = GLOBAL_CONFIG.get_or_try_init(|| Config::open(opts.config.as_ref()))?;

    debug!("config: {:?}", config);

    let db = database::establish_connection(&config.database_path, config.create_database).await?;

    let client = GalleryClient::new(&config.gallery)?;
    let source = GallerySource::new(client.source_id(), client.base_url(), client.clone());
    let source_info = source.get_source_info();

    let mut sources = SourceRegistry::new();
    sources.insert(Arc::new(source))?;

    let uow = SqliteUnitOfWork::new(db.clone());
    let helper = FavoritesSyncHelper::new(
        uow,
        client.clone(),
        source_info,
        config.favorites.clone(),
    );

    match opts.command {
        Command::SyncFavorites => {
            if !config.gallery.is_logged_in() {
                anyhow::bail!("gallery.member_id and gallery.pass_hash must be set to sync favorites");
            }

            let mut status = helper.subscribe();
            let progress = tokio::spawn(async move {
                while status.changed().await.is_ok() {
                    if let FavoritesSyncStatus::Processing { message, title } =
                        &*status.borrow_and_update()
                    {
                        match title {
                            Some(title) => info!("{message}: {title}"),
                            None => info!("{message}"),
                        }
                    }
                }
            });

            helper.run_sync().await;
            let final_status = helper.status();
            drop(helper);
            if let Err(e) = progress.await {
                error!("favorites progress logger failed: {e}");
            }

            if !log_sync_status(&final_status) {
                anyhow::bail!("favorites sync failed");
            }
        }
        Command::UpdateLibrary => {
            let (_, command_tx, _) = worker::updates::start(
                0,
                ChapterRepositoryImpl::new(db.clone()),
                MangaRepositoryImpl::new(db.clone()),
                sources,
            );

            let (tx, rx) = tokio::sync::oneshot::channel();
            command_tx.send_async(ChapterUpdateCommand::All(tx)).await?;
            rx.await??;
        }
        Command::Daemon => {
            let (mut updates, command_tx, handle) = worker::updates::start(
                config.update_interval,
                ChapterRepositoryImpl::new(db.clone()),
                MangaRepositoryImpl::new(db.clone()),
                sources,
            );

            let helper = helper.with_worker(command_tx);
            let sync_favorites =
                config.gallery.is_logged_in() && config.favorites.sync_interval > 0;
            if sync_favorites {
                info!(
                    "favorites sync every {} seconds",
                    config.favorites.sync_interval
                );
            } else {
                info!("favorites sync disabled");
            }
            let mut favorites_interval = time::interval(time::Duration::from_secs(
                config.favorites.sync_interval.max(1),
            ));

            loop {
                tokio::select! {
                    Ok(update) = updates.recv() => {
                        info!("new chapter for {}: {}", update.manga.title, update.chapter.name);
                    }
                    _ = favorites_interval.tick(), if sync_favorites => {
                        helper.run_sync().await;
                        log_sync_status(&helper.status());
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("shutting down");
                        handle.abort();
                        break;
                    }
                }
            }
        }
        Command::ClearSnapshots => {
            helper.clear_snapshots().await?;
            info!("favorites snapshot cleared");
        }
    }

    Ok(())
}

/// Returns `false` when the sync did not complete.
fn log_sync_status(status: &FavoritesSyncStatus) -> bool {
    match status {
        FavoritesSyncStatus::CompleteWithErrors(errors) => {
            for error in errors {
                warn!("{error}");
            }
            warn!("favorites synced with {} errors", errors.len());
            true
        }
        FavoritesSyncStatus::Error(message) => {
            error!("favorites sync failed: {message}");
            false
        }
        FavoritesSyncStatus::BadLibraryState(state) => {
            error!("library needs fixing before a sync: {state:?}");
            false
        }
        _ => {
            info!("favorites synced");
            true
        }
    }
}
