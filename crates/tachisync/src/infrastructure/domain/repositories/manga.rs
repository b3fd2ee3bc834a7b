use async_trait::async_trait;
use sqlx::{Row, sqlite::SqliteRow};

use crate::{
    domain::{
        entities::manga::Manga,
        repositories::manga::{MangaRepository, MangaRepositoryError},
    },
    infrastructure::database::Database,
};

#[derive(Clone)]
pub struct MangaRepositoryImpl {
    db: Database,
}

impl MangaRepositoryImpl {
    pub fn new<D: Into<Database>>(db: D) -> Self {
        Self { db: db.into() }
    }
}

fn manga_from_row(row: &SqliteRow) -> Manga {
    Manga {
        id: row.get("id"),
        source_id: row.get("source_id"),
        url: row.get("url"),
        title: row.get("title"),
        favorite: row.get("favorite"),
        last_update: row.get("last_update"),
        next_update: row.get("next_update"),
        fetch_interval: row.get("fetch_interval"),
        date_added: row.get("date_added"),
    }
}

#[async_trait]
impl MangaRepository for MangaRepositoryImpl {
    async fn get_manga_by_id(&self, id: i64) -> Result<Manga, MangaRepositoryError> {
        let row = self
            .db
            .fetch_one(sqlx::query("SELECT * FROM manga WHERE id = ?").bind(id))
            .await?;

        Ok(manga_from_row(&row))
    }

    async fn get_manga_by_url(
        &self,
        source_id: i64,
        url: &str,
    ) -> Result<Option<Manga>, MangaRepositoryError> {
        let row = self
            .db
            .fetch_optional(
                sqlx::query("SELECT * FROM manga WHERE source_id = ? AND url = ?")
                    .bind(source_id)
                    .bind(url),
            )
            .await?;

        Ok(row.as_ref().map(manga_from_row))
    }

    async fn get_favorite_manga(&self) -> Result<Vec<Manga>, MangaRepositoryError> {
        let manga = self
            .db
            .fetch_all(sqlx::query(
                "SELECT * FROM manga WHERE favorite = 1 ORDER BY title ASC, id ASC",
            ))
            .await?
            .iter()
            .map(manga_from_row)
            .collect();

        Ok(manga)
    }

    async fn insert_manga(&self, manga: &Manga) -> Result<Manga, MangaRepositoryError> {
        let id = self
            .db
            .execute(
                sqlx::query(
                    r#"INSERT INTO manga(
                        source_id,
                        url,
                        title,
                        favorite,
                        last_update,
                        next_update,
                        fetch_interval,
                        date_added
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
                )
                .bind(manga.source_id)
                .bind(&manga.url)
                .bind(&manga.title)
                .bind(manga.favorite)
                .bind(manga.last_update)
                .bind(manga.next_update)
                .bind(manga.fetch_interval)
                .bind(manga.date_added),
            )
            .await?
            .last_insert_rowid();

        Ok(Manga {
            id,
            ..manga.clone()
        })
    }

    async fn update_favorite(&self, id: i64, favorite: bool) -> Result<(), MangaRepositoryError> {
        self.db
            .execute(
                sqlx::query("UPDATE manga SET favorite = ? WHERE id = ?")
                    .bind(favorite)
                    .bind(id),
            )
            .await?;

        Ok(())
    }

    async fn update_fetch_interval(
        &self,
        id: i64,
        next_update: i64,
        fetch_interval: i32,
    ) -> Result<(), MangaRepositoryError> {
        self.db
            .execute(
                sqlx::query("UPDATE manga SET next_update = ?, fetch_interval = ? WHERE id = ?")
                    .bind(next_update)
                    .bind(fetch_interval)
                    .bind(id),
            )
            .await?;

        Ok(())
    }

    async fn update_last_update(
        &self,
        id: i64,
        last_update: i64,
    ) -> Result<(), MangaRepositoryError> {
        self.db
            .execute(
                sqlx::query("UPDATE manga SET last_update = ? WHERE id = ?")
                    .bind(last_update)
                    .bind(id),
            )
            .await?;

        Ok(())
    }
}
