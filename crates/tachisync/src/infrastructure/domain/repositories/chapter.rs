use async_trait::async_trait;
use sqlx::{Row, sqlite::SqliteRow};

use crate::{
    domain::{
        entities::chapter::Chapter,
        repositories::chapter::{ChapterRepository, ChapterRepositoryError},
    },
    infrastructure::database::Database,
};

#[derive(Clone)]
pub struct ChapterRepositoryImpl {
    db: Database,
}

impl ChapterRepositoryImpl {
    pub fn new<D: Into<Database>>(db: D) -> Self {
        Self { db: db.into() }
    }
}

fn chapter_from_row(row: &SqliteRow) -> Chapter {
    Chapter {
        id: row.get("id"),
        manga_id: row.get("manga_id"),
        url: row.get("url"),
        name: row.get("name"),
        scanlator: row.get("scanlator"),
        chapter_number: row.get("chapter_number"),
        source_order: row.get("source_order"),
        date_upload: row.get("date_upload"),
        date_fetch: row.get("date_fetch"),
        read: row.get("read"),
        bookmark: row.get("bookmark"),
        last_page_read: row.get("last_page_read"),
        deleted: row.get("deleted"),
    }
}

#[async_trait]
impl ChapterRepository for ChapterRepositoryImpl {
    async fn get_chapters_by_manga_id(
        &self,
        manga_id: i64,
        include_deleted: bool,
    ) -> Result<Vec<Chapter>, ChapterRepositoryError> {
        let chapters = self
            .db
            .fetch_all(
                sqlx::query(
                    r#"SELECT * FROM chapter
                    WHERE manga_id = ? AND (? OR deleted = 0)
                    ORDER BY source_order ASC, id ASC"#,
                )
                .bind(manga_id)
                .bind(include_deleted),
            )
            .await?
            .iter()
            .map(chapter_from_row)
            .collect();

        Ok(chapters)
    }

    async fn insert_chapters(
        &self,
        chapters: &[Chapter],
    ) -> Result<Vec<Chapter>, ChapterRepositoryError> {
        let mut inserted = Vec::with_capacity(chapters.len());
        for chapter in chapters {
            let id = self
                .db
                .execute(
                    sqlx::query(
                        r#"INSERT INTO chapter(
                            manga_id,
                            url,
                            name,
                            scanlator,
                            chapter_number,
                            source_order,
                            date_upload,
                            date_fetch,
                            read,
                            bookmark,
                            last_page_read,
                            deleted
                        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
                    )
                    .bind(chapter.manga_id)
                    .bind(&chapter.url)
                    .bind(&chapter.name)
                    .bind(&chapter.scanlator)
                    .bind(chapter.chapter_number)
                    .bind(chapter.source_order)
                    .bind(chapter.date_upload)
                    .bind(chapter.date_fetch)
                    .bind(chapter.read)
                    .bind(chapter.bookmark)
                    .bind(chapter.last_page_read)
                    .bind(chapter.deleted),
                )
                .await?
                .last_insert_rowid();

            inserted.push(Chapter {
                id,
                ..chapter.clone()
            });
        }

        Ok(inserted)
    }

    async fn update_chapters(&self, chapters: &[Chapter]) -> Result<(), ChapterRepositoryError> {
        for chapter in chapters {
            self.db
                .execute(
                    sqlx::query(
                        r#"UPDATE chapter SET
                            name = ?,
                            scanlator = ?,
                            chapter_number = ?,
                            source_order = ?,
                            date_upload = ?,
                            deleted = ?
                        WHERE id = ?"#,
                    )
                    .bind(&chapter.name)
                    .bind(&chapter.scanlator)
                    .bind(chapter.chapter_number)
                    .bind(chapter.source_order)
                    .bind(chapter.date_upload)
                    .bind(chapter.deleted)
                    .bind(chapter.id),
                )
                .await?;
        }

        Ok(())
    }

    async fn soft_delete_chapters_with_ids(
        &self,
        ids: &[i64],
    ) -> Result<(), ChapterRepositoryError> {
        if ids.is_empty() {
            return Ok(());
        }

        let query_str = format!(
            "UPDATE chapter SET deleted = 1 WHERE id IN ({})",
            vec!["?"; ids.len()].join(",")
        );

        let mut query = sqlx::query(&query_str);
        for id in ids {
            query = query.bind(id);
        }

        self.db.execute(query).await?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        domain::{entities::manga::Manga, repositories::manga::MangaRepository},
        infrastructure::{database, domain::repositories::manga::MangaRepositoryImpl},
    };

    async fn setup() -> (ChapterRepositoryImpl, i64) {
        let db = database::in_memory().await.unwrap();
        let manga = MangaRepositoryImpl::new(db.clone())
            .insert_manga(&Manga {
                source_id: 1,
                url: "/manga/1".to_string(),
                title: "Manga".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        (ChapterRepositoryImpl::new(db), manga.id)
    }

    fn chapter(manga_id: i64, url: &str, source_order: i64) -> Chapter {
        Chapter {
            manga_id,
            url: url.to_string(),
            name: format!("Chapter {source_order}"),
            source_order,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_ids() {
        let (repo, manga_id) = setup().await;

        let inserted = repo
            .insert_chapters(&[chapter(manga_id, "/c/1", 1), chapter(manga_id, "/c/0", 0)])
            .await
            .unwrap();
        assert!(inserted.iter().all(|c| c.id > 0));

        let stored = repo.get_chapters_by_manga_id(manga_id, false).await.unwrap();
        assert_eq!(
            stored.iter().map(|c| c.url.as_str()).collect::<Vec<_>>(),
            vec!["/c/0", "/c/1"]
        );
        assert_eq!(stored[0].chapter_number, -1.0);
    }

    #[tokio::test]
    async fn test_soft_delete_hides_chapters() {
        let (repo, manga_id) = setup().await;
        let inserted = repo
            .insert_chapters(&[chapter(manga_id, "/c/0", 0), chapter(manga_id, "/c/1", 1)])
            .await
            .unwrap();

        repo.soft_delete_chapters_with_ids(&[inserted[0].id])
            .await
            .unwrap();

        let visible = repo.get_chapters_by_manga_id(manga_id, false).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].url, "/c/1");

        let all = repo.get_chapters_by_manga_id(manga_id, true).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].deleted);
    }

    #[tokio::test]
    async fn test_update_keeps_read_state() {
        let (repo, manga_id) = setup().await;
        let mut read = chapter(manga_id, "/c/0", 0);
        read.read = true;
        read.last_page_read = 12;
        let mut inserted = repo.insert_chapters(&[read]).await.unwrap();

        let mut update = inserted.remove(0);
        update.name = "Renamed".to_string();
        update.chapter_number = 3.0;
        update.read = false;
        update.last_page_read = 0;
        repo.update_chapters(&[update]).await.unwrap();

        let stored = repo.get_chapters_by_manga_id(manga_id, false).await.unwrap();
        assert_eq!(stored[0].name, "Renamed");
        assert_eq!(stored[0].chapter_number, 3.0);
        assert!(stored[0].read);
        assert_eq!(stored[0].last_page_read, 12);
    }

    #[tokio::test]
    async fn test_duplicate_url_is_rejected() {
        let (repo, manga_id) = setup().await;
        repo.insert_chapters(&[chapter(manga_id, "/c/0", 0)])
            .await
            .unwrap();

        let result = repo.insert_chapters(&[chapter(manga_id, "/c/0", 1)]).await;

        assert!(result.is_err());
    }
}
