use async_trait::async_trait;
use sqlx::Row;

use crate::{
    domain::{
        entities::favorite::FavoriteEntry,
        repositories::favorite::{FavoriteEntryRepository, FavoriteEntryRepositoryError},
    },
    infrastructure::database::Database,
};

#[derive(Clone)]
pub struct FavoriteEntryRepositoryImpl {
    db: Database,
}

impl FavoriteEntryRepositoryImpl {
    pub fn new<D: Into<Database>>(db: D) -> Self {
        Self { db: db.into() }
    }
}

#[async_trait]
impl FavoriteEntryRepository for FavoriteEntryRepositoryImpl {
    async fn get_entries(&self) -> Result<Vec<FavoriteEntry>, FavoriteEntryRepositoryError> {
        let entries = self
            .db
            .fetch_all(sqlx::query(
                "SELECT gid, token, category, title FROM favorite_entry ORDER BY category, gid",
            ))
            .await?
            .iter()
            .map(|row| FavoriteEntry {
                gid: row.get(0),
                token: row.get(1),
                category: row.get(2),
                title: row.get(3),
            })
            .collect();

        Ok(entries)
    }

    async fn replace_entries(
        &self,
        entries: &[FavoriteEntry],
    ) -> Result<(), FavoriteEntryRepositoryError> {
        self.db
            .execute(sqlx::query("DELETE FROM favorite_entry"))
            .await?;

        for entry in entries {
            self.db
                .execute(
                    sqlx::query(
                        "INSERT OR IGNORE INTO favorite_entry (gid, token, category, title) VALUES (?, ?, ?, ?)",
                    )
                    .bind(&entry.gid)
                    .bind(&entry.token)
                    .bind(entry.category)
                    .bind(&entry.title),
                )
                .await?;
        }

        Ok(())
    }

    async fn clear_entries(&self) -> Result<(), FavoriteEntryRepositoryError> {
        self.db
            .execute(sqlx::query("DELETE FROM favorite_entry"))
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::infrastructure::database;

    fn entry(gid: &str, category: i32) -> FavoriteEntry {
        FavoriteEntry {
            gid: gid.to_string(),
            token: "t".to_string(),
            category,
            title: format!("Gallery {gid}"),
        }
    }

    #[tokio::test]
    async fn test_replace_entries() {
        let repo = FavoriteEntryRepositoryImpl::new(database::in_memory().await.unwrap());

        repo.replace_entries(&[entry("1", 0), entry("2", 3)])
            .await
            .unwrap();
        repo.replace_entries(&[entry("2", 3), entry("3", 1)])
            .await
            .unwrap();

        let entries = repo.get_entries().await.unwrap();
        assert_eq!(entries, vec![entry("3", 1), entry("2", 3)]);
        assert_eq!(entries[1].title, "Gallery 2");
    }

    #[tokio::test]
    async fn test_clear_entries() {
        let repo = FavoriteEntryRepositoryImpl::new(database::in_memory().await.unwrap());
        repo.replace_entries(&[entry("1", 0)]).await.unwrap();

        repo.clear_entries().await.unwrap();

        assert!(repo.get_entries().await.unwrap().is_empty());
    }
}
