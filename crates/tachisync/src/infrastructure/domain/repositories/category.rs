use async_trait::async_trait;
use sqlx::{Row, sqlite::SqliteRow};

use crate::{
    domain::{
        entities::category::Category,
        repositories::category::{CategoryRepository, CategoryRepositoryError},
    },
    infrastructure::database::Database,
};

#[derive(Clone)]
pub struct CategoryRepositoryImpl {
    db: Database,
}

impl CategoryRepositoryImpl {
    pub fn new<D: Into<Database>>(db: D) -> Self {
        Self { db: db.into() }
    }
}

fn category_from_row(row: &SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        sort_order: row.get("sort_order"),
    }
}

#[async_trait]
impl CategoryRepository for CategoryRepositoryImpl {
    async fn get_categories(&self) -> Result<Vec<Category>, CategoryRepositoryError> {
        let categories = self
            .db
            .fetch_all(
                sqlx::query(
                    "SELECT id, name, sort_order FROM category WHERE id != ? ORDER BY sort_order ASC, id ASC",
                )
                .bind(Category::SYSTEM_ID),
            )
            .await?
            .iter()
            .map(category_from_row)
            .collect();

        Ok(categories)
    }

    async fn get_categories_by_manga_id(
        &self,
        manga_id: i64,
    ) -> Result<Vec<Category>, CategoryRepositoryError> {
        let categories = self
            .db
            .fetch_all(
                sqlx::query(
                    r#"SELECT category.id, category.name, category.sort_order FROM category
                    JOIN manga_category ON manga_category.category_id = category.id
                    WHERE manga_category.manga_id = ?
                    ORDER BY category.sort_order ASC, category.id ASC"#,
                )
                .bind(manga_id),
            )
            .await?
            .iter()
            .map(category_from_row)
            .collect();

        Ok(categories)
    }

    async fn create_category(
        &self,
        name: &str,
        sort_order: i64,
    ) -> Result<Category, CategoryRepositoryError> {
        let row = self
            .db
            .fetch_one(
                sqlx::query(
                    "INSERT INTO category (name, sort_order) VALUES (?, ?) RETURNING id, name, sort_order",
                )
                .bind(name)
                .bind(sort_order),
            )
            .await?;

        Ok(category_from_row(&row))
    }

    async fn update_category(&self, category: &Category) -> Result<(), CategoryRepositoryError> {
        self.db
            .execute(
                sqlx::query("UPDATE category SET name = ?, sort_order = ? WHERE id = ?")
                    .bind(&category.name)
                    .bind(category.sort_order)
                    .bind(category.id),
            )
            .await?;

        Ok(())
    }

    async fn set_manga_categories(
        &self,
        manga_ids: &[i64],
        category_ids: &[i64],
    ) -> Result<(), CategoryRepositoryError> {
        if manga_ids.is_empty() {
            return Ok(());
        }

        let query_str = format!(
            "DELETE FROM manga_category WHERE manga_id IN ({})",
            vec!["?"; manga_ids.len()].join(",")
        );
        let mut query = sqlx::query(&query_str);
        for manga_id in manga_ids {
            query = query.bind(manga_id);
        }
        self.db.execute(query).await?;

        if category_ids.is_empty() {
            return Ok(());
        }

        let pairs = manga_ids.len() * category_ids.len();
        let query_str = format!(
            "INSERT INTO manga_category (manga_id, category_id) VALUES {}",
            vec!["(?, ?)"; pairs].join(",")
        );
        let mut query = sqlx::query(&query_str);
        for manga_id in manga_ids {
            for category_id in category_ids {
                query = query.bind(manga_id).bind(category_id);
            }
        }
        self.db.execute(query).await?;

        Ok(())
    }
}
