use async_trait::async_trait;

use thiserror::Error;

use crate::domain::entities::category::Category;

#[derive(Debug, Error)]
pub enum CategoryRepositoryError {
    #[error("database error: {0}")]
    DbError(#[from] sqlx::Error),
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// User categories ordered by `sort_order`; the system category is never included.
    async fn get_categories(&self) -> Result<Vec<Category>, CategoryRepositoryError>;

    async fn get_categories_by_manga_id(
        &self,
        manga_id: i64,
    ) -> Result<Vec<Category>, CategoryRepositoryError>;

    async fn create_category(
        &self,
        name: &str,
        sort_order: i64,
    ) -> Result<Category, CategoryRepositoryError>;

    async fn update_category(&self, category: &Category) -> Result<(), CategoryRepositoryError>;

    /// Replaces the categories of every manga in `manga_ids` with `category_ids`.
    async fn set_manga_categories(
        &self,
        manga_ids: &[i64],
        category_ids: &[i64],
    ) -> Result<(), CategoryRepositoryError>;
}
