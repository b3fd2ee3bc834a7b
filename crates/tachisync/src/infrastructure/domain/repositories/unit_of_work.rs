use async_trait::async_trait;

use crate::{
    domain::repositories::unit_of_work::{TransactionError, UnitOfWork},
    infrastructure::database::Database,
};

use super::{
    category::CategoryRepositoryImpl, chapter::ChapterRepositoryImpl,
    favorite::FavoriteEntryRepositoryImpl, manga::MangaRepositoryImpl,
};

#[derive(Clone)]
pub struct SqliteUnitOfWork {
    db: Database,
}

impl SqliteUnitOfWork {
    pub fn new<D: Into<Database>>(db: D) -> Self {
        Self { db: db.into() }
    }
}

#[async_trait]
impl UnitOfWork for SqliteUnitOfWork {
    type Chapters = ChapterRepositoryImpl;
    type Manga = MangaRepositoryImpl;
    type Categories = CategoryRepositoryImpl;
    type Favorites = FavoriteEntryRepositoryImpl;

    fn chapters(&self) -> Self::Chapters {
        ChapterRepositoryImpl::new(self.db.clone())
    }

    fn manga(&self) -> Self::Manga {
        MangaRepositoryImpl::new(self.db.clone())
    }

    fn categories(&self) -> Self::Categories {
        CategoryRepositoryImpl::new(self.db.clone())
    }

    fn favorites(&self) -> Self::Favorites {
        FavoriteEntryRepositoryImpl::new(self.db.clone())
    }

    async fn begin(&self) -> Result<Self, TransactionError> {
        Ok(Self {
            db: self.db.begin().await?,
        })
    }

    async fn commit(self) -> Result<(), TransactionError> {
        Ok(self.db.commit().await?)
    }

    async fn rollback(self) -> Result<(), TransactionError> {
        Ok(self.db.rollback().await?)
    }
}
