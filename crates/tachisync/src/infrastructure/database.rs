use std::{str::FromStr, sync::Arc};

use sqlx::{
    Sqlite, Transaction,
    migrate::MigrateError,
    query::Query,
    sqlite::{
        SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
        SqliteQueryResult, SqliteRow,
    },
};
use tokio::sync::Mutex;

pub type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Either the shared pool or a single open transaction.
///
/// Repositories hold a `Database` and run every statement through it, so the
/// same repository type works inside and outside a unit of work.
#[derive(Clone)]
pub enum Database {
    Pool(SqlitePool),
    Transaction(Arc<Mutex<Option<Transaction<'static, Sqlite>>>>),
}

impl From<SqlitePool> for Database {
    fn from(pool: SqlitePool) -> Self {
        Self::Pool(pool)
    }
}

fn finished() -> sqlx::Error {
    sqlx::Error::Protocol("transaction already finished".to_string())
}

impl Database {
    pub async fn execute(&self, query: SqliteQuery<'_>) -> Result<SqliteQueryResult, sqlx::Error> {
        match self {
            Self::Pool(pool) => query.execute(pool).await,
            Self::Transaction(tx) => {
                let mut guard = tx.lock().await;
                let tx = guard.as_mut().ok_or_else(finished)?;
                query.execute(&mut **tx).await
            }
        }
    }

    pub async fn fetch_all(&self, query: SqliteQuery<'_>) -> Result<Vec<SqliteRow>, sqlx::Error> {
        match self {
            Self::Pool(pool) => query.fetch_all(pool).await,
            Self::Transaction(tx) => {
                let mut guard = tx.lock().await;
                let tx = guard.as_mut().ok_or_else(finished)?;
                query.fetch_all(&mut **tx).await
            }
        }
    }

    pub async fn fetch_optional(
        &self,
        query: SqliteQuery<'_>,
    ) -> Result<Option<SqliteRow>, sqlx::Error> {
        match self {
            Self::Pool(pool) => query.fetch_optional(pool).await,
            Self::Transaction(tx) => {
                let mut guard = tx.lock().await;
                let tx = guard.as_mut().ok_or_else(finished)?;
                query.fetch_optional(&mut **tx).await
            }
        }
    }

    pub async fn fetch_one(&self, query: SqliteQuery<'_>) -> Result<SqliteRow, sqlx::Error> {
        self.fetch_optional(query)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Nested transactions are not supported.
    pub async fn begin(&self) -> Result<Self, sqlx::Error> {
        match self {
            Self::Pool(pool) => {
                let tx = pool.begin().await?;
                Ok(Self::Transaction(Arc::new(Mutex::new(Some(tx)))))
            }
            Self::Transaction(_) => Err(sqlx::Error::Protocol(
                "transaction already started".to_string(),
            )),
        }
    }

    pub async fn commit(self) -> Result<(), sqlx::Error> {
        match self {
            Self::Pool(_) => Ok(()),
            Self::Transaction(tx) => {
                let tx = tx.lock().await.take().ok_or_else(finished)?;
                tx.commit().await
            }
        }
    }

    pub async fn rollback(self) -> Result<(), sqlx::Error> {
        match self {
            Self::Pool(_) => Ok(()),
            Self::Transaction(tx) => {
                let tx = tx.lock().await.take().ok_or_else(finished)?;
                tx.rollback().await
            }
        }
    }
}

async fn migrate(pool: &SqlitePool) -> Result<(), anyhow::Error> {
    match sqlx::migrate!("./migrations").run(pool).await {
        Err(MigrateError::VersionMismatch(version)) => {
            warn!("migration {version} was previously applied but has been modified")
        }
        Err(e) => {
            return Err(e.into());
        }
        _ => {}
    }

    Ok(())
}

pub async fn establish_connection(
    database_path: &str,
    create: bool,
) -> Result<Database, anyhow::Error> {
    let opts = SqliteConnectOptions::new()
        .create_if_missing(create)
        .filename(database_path)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .idle_timeout(std::time::Duration::from_secs(60))
        .max_lifetime(std::time::Duration::from_secs(3 * 60))
        .connect_with(opts)
        .await?;

    migrate(&pool).await?;

    Ok(Database::Pool(pool))
}

/// A migrated database that lives as long as its single connection.
pub async fn in_memory() -> Result<Database, anyhow::Error> {
    let opts = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(opts)
        .await?;

    migrate(&pool).await?;

    Ok(Database::Pool(pool))
}

#[cfg(test)]
mod test {
    use super::*;

    async fn count(db: &Database) -> i64 {
        use sqlx::Row;

        db.fetch_one(sqlx::query("SELECT COUNT(*) FROM category"))
            .await
            .unwrap()
            .get(0)
    }

    #[tokio::test]
    async fn test_commit_is_visible() {
        let db = in_memory().await.unwrap();

        let tx = db.begin().await.unwrap();
        tx.execute(sqlx::query("INSERT INTO category (name) VALUES ('a')"))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_rollback_discards() {
        let db = in_memory().await.unwrap();

        let tx = db.begin().await.unwrap();
        tx.execute(sqlx::query("INSERT INTO category (name) VALUES ('a')"))
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_nested_begin_fails() {
        let db = in_memory().await.unwrap();

        let tx = db.begin().await.unwrap();
        assert!(tx.begin().await.is_err());
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_finished_transaction_rejects_queries() {
        let db = in_memory().await.unwrap();

        let tx = db.begin().await.unwrap();
        let handle = tx.clone();
        tx.commit().await.unwrap();

        let result = handle
            .execute(sqlx::query("INSERT INTO category (name) VALUES ('a')"))
            .await;
        assert!(matches!(result, Err(sqlx::Error::Protocol(_))));
    }
}
