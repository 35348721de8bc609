mod memory;
mod models;
mod postgres;

pub use memory::MemoryStore;
pub use models::*;
pub use postgres::PgStore;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub type DbPool = Arc<PgPool>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: Uuid, reason: String },
}

/// Persistence for submission records.
///
/// Inserts never merge: storing the same content twice yields two records.
/// Aggregates are computed on read.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Short name reported by the health check.
    fn backend(&self) -> &'static str;

    async fn insert(&self, new: NewSubmission) -> Result<Submission, StoreError>;

    /// Inserts all records or none.
    async fn insert_many(&self, new: Vec<NewSubmission>) -> Result<Vec<Submission>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Submission>, StoreError>;

    async fn update(
        &self,
        id: Uuid,
        update: SubmissionUpdate,
    ) -> Result<Option<Submission>, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Returns the requested page plus the total number of matching records.
    async fn list(&self, query: &SubmissionQuery) -> Result<(Vec<Submission>, u64), StoreError>;

    async fn user_stats(&self, email: &str) -> Result<UserStats, StoreError>;

    async fn platform_stats(&self, email: &str) -> Result<Vec<PlatformStats>, StoreError>;

    async fn global_stats(&self, filter: &StatsFilter) -> Result<UserStats, StoreError>;
}

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(database_url)
        .await?;

    Ok(Arc::new(pool))
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
