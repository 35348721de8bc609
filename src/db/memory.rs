use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    NewSubmission, PlatformStats, StatsFilter, StoreError, Submission, SubmissionQuery,
    SubmissionStore, SubmissionUpdate, UserStats,
};

/// Process-local store. Used by tests and when Postgres is unreachable at startup;
/// records do not survive a restart.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<Submission>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, new: NewSubmission) -> Result<Submission, StoreError> {
        let record = Submission::from_new(new, Uuid::new_v4(), Utc::now());
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn insert_many(&self, new: Vec<NewSubmission>) -> Result<Vec<Submission>, StoreError> {
        let now = Utc::now();
        let created: Vec<Submission> = new
            .into_iter()
            .map(|n| Submission::from_new(n, Uuid::new_v4(), now))
            .collect();
        self.records.write().await.extend(created.iter().cloned());
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Submission>, StoreError> {
        Ok(self.records.read().await.iter().find(|s| s.id == id).cloned())
    }

    async fn update(
        &self,
        id: Uuid,
        update: SubmissionUpdate,
    ) -> Result<Option<Submission>, StoreError> {
        let mut records = self.records.write().await;
        Ok(records.iter_mut().find(|s| s.id == id).map(|record| {
            record.apply(update, Utc::now());
            record.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|s| s.id != id);
        Ok(records.len() != before)
    }

    async fn list(&self, query: &SubmissionQuery) -> Result<(Vec<Submission>, u64), StoreError> {
        let records = self.records.read().await;
        let mut matching: Vec<&Submission> = records.iter().filter(|s| query.matches(s)).collect();
        let total = matching.len() as u64;

        matching.sort_by(|a, b| query.compare(a, b));
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let page = matching
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .cloned()
            .collect();

        Ok((page, total))
    }

    async fn user_stats(&self, email: &str) -> Result<UserStats, StoreError> {
        let records = self.records.read().await;
        Ok(UserStats::from_records(records.iter().filter(|s| s.email == email)))
    }

    async fn platform_stats(&self, email: &str) -> Result<Vec<PlatformStats>, StoreError> {
        let records = self.records.read().await;
        Ok(PlatformStats::from_records(records.iter().filter(|s| s.email == email)))
    }

    async fn global_stats(&self, filter: &StatsFilter) -> Result<UserStats, StoreError> {
        let records = self.records.read().await;
        Ok(UserStats::from_records(records.iter().filter(|s| filter.matches(s))))
    }
}
