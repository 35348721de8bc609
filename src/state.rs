use crate::config::Config;
use crate::db::{StoreError, SubmissionStore};
use crate::error::AppError;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SubmissionStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn SubmissionStore>, config: Arc<Config>) -> Self {
        Self { store, config }
    }

    /// Maps a storage failure to a 500, logging the cause. The cause is echoed to
    /// the client only in development mode.
    pub fn storage_error(&self, context: &'static str) -> impl Fn(StoreError) -> AppError + '_ {
        move |err| {
            tracing::error!("{}: {}", context, err);
            AppError::Storage {
                context,
                detail: self.config.is_development().then(|| err.to_string()),
            }
        }
    }
}
