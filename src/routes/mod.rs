mod api;
mod stats;

pub use api::{
    bulk_create, create_submission, delete_submission, get_submission, list_submissions,
    update_submission,
};
pub use stats::{all_stats, user_stats};

use axum::{extract::State, routing::get, routing::post, Json, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the full HTTP surface. Extension traffic may use either
/// `/api/submissions` or `/api/submissions/extension`; both ingest identically.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/submissions", post(create_submission).get(list_submissions))
        .route("/api/submissions/extension", post(create_submission))
        .route("/api/submissions/bulk", post(bulk_create))
        .route("/api/submissions/stats/user", get(user_stats))
        .route("/api/submissions/stats/all", get(all_stats))
        .route(
            "/api/submissions/:submission_id",
            get(get_submission)
                .put(update_submission)
                .delete(delete_submission),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "OK",
        "message": "SkillPort API is running",
        "storage": state.store.backend()
    }))
}
