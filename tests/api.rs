use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

use skillport::config::Config;
use skillport::db::{
    MemoryStore, NewSubmission, PlatformStats, StatsFilter, StoreError, Submission,
    SubmissionQuery, SubmissionStore, SubmissionUpdate, UserStats,
};
use skillport::routes;
use skillport::state::AppState;

fn app() -> Router {
    let state = AppState::new(Arc::new(MemoryStore::new()), Arc::new(Config::default()));
    routes::router(Arc::new(state))
}

/// A store whose every call fails, as an unreachable database would.
struct FailingStore;

fn broken() -> StoreError {
    StoreError::Corrupt {
        id: Uuid::nil(),
        reason: "disk unavailable".into(),
    }
}

#[async_trait]
impl SubmissionStore for FailingStore {
    fn backend(&self) -> &'static str {
        "failing"
    }

    async fn insert(&self, _new: NewSubmission) -> Result<Submission, StoreError> {
        Err(broken())
    }

    async fn insert_many(&self, _new: Vec<NewSubmission>) -> Result<Vec<Submission>, StoreError> {
        Err(broken())
    }

    async fn get(&self, _id: Uuid) -> Result<Option<Submission>, StoreError> {
        Err(broken())
    }

    async fn update(
        &self,
        _id: Uuid,
        _update: SubmissionUpdate,
    ) -> Result<Option<Submission>, StoreError> {
        Err(broken())
    }

    async fn delete(&self, _id: Uuid) -> Result<bool, StoreError> {
        Err(broken())
    }

    async fn list(&self, _query: &SubmissionQuery) -> Result<(Vec<Submission>, u64), StoreError> {
        Err(broken())
    }

    async fn user_stats(&self, _email: &str) -> Result<UserStats, StoreError> {
        Err(broken())
    }

    async fn platform_stats(&self, _email: &str) -> Result<Vec<PlatformStats>, StoreError> {
        Err(broken())
    }

    async fn global_stats(&self, _filter: &StatsFilter) -> Result<UserStats, StoreError> {
        Err(broken())
    }
}

fn failing_app(app_env: &str) -> Router {
    let config = Config {
        app_env: app_env.into(),
        ..Default::default()
    };
    let state = AppState::new(Arc::new(FailingStore), Arc::new(config));
    routes::router(Arc::new(state))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).method(method);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_health_reports_storage() {
    let (status, body) = send(&app(), "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert_eq!(body["message"], "SkillPort API is running");
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn test_create_applies_defaults() {
    let (status, body) = send(
        &app(),
        "POST",
        "/api/submissions",
        Some(json!({
            "email": "a@b.com",
            "platform": "leetcode",
            "problemTitle": "Two Sum",
            "difficulty": "easy"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Submission saved");
    assert_eq!(body["data"]["attempts"], 1);
    assert_eq!(body["data"]["status"], "solved");
    assert_eq!(body["data"]["slug"], "two-sum");
    assert_eq!(body["data"]["difficulty"], "easy");
    assert!(body["data"]["id"].as_str().is_some());
}

#[tokio::test]
async fn test_missing_email_is_rejected() {
    let (status, body) = send(
        &app(),
        "POST",
        "/api/submissions/extension",
        Some(json!({ "platform": "leetcode", "problemTitle": "Two Sum" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Validation failed");
    assert_eq!(body["details"][0]["field"], "email");
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let app = app();
    let request = Request::builder()
        .uri("/api/submissions")
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_identical_posts_create_distinct_records() {
    let app = app();
    let payload = json!({
        "email": "dup@b.com",
        "platform": "codeforces",
        "problemSlug": "a-theatre-square",
        "verdict": "Accepted"
    });

    let (_, first) = send(&app, "POST", "/api/submissions", Some(payload.clone())).await;
    let (_, second) = send(&app, "POST", "/api/submissions/extension", Some(payload)).await;
    assert_ne!(first["data"]["id"], second["data"]["id"]);

    let (status, body) = send(&app, "GET", "/api/submissions?email=dup@b.com", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalSubmissions"], 2);
}

#[tokio::test]
async fn test_relayed_event_round_trips_through_list() {
    let app = app();
    let event = json!({
        "platform": "leetcode",
        "username": "alice",
        "email": "Alice@Example.com",
        "url": "https://leetcode.com/problems/two-sum/",
        "slug": "two-sum",
        "verdict": "Accepted",
        "attempts": 3,
        "timestamp": "2025-08-09T10:00:00Z",
        "problemTitle": "Two Sum"
    });
    let (status, _) = send(&app, "POST", "/api/submissions/extension", Some(event)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "GET",
        "/api/submissions?email=alice@example.com&platform=leetcode",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let record = &body["data"]["submissions"][0];
    assert_eq!(record["platform"], "leetcode");
    assert_eq!(record["slug"], "two-sum");
    assert_eq!(record["attempts"], 3);
    assert_eq!(record["email"], "alice@example.com");
    assert_eq!(body["data"]["currentPage"], 1);
    assert_eq!(body["data"]["totalPages"], 1);
}

#[tokio::test]
async fn test_list_rejects_bad_filters() {
    let (status, body) = send(&app(), "GET", "/api/submissions?platform=topcoder&limit=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<_> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap().to_string())
        .collect();
    assert!(fields.contains(&"platform".to_string()));
    assert!(fields.contains(&"limit".to_string()));
}

#[tokio::test]
async fn test_get_update_delete_lifecycle() {
    let app = app();
    let (_, created) = send(
        &app,
        "POST",
        "/api/submissions",
        Some(json!({ "email": "a@b.com", "platform": "gfg", "problemTitle": "Reverse a String" })),
    )
    .await;
    let id = created["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["data"]["platform"], "geeksforgeeks");

    let (status, body) = send(&app, "GET", &format!("/api/submissions/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["problemTitle"], "Reverse a String");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/submissions/{}", id),
        Some(json!({ "status": "reattempt", "attempts": 2, "notes": "edge cases" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "reattempt");
    assert_eq!(body["data"]["attempts"], 2);
    assert_eq!(body["data"]["notes"], "edge cases");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/submissions/{}", id),
        Some(json!({ "email": "other@b.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "email");

    let (status, _) = send(&app, "DELETE", &format!("/api/submissions/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", &format!("/api/submissions/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Submission not found");

    let (status, _) = send(&app, "DELETE", &format!("/api/submissions/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/api/submissions/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bulk_is_all_or_nothing() {
    let app = app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/submissions/bulk",
        Some(json!({ "submissions": [
            { "email": "bulk@b.com", "platform": "leetcode", "problemTitle": "Two Sum" },
            { "platform": "leetcode", "problemTitle": "Three Sum" }
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "submissions[1].email");

    let (_, body) = send(&app, "GET", "/api/submissions?email=bulk@b.com", None).await;
    assert_eq!(body["data"]["totalSubmissions"], 0);

    let (status, body) = send(
        &app,
        "POST",
        "/api/submissions/bulk",
        Some(json!({ "submissions": [
            { "email": "bulk@b.com", "platform": "leetcode", "problemTitle": "Two Sum" },
            { "email": "bulk@b.com", "platform": "codeforces", "problemTitle": "Watermelon" }
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, _) = send(&app, "POST", "/api/submissions/bulk", Some(json!({ "submissions": [] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_endpoints() {
    let app = app();
    for payload in [
        json!({ "email": "s@b.com", "platform": "leetcode", "difficulty": "easy", "attempts": 2 }),
        json!({ "email": "s@b.com", "platform": "leetcode", "difficulty": "hard", "status": "doubt" }),
        json!({ "email": "s@b.com", "platform": "codeforces", "status": "reattempt" }),
        json!({ "email": "other@b.com", "platform": "leetcode", "difficulty": "medium" }),
    ] {
        let (status, _) = send(&app, "POST", "/api/submissions", Some(payload)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&app, "GET", "/api/submissions/stats/user?email=S@b.com", None).await;
    assert_eq!(status, StatusCode::OK);
    let stats = &body["data"]["stats"];
    assert_eq!(stats["totalSubmissions"], 3);
    assert_eq!(stats["solved"], 1);
    assert_eq!(stats["doubts"], 1);
    assert_eq!(stats["reattempts"], 1);
    assert_eq!(stats["easy"], 1);
    assert_eq!(stats["hard"], 1);
    assert_eq!(stats["totalAttempts"], 4);
    let platforms = body["data"]["platformStats"].as_array().unwrap();
    assert_eq!(platforms[0]["platform"], "leetcode");
    assert_eq!(platforms[0]["count"], 2);

    let (status, _) = send(&app, "GET", "/api/submissions/stats/user", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "GET", "/api/submissions/stats/all", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stats"]["totalSubmissions"], 4);

    let (_, body) = send(
        &app,
        "GET",
        "/api/submissions/stats/all?email=other@b.com,nobody@b.com",
        None,
    )
    .await;
    assert_eq!(body["data"]["stats"]["totalSubmissions"], 1);
    assert_eq!(body["data"]["stats"]["medium"], 1);

    let (status, body) = send(&app, "GET", "/api/submissions/stats/all?email=,", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stats"]["totalSubmissions"], 4);

    let (_, body) = send(
        &app,
        "GET",
        "/api/submissions/stats/all?startDate=2000-01-01&endDate=2000-01-02",
        None,
    )
    .await;
    assert_eq!(body["data"]["stats"]["totalSubmissions"], 0);
}

#[tokio::test]
async fn test_storage_failure_hides_detail_in_production() {
    let (status, body) = send(
        &failing_app("production"),
        "POST",
        "/api/submissions",
        Some(json!({ "email": "a@b.com", "platform": "leetcode" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Server error while creating submission");
    assert!(body.get("message").is_none(), "leaked detail: {}", body);

    let (status, body) = send(&failing_app("production"), "GET", "/api/submissions", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Server error while fetching submissions");
    assert!(body.get("message").is_none());
}

#[tokio::test]
async fn test_storage_failure_shows_detail_in_development() {
    let (status, body) = send(
        &failing_app("development"),
        "POST",
        "/api/submissions",
        Some(json!({ "email": "a@b.com", "platform": "leetcode" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Server error while creating submission");
    assert!(body["message"].as_str().unwrap().contains("disk unavailable"));
}

