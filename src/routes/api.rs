use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{Submission, SubmissionPage, SubmissionQuery};
use crate::error::AppError;
use crate::ingest::{self, FieldError};
use crate::response::ApiResponse;
use crate::state::AppState;

pub const MAX_PAGE_SIZE: u32 = 100;

type Created<T> = (StatusCode, Json<ApiResponse<T>>);

fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::field("body", rejection.body_text()))
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest("Invalid submission id".to_string()))
}

pub async fn create_submission(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Created<Submission>, AppError> {
    let body = json_body(payload)?;
    let new = ingest::validate_submission(&body).map_err(AppError::Validation)?;

    let submission = state
        .store
        .insert(new)
        .await
        .map_err(state.storage_error("Server error while creating submission"))?;

    tracing::info!(
        id = %submission.id,
        email = %submission.email,
        platform = %submission.platform,
        slug = submission.slug.as_deref().unwrap_or(""),
        "Received submission"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(submission, "Submission saved")),
    ))
}

pub async fn bulk_create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Created<Vec<Submission>>, AppError> {
    let body = json_body(payload)?;
    let new = ingest::validate_bulk(&body).map_err(AppError::Validation)?;

    let created = state
        .store
        .insert_many(new)
        .await
        .map_err(state.storage_error("Server error while creating submissions"))?;

    let message = format!("{} submissions created successfully", created.len());
    tracing::info!("{}", message);

    Ok((StatusCode::CREATED, Json(ApiResponse::success(created, message))))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub email: Option<String>,
    pub platform: Option<String>,
    pub difficulty: Option<String>,
    pub status: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ListParams {
    pub fn into_query(self) -> Result<SubmissionQuery, Vec<FieldError>> {
        let mut errors = Vec::new();
        let mut query = SubmissionQuery {
            email: non_empty(self.email).map(|e| e.to_lowercase()),
            ..Default::default()
        };

        fn parse_into<T: std::str::FromStr<Err = String>>(
            raw: Option<String>,
            field: &str,
            errors: &mut Vec<FieldError>,
        ) -> Option<T> {
            let raw = non_empty(raw)?;
            raw.parse()
                .map_err(|message| errors.push(FieldError::new(field, message)))
                .ok()
        }

        query.platform = parse_into(self.platform, "platform", &mut errors);
        query.difficulty = parse_into(self.difficulty, "difficulty", &mut errors);
        query.status = parse_into(self.status, "status", &mut errors);
        if let Some(sort_by) = parse_into(self.sort_by, "sortBy", &mut errors) {
            query.sort_by = sort_by;
        }
        if let Some(sort_order) = parse_into(self.sort_order, "sortOrder", &mut errors) {
            query.sort_order = sort_order;
        }

        if let Some(raw) = non_empty(self.page) {
            match raw.parse::<u32>() {
                Ok(page) if page >= 1 => query.page = page,
                _ => errors.push(FieldError::new("page", "Page must be a positive integer")),
            }
        }
        if let Some(raw) = non_empty(self.limit) {
            match raw.parse::<u32>() {
                Ok(limit) if (1..=MAX_PAGE_SIZE).contains(&limit) => query.limit = limit,
                _ => errors.push(FieldError::new(
                    "limit",
                    format!("Limit must be between 1 and {}", MAX_PAGE_SIZE),
                )),
            }
        }

        if errors.is_empty() {
            Ok(query)
        } else {
            Err(errors)
        }
    }
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub async fn list_submissions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<SubmissionPage>>, AppError> {
    let query = params.into_query().map_err(AppError::Validation)?;

    let (submissions, total) = state
        .store
        .list(&query)
        .await
        .map_err(state.storage_error("Server error while fetching submissions"))?;

    Ok(Json(ApiResponse::success(
        SubmissionPage::new(submissions, total, &query),
        "Submissions retrieved successfully",
    )))
}

pub async fn get_submission(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<String>,
) -> Result<Json<ApiResponse<Submission>>, AppError> {
    let id = parse_id(&submission_id)?;
    let submission = state
        .store
        .get(id)
        .await
        .map_err(state.storage_error("Server error while fetching submission"))?
        .ok_or_else(|| AppError::NotFound("Submission not found".to_string()))?;

    Ok(Json(ApiResponse::success(
        submission,
        "Submission retrieved successfully",
    )))
}

pub async fn update_submission(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApiResponse<Submission>>, AppError> {
    let id = parse_id(&submission_id)?;
    let body = json_body(payload)?;
    let update = ingest::validate_update(&body).map_err(AppError::Validation)?;

    let submission = state
        .store
        .update(id, update)
        .await
        .map_err(state.storage_error("Server error while updating submission"))?
        .ok_or_else(|| AppError::NotFound("Submission not found".to_string()))?;

    Ok(Json(ApiResponse::success(
        submission,
        "Submission updated successfully",
    )))
}

pub async fn delete_submission(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<String>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let id = parse_id(&submission_id)?;
    let deleted = state
        .store
        .delete(id)
        .await
        .map_err(state.storage_error("Server error while deleting submission"))?;

    if !deleted {
        return Err(AppError::NotFound("Submission not found".to_string()));
    }

    Ok(Json(ApiResponse::success(
        serde_json::json!({ "id": id }),
        "Submission deleted successfully",
    )))
}
