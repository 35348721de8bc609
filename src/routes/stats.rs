use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::api::non_empty;
use crate::db::{PlatformStats, StatsFilter, UserStats};
use crate::error::AppError;
use crate::ingest::FieldError;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UserStatsParams {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatsResponse {
    pub stats: UserStats,
    pub platform_stats: Vec<PlatformStats>,
}

pub async fn user_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserStatsParams>,
) -> Result<Json<ApiResponse<UserStatsResponse>>, AppError> {
    let email = non_empty(params.email)
        .map(|e| e.to_lowercase())
        .ok_or_else(|| AppError::field("email", "Email is required"))?;

    let on_error = state.storage_error("Server error while fetching user statistics");
    let stats = state.store.user_stats(&email).await.map_err(&on_error)?;
    let platform_stats = state.store.platform_stats(&email).await.map_err(&on_error)?;

    Ok(Json(ApiResponse::success(
        UserStatsResponse {
            stats,
            platform_stats,
        },
        "User statistics retrieved successfully",
    )))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllStatsParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Comma-separated practitioner emails.
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AllStatsResponse {
    pub stats: UserStats,
}

#[derive(Clone, Copy)]
enum Bound {
    Start,
    End,
}

/// Accepts RFC 3339 instants or plain dates. A plain end date covers the whole day.
fn parse_bound(raw: &str, bound: Bound) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let time = match bound {
        Bound::Start => NaiveTime::MIN,
        Bound::End => NaiveTime::from_hms_milli_opt(23, 59, 59, 999)?,
    };
    Some(date.and_time(time).and_utc())
}

impl AllStatsParams {
    pub fn into_filter(self) -> Result<StatsFilter, Vec<FieldError>> {
        let mut errors = Vec::new();
        let mut bound = |raw: Option<String>, field: &str, which: Bound| {
            let raw = non_empty(raw)?;
            let parsed = parse_bound(&raw, which);
            if parsed.is_none() {
                errors.push(FieldError::new(
                    field,
                    format!("{} must be a date (YYYY-MM-DD) or ISO-8601 timestamp", field),
                ));
            }
            parsed
        };

        let start = bound(self.start_date, "startDate", Bound::Start);
        let end = bound(self.end_date, "endDate", Bound::End);

        // A list of only separators filters nothing.
        let emails = non_empty(self.email)
            .map(|list| {
                list.split(',')
                    .map(|e| e.trim().to_lowercase())
                    .filter(|e| !e.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|emails| !emails.is_empty());

        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                errors.push(FieldError::new("endDate", "endDate must not precede startDate"));
            }
        }

        if errors.is_empty() {
            Ok(StatsFilter { emails, start, end })
        } else {
            Err(errors)
        }
    }
}

pub async fn all_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AllStatsParams>,
) -> Result<Json<ApiResponse<AllStatsResponse>>, AppError> {
    let filter = params.into_filter().map_err(AppError::Validation)?;

    let stats = state
        .store
        .global_stats(&filter)
        .await
        .map_err(state.storage_error("Server error while fetching statistics"))?;

    Ok(Json(ApiResponse::success(
        AllStatsResponse { stats },
        "Statistics retrieved successfully",
    )))
}
