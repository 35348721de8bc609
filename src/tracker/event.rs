use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::Platform;

/// Username used when the page does not reveal one.
pub const ANONYMOUS: &str = "anonymous";

const SUCCESS_VERDICTS: &[&str] = &["accepted", "problem solved successfully", "correct", "ok"];

/// Whether a judge verdict means the problem was solved.
///
/// Comparison ignores case and whitespace runs. Besides the exact phrases,
/// "Accepted" followed by a non-letter (e.g. "Accepted Runtime: 0 ms") counts.
pub fn is_success_verdict(verdict: &str) -> bool {
    let normalized = verdict
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    if SUCCESS_VERDICTS.contains(&normalized.as_str()) {
        return true;
    }
    match normalized.strip_prefix("accepted") {
        Some(rest) => rest.chars().next().is_some_and(|c| !c.is_alphabetic()),
        None => false,
    }
}

/// A solved problem as detected on a coding site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionEvent {
    pub platform: Platform,
    pub username: String,
    pub email: String,
    pub url: String,
    pub slug: String,
    pub verdict: String,
    pub attempts: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contest_id: Option<String>,
    /// Judge-assigned id of the submission, when the page shows one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<String>,
}

impl SubmissionEvent {
    /// Key used for duplicate suppression: the slug, or the URL when no slug
    /// could be derived.
    pub fn dedup_key(&self) -> &str {
        if self.slug.is_empty() {
            &self.url
        } else {
            &self.slug
        }
    }
}
