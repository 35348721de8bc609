//! Validation and normalization of incoming submission payloads.
//!
//! Payloads come from several generations of clients, so field names vary:
//! `slug`/`problemSlug`, `timestamp`/`submissionTime`, `username`/
//! `leetcodeUsername`/... Payloads deserialize into [`SubmissionPayload`] or
//! [`UpdatePayload`], are checked with `validator`, and are then normalized into
//! a [`NewSubmission`] or [`SubmissionUpdate`]. Unrecognised keys are kept
//! verbatim in `extra`.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::Serialize;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::str::FromStr;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::db::{Difficulty, NewSubmission, Platform, Status, SubmissionUpdate};
use crate::slug::slugify;

pub const MAX_TITLE_LEN: usize = 200;

/// Placeholder older extension builds send for fields they could not scrape.
const LEGACY_SENTINEL: &str = "<not found>";

/// Alternative spellings of one field, in order of precedence.
const ALIASES: &[&[&str]] = &[
    &["username", "leetcodeUsername", "codeforcesUsername", "gfgUsername"],
    &["url", "problemUrl"],
    &["slug", "problemSlug"],
    &["timestamp", "submissionTime"],
];

const IMMUTABLE_FIELDS: &[&str] = &["id", "email", "platform", "createdAt"];

/// Rust field name to wire name, in the order errors are reported.
const FIELD_NAMES: &[(&str, &str)] = &[
    ("email", "email"),
    ("platform", "platform"),
    ("username", "username"),
    ("url", "url"),
    ("slug", "slug"),
    ("problem_title", "problemTitle"),
    ("difficulty", "difficulty"),
    ("status", "status"),
    ("verdict", "verdict"),
    ("attempts", "attempts"),
    ("language", "language"),
    ("contest_id", "contestId"),
    ("notes", "notes"),
    ("tags", "tags"),
    ("timestamp", "timestamp"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Lenient field decoders. Clients send numbers where strings are expected and
/// the legacy placeholder where nothing was found.
mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::LEGACY_SENTINEL;

    fn kind(value: &Value) -> &'static str {
        match value {
            Value::Bool(_) => "a boolean",
            Value::Array(_) => "an array",
            Value::Object(_) => "an object",
            _ => "a scalar",
        }
    }

    /// Trimmed text. Numbers are stringified; empty text and the placeholder are absent.
    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let raw = match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => {
                return Err(D::Error::custom(format!(
                    "expected a string, found {}",
                    kind(&other)
                )))
            }
        };
        Ok((!raw.is_empty() && raw != LEGACY_SENTINEL).then_some(raw))
    }

    /// Whole number, given as a JSON number or numeric text.
    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        let parsed = match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            Some(_) => None,
        };
        parsed
            .map(Some)
            .ok_or_else(|| D::Error::custom("attempts must be a whole number"))
    }

    pub fn tags<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
        let items = match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Array(items)) => items,
            Some(_) => return Err(D::Error::custom("tags must be an array of strings")),
        };
        let mut tags = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::String(s) if !s.trim().is_empty() => tags.push(s.trim().to_string()),
                Value::String(_) => {}
                _ => return Err(D::Error::custom("tags must be an array of strings")),
            }
        }
        Ok(Some(tags))
    }
}

fn parses_as<T: FromStr<Err = String>>(value: &str, code: &'static str) -> Result<(), ValidationError> {
    value
        .parse::<T>()
        .map(|_| ())
        .map_err(|message| ValidationError::new(code).with_message(Cow::Owned(message)))
}

fn known_platform(value: &str) -> Result<(), ValidationError> {
    parses_as::<Platform>(value, "platform")
}

fn known_difficulty(value: &str) -> Result<(), ValidationError> {
    parses_as::<Difficulty>(value, "difficulty")
}

fn known_status(value: &str) -> Result<(), ValidationError> {
    parses_as::<Status>(value, "status")
}

fn rfc3339(value: &str) -> Result<(), ValidationError> {
    DateTime::parse_from_rfc3339(value).map(|_| ()).map_err(|_| {
        ValidationError::new("timestamp")
            .with_message(Cow::Borrowed("timestamp must be an ISO-8601 timestamp"))
    })
}

/// One ingestion payload as clients send it.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct SubmissionPayload {
    #[serde(deserialize_with = "lenient::text")]
    #[validate(
        required(message = "Email is required"),
        email(message = "Please enter a valid email")
    )]
    pub email: Option<String>,

    #[serde(deserialize_with = "lenient::text")]
    #[validate(
        required(message = "Platform is required"),
        custom(function = "known_platform")
    )]
    pub platform: Option<String>,

    #[serde(
        deserialize_with = "lenient::text",
        alias = "leetcodeUsername",
        alias = "codeforcesUsername",
        alias = "gfgUsername"
    )]
    pub username: Option<String>,

    #[serde(deserialize_with = "lenient::text", alias = "problemUrl")]
    pub url: Option<String>,

    #[serde(deserialize_with = "lenient::text", alias = "problemSlug")]
    pub slug: Option<String>,

    #[serde(deserialize_with = "lenient::text")]
    #[validate(length(
        min = 1,
        max = 200,
        message = "Problem title must be between 1 and 200 characters"
    ))]
    pub problem_title: Option<String>,

    #[serde(deserialize_with = "lenient::text")]
    #[validate(custom(function = "known_difficulty"))]
    pub difficulty: Option<String>,

    #[serde(deserialize_with = "lenient::text")]
    #[validate(custom(function = "known_status"))]
    pub status: Option<String>,

    #[serde(deserialize_with = "lenient::text")]
    pub verdict: Option<String>,

    #[serde(deserialize_with = "lenient::count")]
    #[validate(range(min = 1, max = 2147483647, message = "Attempts must be a positive integer"))]
    pub attempts: Option<i64>,

    #[serde(deserialize_with = "lenient::text")]
    pub language: Option<String>,

    #[serde(deserialize_with = "lenient::text")]
    pub contest_id: Option<String>,

    #[serde(deserialize_with = "lenient::text")]
    pub notes: Option<String>,

    #[serde(deserialize_with = "lenient::tags")]
    pub tags: Option<Vec<String>>,

    #[serde(deserialize_with = "lenient::text", alias = "submissionTime")]
    #[validate(custom(function = "rfc3339"))]
    pub timestamp: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A partial update as clients send it.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdatePayload {
    #[serde(deserialize_with = "lenient::text")]
    #[validate(length(
        min = 1,
        max = 200,
        message = "Problem title must be between 1 and 200 characters"
    ))]
    pub problem_title: Option<String>,

    #[serde(deserialize_with = "lenient::text")]
    #[validate(custom(function = "known_difficulty"))]
    pub difficulty: Option<String>,

    #[serde(deserialize_with = "lenient::text")]
    #[validate(custom(function = "known_status"))]
    pub status: Option<String>,

    #[serde(deserialize_with = "lenient::count")]
    #[validate(range(min = 1, max = 2147483647, message = "Attempts must be a positive integer"))]
    pub attempts: Option<i64>,

    #[serde(deserialize_with = "lenient::text")]
    pub language: Option<String>,

    #[serde(deserialize_with = "lenient::text")]
    pub notes: Option<String>,

    #[serde(deserialize_with = "lenient::tags")]
    pub tags: Option<Vec<String>>,

    #[serde(deserialize_with = "lenient::text", alias = "problemUrl")]
    pub url: Option<String>,

    /// Everything else, checked only for attempts to change identity fields.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

fn is_usable(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => {
            let s = s.trim();
            !s.is_empty() && s != LEGACY_SENTINEL
        }
        _ => true,
    }
}

/// Keeps only the first usable spelling of each aliased field, so a payload
/// carrying both `slug` and `problemSlug` is not a duplicate-field error.
fn resolve_aliases(map: &Map<String, Value>) -> Map<String, Value> {
    let mut map = map.clone();
    for group in ALIASES {
        let mut kept = false;
        for key in group.iter() {
            match map.get(*key) {
                Some(value) if !kept && is_usable(value) => kept = true,
                Some(_) => {
                    map.remove(*key);
                }
                None => {}
            }
        }
    }
    map
}

fn as_object<'a>(body: &'a Value, field: &str) -> Result<&'a Map<String, Value>, Vec<FieldError>> {
    body.as_object()
        .ok_or_else(|| vec![FieldError::new(field, "Request body must be a JSON object")])
}

/// Field for errors that concern the payload as a whole.
fn body_field(prefix: &str) -> String {
    if prefix.is_empty() {
        "body".to_string()
    } else {
        prefix.trim_end_matches('.').to_string()
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    map: Map<String, Value>,
    prefix: &str,
) -> Result<T, Vec<FieldError>> {
    serde_json::from_value(Value::Object(map))
        .map_err(|e| vec![FieldError::new(body_field(prefix), e.to_string())])
}

/// Flattens `validator` output into the `details` list, in payload field order.
fn field_errors(errors: &ValidationErrors, prefix: &str) -> Vec<FieldError> {
    let mut ranked = Vec::new();
    for (field, errs) in errors.field_errors() {
        let name: &str = &field;
        let (rank, wire) = FIELD_NAMES
            .iter()
            .position(|(rust, wire)| *rust == name || *wire == name)
            .map(|idx| (idx, FIELD_NAMES[idx].1))
            .unwrap_or((usize::MAX, name));
        for err in errs.iter() {
            let message = err
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("{} is invalid", wire));
            ranked.push((rank, FieldError::new(format!("{}{}", prefix, wire), message)));
        }
    }
    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().map(|(_, e)| e).collect()
}

fn to_i32(attempts: i64) -> i32 {
    i32::try_from(attempts).unwrap_or(i32::MAX)
}

/// Validates one ingestion payload.
pub fn validate_submission(body: &Value) -> Result<NewSubmission, Vec<FieldError>> {
    validate_with_prefix(body, "")
}

fn validate_with_prefix(body: &Value, prefix: &str) -> Result<NewSubmission, Vec<FieldError>> {
    let map = as_object(body, &body_field(prefix))?;
    let payload: SubmissionPayload = decode(resolve_aliases(map), prefix)?;
    payload.validate().map_err(|e| field_errors(&e, prefix))?;
    payload.into_new().ok_or_else(|| vec![FieldError::new(body_field(prefix), "Payload is incomplete")])
}

impl SubmissionPayload {
    /// Normalizes a payload that passed validation.
    fn into_new(self) -> Option<NewSubmission> {
        let slug = self
            .slug
            .or_else(|| self.problem_title.clone())
            .map(|s| slugify(&s))
            .filter(|s| !s.is_empty());

        Some(NewSubmission {
            email: self.email?.to_lowercase(),
            platform: self.platform?.parse().ok()?,
            username: self.username,
            url: self.url,
            slug,
            problem_title: self.problem_title,
            difficulty: self.difficulty.and_then(|d| d.parse().ok()),
            status: self.status.and_then(|s| s.parse().ok()).unwrap_or_default(),
            verdict: self.verdict,
            attempts: self.attempts.map(to_i32).unwrap_or(1),
            language: self.language,
            contest_id: self.contest_id,
            notes: self.notes,
            tags: self.tags.unwrap_or_default(),
            timestamp: self
                .timestamp
                .and_then(|ts| DateTime::parse_from_rfc3339(&ts).ok())
                .map(|ts| ts.with_timezone(&Utc)),
            extra: self.extra,
        })
    }
}

/// Validates a bulk payload `{ "submissions": [...] }`. Field errors are
/// prefixed with the entry index, e.g. `submissions[2].email`.
pub fn validate_bulk(body: &Value) -> Result<Vec<NewSubmission>, Vec<FieldError>> {
    let items = match body.get("submissions") {
        Some(Value::Array(items)) if !items.is_empty() => items,
        _ => {
            return Err(vec![FieldError::new(
                "submissions",
                "Submissions array is required and must not be empty",
            )])
        }
    };

    let mut created = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        match validate_with_prefix(item, &format!("submissions[{}].", idx)) {
            Ok(new) => created.push(new),
            Err(mut e) => errors.append(&mut e),
        }
    }

    if errors.is_empty() {
        Ok(created)
    } else {
        Err(errors)
    }
}

/// Validates a partial update. Identity fields cannot be changed.
pub fn validate_update(body: &Value) -> Result<SubmissionUpdate, Vec<FieldError>> {
    let map = as_object(body, "body")?;
    let payload: UpdatePayload = decode(resolve_aliases(map), "")?;

    let mut errors: Vec<FieldError> = IMMUTABLE_FIELDS
        .iter()
        .filter(|key| payload.rest.get(**key).is_some_and(|v| !v.is_null()))
        .map(|key| FieldError::new(*key, format!("{} cannot be modified", key)))
        .collect();
    if let Err(e) = payload.validate() {
        errors.extend(field_errors(&e, ""));
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let update = SubmissionUpdate {
        problem_title: payload.problem_title,
        difficulty: payload.difficulty.and_then(|d| d.parse().ok()),
        status: payload.status.and_then(|s| s.parse().ok()),
        attempts: payload.attempts.map(to_i32),
        language: payload.language,
        notes: payload.notes,
        tags: payload.tags,
        url: payload.url,
    };

    if update.is_empty() {
        return Err(vec![FieldError::new("body", "No updatable fields provided")]);
    }
    Ok(update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Difficulty, Status};
    use serde_json::json;

    fn fields_of(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn minimal_payload_gets_defaults() {
        let new = validate_submission(&json!({
            "email": "A@B.com ",
            "platform": "leetcode",
            "problemTitle": "Two Sum",
            "difficulty": "easy"
        }))
        .unwrap();

        assert_eq!(new.email, "a@b.com");
        assert_eq!(new.platform, Platform::Leetcode);
        assert_eq!(new.attempts, 1);
        assert_eq!(new.status, Status::Solved);
        assert_eq!(new.difficulty, Some(Difficulty::Easy));
        assert_eq!(new.slug.as_deref(), Some("two-sum"));
        assert!(new.timestamp.is_none());
    }

    #[test]
    fn missing_email_and_platform_are_both_reported() {
        let errors = validate_submission(&json!({ "problemTitle": "Two Sum" })).unwrap_err();
        assert_eq!(fields_of(&errors), vec!["email", "platform"]);
    }

    #[test]
    fn legacy_sentinel_email_is_rejected() {
        let errors = validate_submission(&json!({
            "email": "<not found>",
            "platform": "codeforces"
        }))
        .unwrap_err();
        assert_eq!(errors[0].message, "Email is required");
    }

    #[test]
    fn enumerated_fields_are_checked() {
        let errors = validate_submission(&json!({
            "email": "a@b.com",
            "platform": "test",
            "difficulty": "trivial",
            "status": "done",
            "attempts": 0
        }))
        .unwrap_err();
        assert_eq!(fields_of(&errors), vec!["platform", "difficulty", "status", "attempts"]);
    }

    #[test]
    fn legacy_field_names_are_mapped() {
        let new = validate_submission(&json!({
            "email": "a@b.com",
            "platform": "gfg",
            "problemSlug": "Reverse A Linked List",
            "submissionTime": "2025-08-08T04:29:41.228Z",
            "leetcodeUsername": "munaf",
            "attempts": "3",
            "contestId": 1850
        }))
        .unwrap();

        assert_eq!(new.platform, Platform::Geeksforgeeks);
        assert_eq!(new.slug.as_deref(), Some("reverse-a-linked-list"));
        assert_eq!(new.username.as_deref(), Some("munaf"));
        assert_eq!(new.attempts, 3);
        assert_eq!(new.contest_id.as_deref(), Some("1850"));
        assert_eq!(
            new.timestamp.unwrap().to_rfc3339(),
            "2025-08-08T04:29:41.228+00:00"
        );
    }

    #[test]
    fn unknown_fields_pass_through() {
        let new = validate_submission(&json!({
            "email": "a@b.com",
            "platform": "hackerrank",
            "timeComplexity": "O(n)",
            "solution": { "code": "print(1)" }
        }))
        .unwrap();
        assert_eq!(new.extra.len(), 2);
        assert_eq!(new.extra["timeComplexity"], "O(n)");
    }

    #[test]
    fn overlong_title_and_bad_timestamp() {
        let errors = validate_submission(&json!({
            "email": "a@b.com",
            "platform": "leetcode",
            "problemTitle": "x".repeat(MAX_TITLE_LEN + 1),
            "timestamp": "yesterday"
        }))
        .unwrap_err();
        assert_eq!(fields_of(&errors), vec!["problemTitle", "timestamp"]);
    }

    #[test]
    fn non_object_body() {
        let errors = validate_submission(&json!([1, 2])).unwrap_err();
        assert_eq!(errors[0].field, "body");
    }

    #[test]
    fn bulk_prefixes_errors_with_index() {
        let errors = validate_bulk(&json!({
            "submissions": [
                { "email": "a@b.com", "platform": "leetcode" },
                { "platform": "leetcode" }
            ]
        }))
        .unwrap_err();
        assert_eq!(fields_of(&errors), vec!["submissions[1].email"]);

        let errors = validate_bulk(&json!({ "submissions": [] })).unwrap_err();
        assert_eq!(errors[0].field, "submissions");
    }

    #[test]
    fn update_rejects_identity_fields() {
        let errors = validate_update(&json!({ "email": "x@y.com", "status": "doubt" })).unwrap_err();
        assert_eq!(fields_of(&errors), vec!["email"]);

        let errors = validate_update(&json!({})).unwrap_err();
        assert_eq!(errors[0].field, "body");

        let update = validate_update(&json!({ "status": "reattempt", "tags": ["dp"] })).unwrap();
        assert_eq!(update.status, Some(Status::Reattempt));
        assert_eq!(update.tags, Some(vec!["dp".to_string()]));
    }

    #[test]
    fn wrongly_typed_field_is_reported_against_the_body() {
        let errors = validate_submission(&json!({
            "email": "a@b.com",
            "platform": "leetcode",
            "tags": "dp"
        }))
        .unwrap_err();
        assert_eq!(fields_of(&errors), vec!["body"]);
        assert!(errors[0].message.contains("tags must be an array of strings"));

        let errors = validate_bulk(&json!({
            "submissions": [{ "email": "a@b.com", "platform": "leetcode", "attempts": true }]
        }))
        .unwrap_err();
        assert_eq!(fields_of(&errors), vec!["submissions[0]"]);
    }

    #[test]
    fn first_usable_alias_wins() {
        let new = validate_submission(&json!({
            "email": "a@b.com",
            "platform": "codeforces",
            "slug": "<not found>",
            "problemSlug": "Watermelon",
            "username": "",
            "codeforcesUsername": "tourist",
            "gfgUsername": "someone-else"
        }))
        .unwrap();
        assert_eq!(new.slug.as_deref(), Some("watermelon"));
        assert_eq!(new.username.as_deref(), Some("tourist"));
        assert!(new.extra.is_empty());
    }

    #[test]
    fn malformed_email_uses_format_message() {
        let errors = validate_submission(&json!({
            "email": "not-an-email",
            "platform": "leetcode"
        }))
        .unwrap_err();
        assert_eq!(errors, vec![FieldError::new("email", "Please enter a valid email")]);
    }
}
