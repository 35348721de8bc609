use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Coding site a submission came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Leetcode,
    Codeforces,
    #[serde(alias = "gfg")]
    Geeksforgeeks,
    Hackerrank,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Leetcode,
        Platform::Codeforces,
        Platform::Geeksforgeeks,
        Platform::Hackerrank,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leetcode => "leetcode",
            Self::Codeforces => "codeforces",
            Self::Geeksforgeeks => "geeksforgeeks",
            Self::Hackerrank => "hackerrank",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "leetcode" => Ok(Self::Leetcode),
            "codeforces" => Ok(Self::Codeforces),
            "geeksforgeeks" | "gfg" => Ok(Self::Geeksforgeeks),
            "hackerrank" => Ok(Self::Hackerrank),
            _ => Err("Platform must be leetcode, geeksforgeeks, hackerrank, or codeforces".into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    fn rank(difficulty: Option<Difficulty>) -> u8 {
        // Missing difficulty sorts after every value, like NULL in Postgres.
        difficulty.map_or(u8::MAX, |d| d as u8)
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err("Difficulty must be easy, medium, or hard".into()),
        }
    }
}

/// Practitioner's own classification of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Solved,
    Reattempt,
    Doubt,
    InProgress,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Solved => "solved",
            Self::Reattempt => "reattempt",
            Self::Doubt => "doubt",
            Self::InProgress => "in-progress",
        }
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "solved" => Ok(Self::Solved),
            "reattempt" => Ok(Self::Reattempt),
            "doubt" => Ok(Self::Doubt),
            "in-progress" => Ok(Self::InProgress),
            _ => Err("Status must be solved, reattempt, doubt, or in-progress".into()),
        }
    }
}

/// A validated submission ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub email: String,
    pub platform: Platform,
    pub username: Option<String>,
    pub url: Option<String>,
    pub slug: Option<String>,
    pub problem_title: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub status: Status,
    pub verdict: Option<String>,
    pub attempts: i32,
    pub language: Option<String>,
    pub contest_id: Option<String>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A persisted submission record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    pub email: String,
    pub platform: Platform,
    pub username: Option<String>,
    pub url: Option<String>,
    pub slug: Option<String>,
    pub problem_title: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub status: Status,
    pub verdict: Option<String>,
    pub attempts: i32,
    pub language: Option<String>,
    pub contest_id: Option<String>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub extra: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    pub fn from_new(new: NewSubmission, id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id,
            email: new.email,
            platform: new.platform,
            username: new.username,
            url: new.url,
            slug: new.slug,
            problem_title: new.problem_title,
            difficulty: new.difficulty,
            status: new.status,
            verdict: new.verdict,
            attempts: new.attempts,
            language: new.language,
            contest_id: new.contest_id,
            notes: new.notes,
            tags: new.tags,
            timestamp: new.timestamp.unwrap_or(now),
            extra: new.extra,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a partial update and refreshes `updated_at`.
    pub fn apply(&mut self, update: SubmissionUpdate, now: DateTime<Utc>) {
        if let Some(title) = update.problem_title {
            self.problem_title = Some(title);
        }
        if let Some(difficulty) = update.difficulty {
            self.difficulty = Some(difficulty);
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(attempts) = update.attempts {
            self.attempts = attempts;
        }
        if let Some(language) = update.language {
            self.language = Some(language);
        }
        if let Some(notes) = update.notes {
            self.notes = Some(notes);
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if let Some(url) = update.url {
            self.url = Some(url);
        }
        self.updated_at = now;
    }
}

/// Fields a practitioner may edit after ingestion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionUpdate {
    pub problem_title: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub status: Option<Status>,
    pub attempts: Option<i32>,
    pub language: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
    pub url: Option<String>,
}

impl SubmissionUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Timestamp,
    CreatedAt,
    Attempts,
    Platform,
    Difficulty,
    Status,
}

impl SortField {
    /// SQL expression used in ORDER BY. Only ever built from this fixed set.
    pub fn sql_expr(&self) -> &'static str {
        match self {
            Self::Timestamp => "submitted_at",
            Self::CreatedAt => "created_at",
            Self::Attempts => "attempts",
            Self::Platform => "platform",
            Self::Difficulty => {
                "CASE difficulty WHEN 'easy' THEN 0 WHEN 'medium' THEN 1 WHEN 'hard' THEN 2 END"
            }
            Self::Status => "status",
        }
    }

    pub fn compare(&self, a: &Submission, b: &Submission) -> Ordering {
        match self {
            Self::Timestamp => a.timestamp.cmp(&b.timestamp),
            Self::CreatedAt => a.created_at.cmp(&b.created_at),
            Self::Attempts => a.attempts.cmp(&b.attempts),
            Self::Platform => a.platform.as_str().cmp(b.platform.as_str()),
            Self::Difficulty => Difficulty::rank(a.difficulty).cmp(&Difficulty::rank(b.difficulty)),
            Self::Status => a.status.as_str().cmp(b.status.as_str()),
        }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "timestamp" => Ok(Self::Timestamp),
            "createdAt" => Ok(Self::CreatedAt),
            "attempts" => Ok(Self::Attempts),
            "platform" => Ok(Self::Platform),
            "difficulty" => Ok(Self::Difficulty),
            "status" => Ok(Self::Status),
            _ => Err(
                "sortBy must be timestamp, createdAt, attempts, platform, difficulty, or status"
                    .into(),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err("sortOrder must be asc or desc".into()),
        }
    }
}

/// Filters, ordering and paging for submission listings.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionQuery {
    pub email: Option<String>,
    pub platform: Option<Platform>,
    pub difficulty: Option<Difficulty>,
    pub status: Option<Status>,
    pub page: u32,
    pub limit: u32,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl Default for SubmissionQuery {
    fn default() -> Self {
        Self {
            email: None,
            platform: None,
            difficulty: None,
            status: None,
            page: 1,
            limit: 10,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl SubmissionQuery {
    pub fn matches(&self, s: &Submission) -> bool {
        self.email.as_ref().map_or(true, |e| *e == s.email)
            && self.platform.map_or(true, |p| p == s.platform)
            && self.difficulty.map_or(true, |d| Some(d) == s.difficulty)
            && self.status.map_or(true, |st| st == s.status)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    /// Orders two records per `sort_by`/`sort_order`, newest insert first on ties.
    pub fn compare(&self, a: &Submission, b: &Submission) -> Ordering {
        let primary = match self.sort_order {
            SortOrder::Asc => self.sort_by.compare(a, b),
            SortOrder::Desc => self.sort_by.compare(b, a),
        };
        primary.then_with(|| b.created_at.cmp(&a.created_at))
    }
}

/// Scope for the global statistics query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsFilter {
    pub emails: Option<Vec<String>>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl StatsFilter {
    pub fn matches(&self, s: &Submission) -> bool {
        self.emails.as_ref().map_or(true, |emails| emails.contains(&s.email))
            && self.start.map_or(true, |start| s.timestamp >= start)
            && self.end.map_or(true, |end| s.timestamp <= end)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_submissions: i64,
    pub solved: i64,
    pub reattempts: i64,
    pub doubts: i64,
    pub easy: i64,
    pub medium: i64,
    pub hard: i64,
    pub total_attempts: i64,
}

impl UserStats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a Submission>) -> Self {
        let mut stats = Self::default();
        for s in records {
            stats.total_submissions += 1;
            match s.status {
                Status::Solved => stats.solved += 1,
                Status::Reattempt => stats.reattempts += 1,
                Status::Doubt => stats.doubts += 1,
                Status::InProgress => {}
            }
            match s.difficulty {
                Some(Difficulty::Easy) => stats.easy += 1,
                Some(Difficulty::Medium) => stats.medium += 1,
                Some(Difficulty::Hard) => stats.hard += 1,
                None => {}
            }
            stats.total_attempts += i64::from(s.attempts);
        }
        stats
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub platform: Platform,
    pub count: i64,
    pub solved: i64,
    pub reattempts: i64,
    pub doubts: i64,
}

impl PlatformStats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a Submission>) -> Vec<Self> {
        let mut by_platform: Vec<PlatformStats> = Vec::new();
        for s in records {
            let idx = match by_platform.iter().position(|p| p.platform == s.platform) {
                Some(idx) => idx,
                None => {
                    by_platform.push(PlatformStats {
                        platform: s.platform,
                        count: 0,
                        solved: 0,
                        reattempts: 0,
                        doubts: 0,
                    });
                    by_platform.len() - 1
                }
            };
            let entry = &mut by_platform[idx];
            entry.count += 1;
            match s.status {
                Status::Solved => entry.solved += 1,
                Status::Reattempt => entry.reattempts += 1,
                Status::Doubt => entry.doubts += 1,
                Status::InProgress => {}
            }
        }
        Self::sort(&mut by_platform);
        by_platform
    }

    /// Highest count first, platform name breaks ties.
    pub fn sort(stats: &mut [PlatformStats]) {
        stats.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.platform.as_str().cmp(b.platform.as_str()))
        });
    }
}

/// One page of a submission listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPage {
    pub submissions: Vec<Submission>,
    pub total_pages: u64,
    pub current_page: u32,
    pub total_submissions: u64,
}

impl SubmissionPage {
    pub fn new(submissions: Vec<Submission>, total: u64, query: &SubmissionQuery) -> Self {
        let limit = u64::from(query.limit.max(1));
        Self {
            submissions,
            total_pages: total.div_ceil(limit),
            current_page: query.page,
            total_submissions: total,
        }
    }
}
