use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    DbPool, NewSubmission, PlatformStats, StatsFilter, StoreError, Submission, SubmissionQuery,
    SubmissionStore, SubmissionUpdate, UserStats,
};

const SUBMISSION_COLUMNS: &str = "id, email, platform, username, url, slug, problem_title, \
     difficulty, status, verdict, attempts, language, contest_id, notes, tags, submitted_at, \
     extra, created_at, updated_at";

const STATS_SELECT: &str = r#"
    SELECT
        COUNT(*) AS total_submissions,
        COUNT(*) FILTER (WHERE status = 'solved') AS solved,
        COUNT(*) FILTER (WHERE status = 'reattempt') AS reattempts,
        COUNT(*) FILTER (WHERE status = 'doubt') AS doubts,
        COUNT(*) FILTER (WHERE difficulty = 'easy') AS easy,
        COUNT(*) FILTER (WHERE difficulty = 'medium') AS medium,
        COUNT(*) FILTER (WHERE difficulty = 'hard') AS hard,
        COALESCE(SUM(attempts), 0)::BIGINT AS total_attempts
    FROM submissions
"#;

#[derive(Debug, FromRow)]
struct SubmissionRow {
    id: Uuid,
    email: String,
    platform: String,
    username: Option<String>,
    url: Option<String>,
    slug: Option<String>,
    problem_title: Option<String>,
    difficulty: Option<String>,
    status: String,
    verdict: Option<String>,
    attempts: i32,
    language: Option<String>,
    contest_id: Option<String>,
    notes: Option<String>,
    tags: Vec<String>,
    submitted_at: DateTime<Utc>,
    extra: Json<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubmissionRow> for Submission {
    type Error = StoreError;

    fn try_from(row: SubmissionRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = |reason: String| StoreError::Corrupt { id, reason };

        let extra = match row.extra.0 {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => serde_json::Map::new(),
            other => return Err(corrupt(format!("extra is not an object: {}", other))),
        };

        Ok(Submission {
            id,
            email: row.email,
            platform: row.platform.parse().map_err(corrupt)?,
            username: row.username,
            url: row.url,
            slug: row.slug,
            problem_title: row.problem_title,
            difficulty: row
                .difficulty
                .as_deref()
                .map(str::parse)
                .transpose()
                .map_err(corrupt)?,
            status: row.status.parse().map_err(corrupt)?,
            verdict: row.verdict,
            attempts: row.attempts,
            language: row.language,
            contest_id: row.contest_id,
            notes: row.notes,
            tags: row.tags,
            timestamp: row.submitted_at,
            extra,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct StatsRow {
    total_submissions: i64,
    solved: i64,
    reattempts: i64,
    doubts: i64,
    easy: i64,
    medium: i64,
    hard: i64,
    total_attempts: i64,
}

impl From<StatsRow> for UserStats {
    fn from(row: StatsRow) -> Self {
        Self {
            total_submissions: row.total_submissions,
            solved: row.solved,
            reattempts: row.reattempts,
            doubts: row.doubts,
            easy: row.easy,
            medium: row.medium,
            hard: row.hard,
            total_attempts: row.total_attempts,
        }
    }
}

#[derive(Debug, FromRow)]
struct PlatformStatsRow {
    platform: String,
    count: i64,
    solved: i64,
    reattempts: i64,
    doubts: i64,
}

/// PostgreSQL-backed store. Schema lives in `migrations/`.
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        self.pool.as_ref()
    }
}

fn insert_query(new: NewSubmission, id: Uuid, now: DateTime<Utc>) -> QueryBuilder<'static, Postgres> {
    let record = Submission::from_new(new, id, now);
    let mut qb = QueryBuilder::new(format!(
        "INSERT INTO submissions ({}) VALUES (",
        SUBMISSION_COLUMNS
    ));
    let mut values = qb.separated(", ");
    values
        .push_bind(record.id)
        .push_bind(record.email)
        .push_bind(record.platform.as_str())
        .push_bind(record.username)
        .push_bind(record.url)
        .push_bind(record.slug)
        .push_bind(record.problem_title)
        .push_bind(record.difficulty.map(|d| d.as_str()))
        .push_bind(record.status.as_str())
        .push_bind(record.verdict)
        .push_bind(record.attempts)
        .push_bind(record.language)
        .push_bind(record.contest_id)
        .push_bind(record.notes)
        .push_bind(record.tags)
        .push_bind(record.timestamp)
        .push_bind(Json(serde_json::Value::Object(record.extra)))
        .push_bind(record.created_at)
        .push_bind(record.updated_at);
    qb.push(format!(") RETURNING {}", SUBMISSION_COLUMNS));
    qb
}

fn push_query_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &SubmissionQuery) {
    let mut sep = " WHERE ";
    if let Some(email) = &query.email {
        qb.push(sep).push("email = ").push_bind(email.clone());
        sep = " AND ";
    }
    if let Some(platform) = query.platform {
        qb.push(sep).push("platform = ").push_bind(platform.as_str());
        sep = " AND ";
    }
    if let Some(difficulty) = query.difficulty {
        qb.push(sep).push("difficulty = ").push_bind(difficulty.as_str());
        sep = " AND ";
    }
    if let Some(status) = query.status {
        qb.push(sep).push("status = ").push_bind(status.as_str());
    }
}

fn push_stats_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &StatsFilter) {
    let mut sep = " WHERE ";
    if let Some(emails) = &filter.emails {
        qb.push(sep).push("email = ANY(").push_bind(emails.clone()).push(")");
        sep = " AND ";
    }
    if let Some(start) = filter.start {
        qb.push(sep).push("submitted_at >= ").push_bind(start);
        sep = " AND ";
    }
    if let Some(end) = filter.end {
        qb.push(sep).push("submitted_at <= ").push_bind(end);
    }
}

#[async_trait]
impl SubmissionStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn insert(&self, new: NewSubmission) -> Result<Submission, StoreError> {
        let row: SubmissionRow = insert_query(new, Uuid::new_v4(), Utc::now())
            .build_query_as()
            .fetch_one(self.pool())
            .await?;
        row.try_into()
    }

    async fn insert_many(&self, new: Vec<NewSubmission>) -> Result<Vec<Submission>, StoreError> {
        let mut tx = self.pool().begin().await?;
        let now = Utc::now();
        let mut created = Vec::with_capacity(new.len());
        for item in new {
            let row: SubmissionRow = insert_query(item, Uuid::new_v4(), now)
                .build_query_as()
                .fetch_one(&mut *tx)
                .await?;
            created.push(Submission::try_from(row)?);
        }
        tx.commit().await?;
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Submission>, StoreError> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {} FROM submissions WHERE id = $1",
            SUBMISSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.map(Submission::try_from).transpose()
    }

    async fn update(
        &self,
        id: Uuid,
        update: SubmissionUpdate,
    ) -> Result<Option<Submission>, StoreError> {
        let mut tx = self.pool().begin().await?;
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {} FROM submissions WHERE id = $1 FOR UPDATE",
            SUBMISSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let mut record = match row {
            Some(row) => Submission::try_from(row)?,
            None => return Ok(None),
        };
        record.apply(update, Utc::now());

        sqlx::query(
            r#"
            UPDATE submissions
            SET problem_title = $2, difficulty = $3, status = $4, attempts = $5,
                language = $6, notes = $7, tags = $8, url = $9, updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&record.problem_title)
        .bind(record.difficulty.map(|d| d.as_str()))
        .bind(record.status.as_str())
        .bind(record.attempts)
        .bind(&record.language)
        .bind(&record.notes)
        .bind(&record.tags)
        .bind(&record.url)
        .bind(record.updated_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(Some(record))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM submissions WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, query: &SubmissionQuery) -> Result<(Vec<Submission>, u64), StoreError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM submissions");
        push_query_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool()).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM submissions",
            SUBMISSION_COLUMNS
        ));
        push_query_filters(&mut select, query);
        select.push(format!(
            " ORDER BY {} {}, created_at DESC LIMIT ",
            query.sort_by.sql_expr(),
            query.sort_order.sql()
        ));
        select.push_bind(i64::from(query.limit));
        select.push(" OFFSET ");
        select.push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));

        let rows: Vec<SubmissionRow> = select.build_query_as().fetch_all(self.pool()).await?;
        let submissions = rows
            .into_iter()
            .map(Submission::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((submissions, u64::try_from(total).unwrap_or(0)))
    }

    async fn user_stats(&self, email: &str) -> Result<UserStats, StoreError> {
        let row = sqlx::query_as::<_, StatsRow>(&format!("{} WHERE email = $1", STATS_SELECT))
            .bind(email)
            .fetch_one(self.pool())
            .await?;
        Ok(row.into())
    }

    async fn platform_stats(&self, email: &str) -> Result<Vec<PlatformStats>, StoreError> {
        let rows = sqlx::query_as::<_, PlatformStatsRow>(
            r#"
            SELECT
                platform,
                COUNT(*) AS count,
                COUNT(*) FILTER (WHERE status = 'solved') AS solved,
                COUNT(*) FILTER (WHERE status = 'reattempt') AS reattempts,
                COUNT(*) FILTER (WHERE status = 'doubt') AS doubts
            FROM submissions
            WHERE email = $1
            GROUP BY platform
            "#,
        )
        .bind(email)
        .fetch_all(self.pool())
        .await?;

        let mut stats = Vec::with_capacity(rows.len());
        for row in rows {
            let platform = row.platform.parse().map_err(|reason| StoreError::Corrupt {
                id: Uuid::nil(),
                reason,
            })?;
            stats.push(PlatformStats {
                platform,
                count: row.count,
                solved: row.solved,
                reattempts: row.reattempts,
                doubts: row.doubts,
            });
        }
        PlatformStats::sort(&mut stats);
        Ok(stats)
    }

    async fn global_stats(&self, filter: &StatsFilter) -> Result<UserStats, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(STATS_SELECT);
        push_stats_filters(&mut qb, filter);
        let row: StatsRow = qb.build_query_as().fetch_one(self.pool()).await?;
        Ok(row.into())
    }
}
