//! Repository for the `reserve_projects` table.

use lpms_core::analysis::{AnalysisFilter, GroupBy};
use lpms_core::reserve::{NewReserve, ReserveFilter, ReserveProject, ReserveStatus};
use lpms_core::store::ListScope;
use lpms_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgPool};

use crate::models::reserve::{ReserveRow, StatusCountDbRow};
use crate::models::status::StatusId;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, level, project_type, construct_subject, status_id, \
     site_photo, upload_cad_id, is_case_finish, is_research, \
     created_by, updated_by, created_at, updated_at";

/// A value bound to a dynamically built WHERE clause.
enum FilterValue {
    Text(String),
    Status(StatusId),
    Time(Timestamp),
}

/// WHERE clause plus its bind values, in placeholder order.
struct Conditions {
    clauses: Vec<String>,
    values: Vec<FilterValue>,
}

impl Conditions {
    fn new() -> Self {
        Self {
            clauses: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Push a clause; `{}` in `template` is replaced by the next placeholder.
    fn push(&mut self, template: &str, value: FilterValue) {
        let placeholder = format!("${}", self.values.len() + 1);
        self.clauses.push(template.replace("{}", &placeholder));
        self.values.push(value);
    }

    fn next_param(&self) -> usize {
        self.values.len() + 1
    }

    fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }
}

macro_rules! bind_values {
    ($query:expr, $values:expr) => {{
        let mut q = $query;
        for value in $values {
            q = match value {
                FilterValue::Text(v) => q.bind(v.clone()),
                FilterValue::Status(v) => q.bind(*v),
                FilterValue::Time(v) => q.bind(*v),
            };
        }
        q
    }};
}

/// SQL expression producing the bucket label for `group_by`.
///
/// Labels match `lpms_core::analysis::bucket_label`.
fn bucket_expr(group_by: GroupBy) -> &'static str {
    match group_by {
        GroupBy::Year => "to_char(created_at AT TIME ZONE 'UTC', 'YYYY')",
        GroupBy::Quarter => "to_char(created_at AT TIME ZONE 'UTC', 'YYYY-\"Q\"Q')",
        GroupBy::Month => "to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM')",
        GroupBy::ProjectType => "project_type",
        GroupBy::Level => "level",
    }
}

/// Provides persistence operations for reserve projects.
pub struct ReserveRepo;

impl ReserveRepo {
    /// Insert a new `Draft` project owned by `actor`, returning the created row.
    pub async fn create(
        conn: &mut PgConnection,
        input: &NewReserve,
        actor: &str,
    ) -> Result<ReserveRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO reserve_projects
                (name, level, project_type, construct_subject, status_id,
                 site_photo, upload_cad_id, created_by, updated_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ReserveRow>(&query)
            .bind(&input.name)
            .bind(&input.level)
            .bind(&input.project_type)
            .bind(&input.construct_subject)
            .bind(ReserveStatus::Draft.id())
            .bind(&input.site_photo)
            .bind(&input.upload_cad_id)
            .bind(actor)
            .fetch_one(conn)
            .await
    }

    /// Find a project by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ReserveRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reserve_projects WHERE id = $1");
        sqlx::query_as::<_, ReserveRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a project and lock its row until the transaction ends.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<ReserveRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reserve_projects WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, ReserveRow>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Write every mutable column of `record`. `created_*` columns are never
    /// touched.
    ///
    /// Returns `None` if no row with the record's id exists.
    pub async fn save(
        conn: &mut PgConnection,
        record: &ReserveProject,
    ) -> Result<Option<ReserveRow>, sqlx::Error> {
        let query = format!(
            "UPDATE reserve_projects SET
                name = $2,
                level = $3,
                project_type = $4,
                construct_subject = $5,
                status_id = $6,
                site_photo = $7,
                upload_cad_id = $8,
                is_case_finish = $9,
                is_research = $10,
                updated_by = $11,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ReserveRow>(&query)
            .bind(record.id)
            .bind(&record.name)
            .bind(&record.level)
            .bind(&record.project_type)
            .bind(&record.construct_subject)
            .bind(record.status.id())
            .bind(&record.site_photo)
            .bind(&record.upload_cad_id)
            .bind(record.is_case_finish)
            .bind(record.is_research)
            .bind(&record.updated_by)
            .fetch_optional(conn)
            .await
    }

    /// Permanently delete a project by ID. Returns `true` if a row was removed.
    /// Lock the `objects` row for `object_id` and return a record other than
    /// `except` that references it in either slot.
    ///
    /// The row lock serializes concurrent claims on the same object until the
    /// surrounding transaction ends.
    pub async fn find_referencing(
        conn: &mut PgConnection,
        object_id: &str,
        except: Option<DbId>,
    ) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query("SELECT id FROM objects WHERE id = $1 FOR UPDATE")
            .bind(object_id)
            .fetch_optional(&mut *conn)
            .await?;

        sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM reserve_projects
             WHERE (site_photo = $1 OR upload_cad_id = $1)
               AND ($2::BIGINT IS NULL OR id <> $2)
             ORDER BY id
             LIMIT 1",
        )
        .bind(object_id)
        .bind(except)
        .fetch_optional(conn)
        .await
    }

    pub async fn delete(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM reserve_projects WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count matching projects and fetch one page, newest first.
    pub async fn list(
        pool: &PgPool,
        filter: &ReserveFilter,
        scope: &ListScope,
        limit: i64,
        offset: i64,
    ) -> Result<(i64, Vec<ReserveRow>), sqlx::Error> {
        let mut conditions = Conditions::new();
        if let ListScope::OwnedBy(owner) = scope {
            conditions.push("created_by = {}", FilterValue::Text(owner.clone()));
        }
        if let Some(name) = &filter.name {
            conditions.push(
                "name ILIKE '%' || {} || '%'",
                FilterValue::Text(escape_like(name)),
            );
        }
        if let Some(level) = &filter.level {
            conditions.push("level = {}", FilterValue::Text(level.clone()));
        }
        if let Some(project_type) = &filter.project_type {
            conditions.push("project_type = {}", FilterValue::Text(project_type.clone()));
        }
        if let Some(subject) = &filter.construct_subject {
            conditions.push("construct_subject = {}", FilterValue::Text(subject.clone()));
        }
        if let Some(status) = filter.status {
            conditions.push("status_id = {}", FilterValue::Status(status.id()));
        }
        let where_clause = conditions.where_clause();

        let count_query = format!("SELECT COUNT(*) FROM reserve_projects {where_clause}");
        let total: i64 = bind_values!(
            sqlx::query_scalar::<sqlx::Postgres, i64>(&count_query),
            &conditions.values
        )
        .fetch_one(pool)
        .await?;

        let param_idx = conditions.next_param();
        let page_query = format!(
            "SELECT {COLUMNS} FROM reserve_projects {where_clause} \
             ORDER BY created_at DESC, id DESC \
             LIMIT ${param_idx} OFFSET ${}",
            param_idx + 1
        );
        let rows = bind_values!(
            sqlx::query_as::<_, ReserveRow>(&page_query),
            &conditions.values
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok((total, rows))
    }

    /// Count projects per `(bucket, status)`, ordered by bucket then status.
    pub async fn count_by_status(
        pool: &PgPool,
        filter: &AnalysisFilter,
    ) -> Result<Vec<StatusCountDbRow>, sqlx::Error> {
        let mut conditions = Conditions::new();
        if let Some(from) = filter.from {
            conditions.push("created_at >= {}", FilterValue::Time(from));
        }
        if let Some(to) = filter.to {
            conditions.push("created_at < {}", FilterValue::Time(to));
        }
        if let Some(project_type) = &filter.project_type {
            conditions.push("project_type = {}", FilterValue::Text(project_type.clone()));
        }
        if let Some(level) = &filter.level {
            conditions.push("level = {}", FilterValue::Text(level.clone()));
        }

        let query = format!(
            "SELECT {bucket} AS bucket, status_id, COUNT(*) AS count \
             FROM reserve_projects {where_clause} \
             GROUP BY 1, 2 \
             ORDER BY 1, 2",
            bucket = bucket_expr(filter.group_by),
            where_clause = conditions.where_clause(),
        );
        bind_values!(
            sqlx::query_as::<_, StatusCountDbRow>(&query),
            &conditions.values
        )
        .fetch_all(pool)
        .await
    }
}

/// Escape `LIKE` wildcards so the filter matches them literally.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
