//! Repository for the `objects` table.

use sqlx::PgPool;

use crate::models::object::{ObjectContentRow, ObjectRow};

const META_COLUMNS: &str = "id, file_name, content_type, size_bytes, created_by, created_at";

/// Provides storage operations for uploaded artifacts.
pub struct ObjectRepo;

impl ObjectRepo {
    /// Store an object under `id`, returning its metadata.
    pub async fn create(
        pool: &PgPool,
        id: &str,
        file_name: &str,
        content_type: &str,
        created_by: &str,
        content: &[u8],
    ) -> Result<ObjectRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO objects (id, file_name, content_type, size_bytes, created_by, content)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {META_COLUMNS}"
        );
        sqlx::query_as::<_, ObjectRow>(&query)
            .bind(id)
            .bind(file_name)
            .bind(content_type)
            .bind(content.len() as i64)
            .bind(created_by)
            .bind(content)
            .fetch_one(pool)
            .await
    }

    /// Fetch an object with its content.
    pub async fn find_by_id(
        pool: &PgPool,
        id: &str,
    ) -> Result<Option<ObjectContentRow>, sqlx::Error> {
        let query = format!("SELECT {META_COLUMNS}, content FROM objects WHERE id = $1");
        sqlx::query_as::<_, ObjectContentRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn exists(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM objects WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Delete an object by ID. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM objects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
