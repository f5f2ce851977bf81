//! Repository for the `users` table.

use sqlx::PgPool;

use crate::models::user::UserRow;

/// Provides identity lookups.
pub struct UserRepo;

impl UserRepo {
    pub async fn find_by_open_id(
        pool: &PgPool,
        open_id: &str,
    ) -> Result<Option<UserRow>, sqlx::Error> {
        sqlx::query_as::<_, UserRow>("SELECT open_id, is_admin FROM users WHERE open_id = $1")
            .bind(open_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert a user, or update the admin flag of an existing one.
    pub async fn upsert(
        pool: &PgPool,
        open_id: &str,
        is_admin: bool,
    ) -> Result<UserRow, sqlx::Error> {
        sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (open_id, is_admin) VALUES ($1, $2) \
             ON CONFLICT (open_id) DO UPDATE SET is_admin = EXCLUDED.is_admin \
             RETURNING open_id, is_admin",
        )
        .bind(open_id)
        .bind(is_admin)
        .fetch_one(pool)
        .await
    }
}
