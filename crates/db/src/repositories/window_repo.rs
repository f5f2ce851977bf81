//! Repository for the `window_settings` table.

use lpms_core::window::TimeWindow;
use sqlx::PgPool;

use crate::models::window::WindowRow;

/// Provides access to the singleton window configuration.
pub struct WindowRepo;

impl WindowRepo {
    /// Load every configured window ordered by start.
    pub async fn list(pool: &PgPool) -> Result<Vec<WindowRow>, sqlx::Error> {
        sqlx::query_as::<_, WindowRow>(
            "SELECT start_at, end_at FROM window_settings ORDER BY start_at",
        )
        .fetch_all(pool)
        .await
    }

    /// Replace the whole configuration within a transaction.
    ///
    /// The table lock serializes concurrent replacements so readers never see
    /// a mix of two configurations.
    pub async fn replace_all(pool: &PgPool, windows: &[TimeWindow]) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("LOCK TABLE window_settings IN EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM window_settings")
            .execute(&mut *tx)
            .await?;

        for window in windows {
            sqlx::query("INSERT INTO window_settings (start_at, end_at) VALUES ($1, $2)")
                .bind(window.start_at)
                .bind(window.end_at)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await
    }
}
