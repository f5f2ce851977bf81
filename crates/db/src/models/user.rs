//! User row model.

use lpms_core::store::Actor;
use sqlx::FromRow;

/// Identity columns of the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub open_id: String,
    pub is_admin: bool,
}

impl From<UserRow> for Actor {
    fn from(row: UserRow) -> Self {
        Actor {
            open_id: row.open_id,
            is_admin: row.is_admin,
        }
    }
}
