//! Window setting row model.

use lpms_core::types::Timestamp;
use lpms_core::window::TimeWindow;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct WindowRow {
    pub start_at: Timestamp,
    pub end_at: Timestamp,
}

impl From<WindowRow> for TimeWindow {
    fn from(row: WindowRow) -> Self {
        TimeWindow {
            start_at: row.start_at,
            end_at: row.end_at,
        }
    }
}
