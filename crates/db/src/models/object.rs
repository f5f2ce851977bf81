//! Stored object row models.

use lpms_core::objects::{ObjectContent, StoredObject};
use lpms_core::types::Timestamp;
use sqlx::FromRow;

/// Metadata columns of the `objects` table.
#[derive(Debug, Clone, FromRow)]
pub struct ObjectRow {
    pub id: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_by: String,
    pub created_at: Timestamp,
}

impl From<ObjectRow> for StoredObject {
    fn from(row: ObjectRow) -> Self {
        StoredObject {
            id: row.id,
            file_name: row.file_name,
            content_type: row.content_type,
            size_bytes: row.size_bytes,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

/// Metadata plus the `content` column.
#[derive(Debug, Clone, FromRow)]
pub struct ObjectContentRow {
    #[sqlx(flatten)]
    pub meta: ObjectRow,
    pub content: Vec<u8>,
}

impl From<ObjectContentRow> for ObjectContent {
    fn from(row: ObjectContentRow) -> Self {
        ObjectContent {
            meta: row.meta.into(),
            bytes: row.content,
        }
    }
}
