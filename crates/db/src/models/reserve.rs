//! Reserve project row model.

use lpms_core::error::CoreError;
use lpms_core::reserve::ReserveProject;
use lpms_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use crate::models::status::{decode_status, StatusId};

/// A row from the `reserve_projects` table.
#[derive(Debug, Clone, FromRow)]
pub struct ReserveRow {
    pub id: DbId,
    pub name: String,
    pub level: String,
    pub project_type: String,
    pub construct_subject: String,
    pub status_id: StatusId,
    pub site_photo: Option<String>,
    pub upload_cad_id: Option<String>,
    pub is_case_finish: bool,
    pub is_research: bool,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<ReserveRow> for ReserveProject {
    type Error = CoreError;

    fn try_from(row: ReserveRow) -> Result<Self, Self::Error> {
        Ok(ReserveProject {
            id: row.id,
            name: row.name,
            level: row.level,
            project_type: row.project_type,
            construct_subject: row.construct_subject,
            status: decode_status(row.status_id)?,
            site_photo: row.site_photo,
            upload_cad_id: row.upload_cad_id,
            is_case_finish: row.is_case_finish,
            is_research: row.is_research,
            created_by: row.created_by,
            updated_by: row.updated_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Grouped `(bucket, status_id, count)` row from the analysis query.
#[derive(Debug, Clone, FromRow)]
pub struct StatusCountDbRow {
    pub bucket: String,
    pub status_id: StatusId,
    pub count: i64,
}
