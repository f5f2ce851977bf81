//! Query parameter types for API handlers.

use lpms_core::error::CoreError;
use lpms_core::pagination::PageRequest;
use lpms_core::reserve::{ReserveFilter, ReserveStatus};
use serde::Deserialize;

/// `GET /reserves` query: attribute filters plus `?limit=&offset=`.
///
/// Kept flat because `serde_urlencoded` cannot parse numbers inside a
/// flattened struct.
#[derive(Debug, Default, Deserialize)]
pub struct ReserveListParams {
    pub name: Option<String>,
    pub level: Option<String>,
    pub project_type: Option<String>,
    pub construct_subject: Option<String>,
    /// Wire name of a status, e.g. `entered_db`.
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ReserveListParams {
    /// Split into a filter and a clamped page. Blank text filters are ignored.
    pub fn into_parts(self) -> Result<(ReserveFilter, PageRequest), CoreError> {
        let status = self
            .status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().parse::<ReserveStatus>())
            .transpose()?;

        let filter = ReserveFilter {
            name: non_blank(self.name),
            level: non_blank(self.level),
            project_type: non_blank(self.project_type),
            construct_subject: non_blank(self.construct_subject),
            status,
        };
        Ok((filter, PageRequest::new(self.limit, self.offset)))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `?ids=1,2,3` for bulk endpoints. A missing parameter is treated as an
/// empty list and rejected by the id parser.
#[derive(Debug, Deserialize)]
pub struct IdsParams {
    #[serde(default)]
    pub ids: String,
}
