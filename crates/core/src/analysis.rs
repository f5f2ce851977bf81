//! Bucketed status analytics over reserve projects.

use chrono::Datelike;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::reserve::{ReserveProject, ReserveStatus};
use crate::types::Timestamp;

/// The key records are bucketed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    /// Creation year, labelled `YYYY`.
    Year,
    /// Creation quarter, labelled `YYYY-Qn`.
    Quarter,
    /// Creation month, labelled `YYYY-MM`.
    Month,
    ProjectType,
    Level,
}

/// Filter for [`summarize`] input rows.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisFilter {
    pub group_by: GroupBy,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<Timestamp>,
    /// Exclusive upper bound on `created_at`.
    pub to: Option<Timestamp>,
    pub project_type: Option<String>,
    pub level: Option<String>,
}

impl AnalysisFilter {
    pub fn new(group_by: GroupBy) -> Self {
        Self {
            group_by,
            from: None,
            to: None,
            project_type: None,
            level: None,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from >= to {
                return Err(CoreError::InvalidArgument(format!(
                    "Analysis range start {from} must be before its end {to}"
                )));
            }
        }
        Ok(())
    }
}

/// The bucket label of `record` under `group_by`.
///
/// Matches the labels produced by the SQL aggregation in `lpms-db`.
pub fn bucket_label(group_by: GroupBy, record: &ReserveProject) -> String {
    let created = record.created_at;
    match group_by {
        GroupBy::Year => created.format("%Y").to_string(),
        GroupBy::Quarter => format!("{}-Q{}", created.year(), (created.month() - 1) / 3 + 1),
        GroupBy::Month => created.format("%Y-%m").to_string(),
        GroupBy::ProjectType => record.project_type.clone(),
        GroupBy::Level => record.level.clone(),
    }
}

/// One grouped row produced by persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCountRow {
    pub bucket: String,
    pub status: ReserveStatus,
    pub count: i64,
}

/// Count of records in one status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: ReserveStatus,
    pub count: i64,
}

/// Per-bucket totals with the per-status breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketSummary {
    pub bucket: String,
    pub total: i64,
    pub data: Vec<StatusCount>,
}

/// Group rows by bucket in first-encounter order and total each bucket.
pub fn summarize(rows: Vec<StatusCountRow>) -> Vec<BucketSummary> {
    let mut buckets: IndexMap<String, Vec<StatusCount>> = IndexMap::new();
    for row in rows {
        buckets.entry(row.bucket).or_default().push(StatusCount {
            status: row.status,
            count: row.count,
        });
    }

    buckets
        .into_iter()
        .map(|(bucket, data)| BucketSummary {
            total: data.iter().map(|d| d.count).sum(),
            bucket,
            data,
        })
        .collect()
}
