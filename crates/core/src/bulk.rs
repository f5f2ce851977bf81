//! Fan-out of single-record operations over an id list.
//!
//! Bulk operations are sequential and fail-fast with no rollback: processing
//! stops at the first failing id, and every record handled before it stays
//! deleted or transitioned. The error reports the failing id and how many
//! records were already applied so callers can resume.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::CoreError;
use crate::lifecycle::LifecycleEngine;
use crate::reserve::Transition;
use crate::types::DbId;

/// Parse a comma-separated list of positive record ids.
///
/// Whitespace around each element is ignored. Elements must be plain ASCII
/// digits; signs, empty elements, zero and repeated ids are rejected.
pub fn parse_id_list(raw: &str) -> Result<Vec<DbId>, CoreError> {
    if raw.trim().is_empty() {
        return Err(CoreError::InvalidArgument("Id list is empty".into()));
    }

    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(CoreError::InvalidArgument(format!(
                "Id list '{raw}' contains an empty element"
            )));
        }
        if !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::InvalidArgument(format!(
                "'{part}' is not a valid id"
            )));
        }
        let id: DbId = part
            .parse()
            .map_err(|_| CoreError::InvalidArgument(format!("'{part}' is not a valid id")))?;
        if id <= 0 {
            return Err(CoreError::InvalidArgument(format!(
                "Id {id} must be positive"
            )));
        }
        if !seen.insert(id) {
            return Err(CoreError::InvalidArgument(format!(
                "Id {id} appears more than once"
            )));
        }
        ids.push(id);
    }
    Ok(ids)
}

/// Outcome of a bulk operation that processed every id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    /// Ids processed, in request order.
    pub ids: Vec<DbId>,
}

/// Sequences a lifecycle operation across a list of record ids.
pub struct BulkCoordinator<'a> {
    engine: &'a LifecycleEngine,
}

impl<'a> BulkCoordinator<'a> {
    pub fn new(engine: &'a LifecycleEngine) -> Self {
        Self { engine }
    }

    /// Delete each record in order, releasing its artifacts first.
    pub async fn multi_delete(&self, actor: &str, raw_ids: &str) -> Result<BulkOutcome, CoreError> {
        let ids = parse_id_list(raw_ids)?;
        for (completed, &id) in ids.iter().enumerate() {
            if let Err(e) = self.engine.delete(actor, id).await {
                return Err(abort("multi_delete", id, completed, e));
            }
        }

        tracing::info!(count = ids.len(), actor, "Bulk delete completed");
        Ok(BulkOutcome { ids })
    }

    /// Submit each record in order (`EnteredDb -> EarlyPlan`), keeping its
    /// stored flag values. The window gate is consulted for every record.
    pub async fn multi_submission(
        &self,
        actor: &str,
        raw_ids: &str,
    ) -> Result<BulkOutcome, CoreError> {
        let ids = parse_id_list(raw_ids)?;
        for (completed, &id) in ids.iter().enumerate() {
            if let Err(e) = self
                .engine
                .transition(actor, id, Transition::Submission, None)
                .await
            {
                return Err(abort("multi_submission", id, completed, e));
            }
        }

        tracing::info!(count = ids.len(), actor, "Bulk submission completed");
        Ok(BulkOutcome { ids })
    }
}

fn abort(operation: &str, failed_id: DbId, completed: usize, source: CoreError) -> CoreError {
    tracing::warn!(
        operation,
        failed_id,
        completed,
        error = %source,
        "Bulk operation aborted"
    );
    CoreError::BulkAborted {
        failed_id,
        completed,
        source: Box::new(source),
    }
}
