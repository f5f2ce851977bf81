//! Artifact storage contract and reference reconciliation.
//!
//! A record's artifact references must always point at live objects, and an
//! object a record stops referencing must be released. [`ObjectRefTracker`]
//! enforces both sides around updates and deletes.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::CoreError;
use crate::reserve::ArtifactRefs;
use crate::types::Timestamp;

/// Default cap on uploaded object size (20 MiB).
pub const DEFAULT_MAX_OBJECT_BYTES: usize = 20 * 1024 * 1024;

/// Metadata of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub id: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_by: String,
    pub created_at: Timestamp,
}

/// An object together with its content.
#[derive(Debug, Clone)]
pub struct ObjectContent {
    pub meta: StoredObject,
    pub bytes: Vec<u8>,
}

/// An object to be stored.
#[derive(Debug, Clone)]
pub struct NewObject {
    pub file_name: String,
    pub content_type: String,
    pub created_by: String,
    pub bytes: Vec<u8>,
}

/// Outcome of an object deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    Removed,
    AlreadyAbsent,
}

/// ID-addressable artifact storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, object: NewObject) -> Result<StoredObject, CoreError>;

    async fn get(&self, id: &str) -> Result<Option<ObjectContent>, CoreError>;

    async fn exists(&self, id: &str) -> Result<bool, CoreError>;

    /// Delete an object. Deleting an absent id is not an error.
    async fn delete(&self, id: &str) -> Result<Deletion, CoreError>;
}

/// Keeps artifact references and the object store consistent.
pub struct ObjectRefTracker<'a> {
    store: &'a dyn ObjectStore,
}

impl<'a> ObjectRefTracker<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store }
    }

    /// Release every old reference that `new` no longer holds in any slot.
    ///
    /// An id moved to another slot is kept. Stops at the first failed
    /// deletion; the caller must then discard the new record state.
    pub async fn reconcile(&self, old: &ArtifactRefs, new: &ArtifactRefs) -> Result<(), CoreError> {
        for (slot, old_id) in old.distinct() {
            if new.holds(old_id) {
                continue;
            }
            tracing::debug!(slot = slot.name(), object_id = old_id, "Releasing replaced artifact");
            self.release(old_id).await?;
        }
        Ok(())
    }

    /// Release every reference held by a record that is being destroyed.
    pub async fn release_all(&self, refs: &ArtifactRefs) -> Result<(), CoreError> {
        for (slot, id) in refs.distinct() {
            tracing::debug!(slot = slot.name(), object_id = id, "Releasing artifact");
            self.release(id).await?;
        }
        Ok(())
    }

    /// Check that every reference `new` introduces over `old` points at an
    /// existing object.
    pub async fn ensure_introduced_exist(
        &self,
        old: &ArtifactRefs,
        new: &ArtifactRefs,
    ) -> Result<(), CoreError> {
        for (slot, id) in new.introduced(old) {
            let exists = self
                .store
                .exists(id)
                .await
                .map_err(|e| object_store_error(id, e))?;
            if !exists {
                return Err(CoreError::InvalidArgument(format!(
                    "Field '{}' references unknown object '{id}'",
                    slot.name()
                )));
            }
        }
        Ok(())
    }

    async fn release(&self, id: &str) -> Result<(), CoreError> {
        match self.store.delete(id).await {
            Ok(Deletion::Removed) => Ok(()),
            Ok(Deletion::AlreadyAbsent) => {
                tracing::debug!(object_id = id, "Artifact already absent");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(object_id = id, error = %e, "Artifact deletion failed");
                Err(object_store_error(id, e))
            }
        }
    }
}

fn object_store_error(id: &str, err: CoreError) -> CoreError {
    match err {
        e @ CoreError::ObjectStore { .. } => e,
        other => CoreError::ObjectStore {
            object_id: id.to_string(),
            message: other.to_string(),
        },
    }
}
