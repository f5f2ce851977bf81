//! In-process implementations of the collaborator traits.
//!
//! Units of work on [`MemoryReserveStore`] are serialized: `begin` takes the
//! table lock and holds it until the unit of work is committed or dropped.
//! Used by the test suites and for running the API without a database.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::analysis::{bucket_label, AnalysisFilter, StatusCountRow};
use crate::error::CoreError;
use crate::lifecycle::LifecycleEngine;
use crate::objects::{Deletion, NewObject, ObjectContent, ObjectStore, StoredObject};
use crate::pagination::PageRequest;
use crate::reserve::{NewReserve, ReserveFilter, ReserveProject, ReserveStatus};
use crate::store::{Actor, ListScope, ReserveStore, ReserveTx, UserDirectory, WindowStore};
use crate::types::DbId;
use crate::window::TimeWindow;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct ReserveTable {
    last_id: DbId,
    rows: BTreeMap<DbId, ReserveProject>,
}

/// Record store backed by a `BTreeMap`.
#[derive(Clone, Default)]
pub struct MemoryReserveStore {
    table: Arc<Mutex<ReserveTable>>,
}

impl MemoryReserveStore {
    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.table.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ReserveStore for MemoryReserveStore {
    async fn begin(&self) -> Result<Box<dyn ReserveTx>, CoreError> {
        let guard = Arc::clone(&self.table).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryReserveTx { guard, working }))
    }

    async fn get(&self, id: DbId) -> Result<Option<ReserveProject>, CoreError> {
        Ok(self.table.lock().await.rows.get(&id).cloned())
    }

    async fn list(
        &self,
        filter: &ReserveFilter,
        page: PageRequest,
        scope: &ListScope,
    ) -> Result<(i64, Vec<ReserveProject>), CoreError> {
        let table = self.table.lock().await;
        let mut matching: Vec<ReserveProject> = table
            .rows
            .values()
            .filter(|r| scope.allows(r) && filter.matches(r))
            .cloned()
            .collect();
        matching.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect();
        Ok((total, items))
    }

    async fn aggregate(&self, filter: &AnalysisFilter) -> Result<Vec<StatusCountRow>, CoreError> {
        let table = self.table.lock().await;
        let mut counts: BTreeMap<(String, ReserveStatus), i64> = BTreeMap::new();
        for record in table.rows.values() {
            if filter.from.is_some_and(|from| record.created_at < from)
                || filter.to.is_some_and(|to| record.created_at >= to)
                || filter
                    .project_type
                    .as_deref()
                    .is_some_and(|t| record.project_type != t)
                || filter.level.as_deref().is_some_and(|l| record.level != l)
            {
                continue;
            }
            let key = (bucket_label(filter.group_by, record), record.status);
            *counts.entry(key).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|((bucket, status), count)| StatusCountRow {
                bucket,
                status,
                count,
            })
            .collect())
    }
}

struct MemoryReserveTx {
    guard: OwnedMutexGuard<ReserveTable>,
    working: ReserveTable,
}

#[async_trait]
impl ReserveTx for MemoryReserveTx {
    async fn insert(
        &mut self,
        input: &NewReserve,
        actor: &str,
    ) -> Result<ReserveProject, CoreError> {
        self.working.last_id += 1;
        let now = Utc::now();
        let record = ReserveProject {
            id: self.working.last_id,
            name: input.name.clone(),
            level: input.level.clone(),
            project_type: input.project_type.clone(),
            construct_subject: input.construct_subject.clone(),
            status: ReserveStatus::Draft,
            site_photo: input.site_photo.clone(),
            upload_cad_id: input.upload_cad_id.clone(),
            is_case_finish: false,
            is_research: false,
            created_by: actor.to_string(),
            updated_by: actor.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.working.rows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn lock(&mut self, id: DbId) -> Result<Option<ReserveProject>, CoreError> {
        Ok(self.working.rows.get(&id).cloned())
    }

    async fn save(&mut self, record: &ReserveProject) -> Result<ReserveProject, CoreError> {
        let row = self
            .working
            .rows
            .get_mut(&record.id)
            .ok_or_else(|| CoreError::reserve_not_found(record.id))?;
        *row = ReserveProject {
            updated_at: Utc::now(),
            created_at: row.created_at,
            created_by: row.created_by.clone(),
            ..record.clone()
        };
        Ok(row.clone())
    }

    async fn referencing(
        &mut self,
        object_id: &str,
        except: Option<DbId>,
    ) -> Result<Option<DbId>, CoreError> {
        Ok(self
            .working
            .rows
            .values()
            .find(|r| Some(r.id) != except && r.artifact_refs().holds(object_id))
            .map(|r| r.id))
    }

    async fn remove(&mut self, id: DbId) -> Result<bool, CoreError> {
        Ok(self.working.rows.remove(&id).is_some())
    }

    async fn commit(self: Box<Self>) -> Result<(), CoreError> {
        let MemoryReserveTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ObjectTable {
    objects: HashMap<String, ObjectContent>,
    failing: HashSet<String>,
}

/// Object store backed by a `HashMap`, with failure injection for deletes.
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    inner: Arc<Mutex<ObjectTable>>,
}

impl MemoryObjectStore {
    /// Store an empty object named `file_name` and return its id.
    pub async fn seed(&self, file_name: &str) -> String {
        let mut table = self.inner.lock().await;
        let meta = new_meta(file_name, "application/octet-stream", "seed", 0);
        let id = meta.id.clone();
        table.objects.insert(
            id.clone(),
            ObjectContent {
                meta,
                bytes: Vec::new(),
            },
        );
        id
    }

    /// Make every later deletion of `id` fail.
    pub async fn fail_deletes_of(&self, id: &str) {
        self.inner.lock().await.failing.insert(id.to_string());
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.objects.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn new_meta(file_name: &str, content_type: &str, created_by: &str, size: usize) -> StoredObject {
    StoredObject {
        id: uuid::Uuid::now_v7().to_string(),
        file_name: file_name.to_string(),
        content_type: content_type.to_string(),
        size_bytes: size as i64,
        created_by: created_by.to_string(),
        created_at: Utc::now(),
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, object: NewObject) -> Result<StoredObject, CoreError> {
        let meta = new_meta(
            &object.file_name,
            &object.content_type,
            &object.created_by,
            object.bytes.len(),
        );
        self.inner.lock().await.objects.insert(
            meta.id.clone(),
            ObjectContent {
                meta: meta.clone(),
                bytes: object.bytes,
            },
        );
        Ok(meta)
    }

    async fn get(&self, id: &str) -> Result<Option<ObjectContent>, CoreError> {
        Ok(self.inner.lock().await.objects.get(id).cloned())
    }

    async fn exists(&self, id: &str) -> Result<bool, CoreError> {
        Ok(self.inner.lock().await.objects.contains_key(id))
    }

    async fn delete(&self, id: &str) -> Result<Deletion, CoreError> {
        let mut table = self.inner.lock().await;
        if table.failing.contains(id) {
            return Err(CoreError::ObjectStore {
                object_id: id.to_string(),
                message: "injected delete failure".into(),
            });
        }
        Ok(match table.objects.remove(id) {
            Some(_) => Deletion::Removed,
            None => Deletion::AlreadyAbsent,
        })
    }
}

// ---------------------------------------------------------------------------
// Users and windows
// ---------------------------------------------------------------------------

/// User directory backed by a `HashMap` of identity to admin flag.
#[derive(Clone, Default)]
pub struct MemoryUserDirectory {
    users: Arc<RwLock<HashMap<String, bool>>>,
}

impl MemoryUserDirectory {
    pub async fn insert(&self, open_id: &str, is_admin: bool) {
        self.users.write().await.insert(open_id.to_string(), is_admin);
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find(&self, open_id: &str) -> Result<Option<Actor>, CoreError> {
        Ok(self.users.read().await.get(open_id).map(|&is_admin| Actor {
            open_id: open_id.to_string(),
            is_admin,
        }))
    }
}

/// Window store holding the configuration in memory.
#[derive(Clone, Default)]
pub struct MemoryWindowStore {
    windows: Arc<RwLock<Vec<TimeWindow>>>,
}

#[async_trait]
impl WindowStore for MemoryWindowStore {
    async fn load(&self) -> Result<Vec<TimeWindow>, CoreError> {
        Ok(self.windows.read().await.clone())
    }

    async fn replace(&self, windows: &[TimeWindow]) -> Result<(), CoreError> {
        *self.windows.write().await = windows.to_vec();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// All in-memory collaborators, sharing state across clones.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    pub reserves: MemoryReserveStore,
    pub objects: MemoryObjectStore,
    pub users: MemoryUserDirectory,
    pub windows: MemoryWindowStore,
}

impl MemoryBackend {
    /// A lifecycle engine wired to these collaborators.
    pub fn engine(&self) -> LifecycleEngine {
        LifecycleEngine::new(
            Arc::new(self.reserves.clone()),
            Arc::new(self.objects.clone()),
            Arc::new(self.users.clone()),
            Arc::new(self.windows.clone()),
        )
    }
}

/// A `Draft` record owned by `owner`, for unit tests.
#[cfg(test)]
pub(crate) fn sample_record(id: DbId, owner: &str) -> ReserveProject {
    let now = Utc::now();
    ReserveProject {
        id,
        name: format!("Project {id}"),
        level: "municipal".into(),
        project_type: "water".into(),
        construct_subject: "district".into(),
        status: ReserveStatus::Draft,
        site_photo: None,
        upload_cad_id: None,
        is_case_finish: false,
        is_research: false,
        created_by: owner.into(),
        updated_by: owner.into(),
        created_at: now,
        updated_at: now,
    }
}
