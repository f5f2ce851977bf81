//! PostgreSQL implementations of the `lpms-core` collaborator traits.

use async_trait::async_trait;
use lpms_core::analysis::{AnalysisFilter, StatusCountRow};
use lpms_core::error::CoreError;
use lpms_core::objects::{Deletion, NewObject, ObjectContent, ObjectStore, StoredObject};
use lpms_core::pagination::PageRequest;
use lpms_core::reserve::{NewReserve, ReserveFilter, ReserveProject};
use lpms_core::store::{Actor, ListScope, ReserveStore, ReserveTx, UserDirectory, WindowStore};
use lpms_core::types::DbId;
use lpms_core::window::TimeWindow;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::status::decode_status;
use crate::persistence;
use crate::repositories::{ObjectRepo, ReserveRepo, UserRepo, WindowRepo};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Record store over the `reserve_projects` table.
#[derive(Clone)]
pub struct PgReserveStore {
    pool: PgPool,
}

impl PgReserveStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReserveStore for PgReserveStore {
    async fn begin(&self) -> Result<Box<dyn ReserveTx>, CoreError> {
        let tx = self.pool.begin().await.map_err(persistence)?;
        Ok(Box::new(PgReserveTx { tx }))
    }

    async fn get(&self, id: DbId) -> Result<Option<ReserveProject>, CoreError> {
        ReserveRepo::find_by_id(&self.pool, id)
            .await
            .map_err(persistence)?
            .map(ReserveProject::try_from)
            .transpose()
    }

    async fn list(
        &self,
        filter: &ReserveFilter,
        page: PageRequest,
        scope: &ListScope,
    ) -> Result<(i64, Vec<ReserveProject>), CoreError> {
        let (total, rows) = ReserveRepo::list(&self.pool, filter, scope, page.limit, page.offset)
            .await
            .map_err(persistence)?;
        let items = rows
            .into_iter()
            .map(ReserveProject::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((total, items))
    }

    async fn aggregate(&self, filter: &AnalysisFilter) -> Result<Vec<StatusCountRow>, CoreError> {
        ReserveRepo::count_by_status(&self.pool, filter)
            .await
            .map_err(persistence)?
            .into_iter()
            .map(|row| -> Result<StatusCountRow, CoreError> {
                Ok(StatusCountRow {
                    bucket: row.bucket,
                    status: decode_status(row.status_id)?,
                    count: row.count,
                })
            })
            .collect()
    }
}

/// A database transaction holding row locks taken by [`ReserveTx::lock`].
/// Dropping it without committing rolls back.
pub struct PgReserveTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ReserveTx for PgReserveTx {
    async fn insert(
        &mut self,
        input: &NewReserve,
        actor: &str,
    ) -> Result<ReserveProject, CoreError> {
        ReserveRepo::create(&mut self.tx, input, actor)
            .await
            .map_err(persistence)?
            .try_into()
    }

    async fn lock(&mut self, id: DbId) -> Result<Option<ReserveProject>, CoreError> {
        ReserveRepo::find_for_update(&mut self.tx, id)
            .await
            .map_err(persistence)?
            .map(ReserveProject::try_from)
            .transpose()
    }

    async fn save(&mut self, record: &ReserveProject) -> Result<ReserveProject, CoreError> {
        ReserveRepo::save(&mut self.tx, record)
            .await
            .map_err(persistence)?
            .ok_or_else(|| CoreError::reserve_not_found(record.id))?
            .try_into()
    }

    async fn referencing(
        &mut self,
        object_id: &str,
        except: Option<DbId>,
    ) -> Result<Option<DbId>, CoreError> {
        ReserveRepo::find_referencing(&mut self.tx, object_id, except)
            .await
            .map_err(persistence)
    }

    async fn remove(&mut self, id: DbId) -> Result<bool, CoreError> {
        ReserveRepo::delete(&mut self.tx, id)
            .await
            .map_err(persistence)
    }

    async fn commit(self: Box<Self>) -> Result<(), CoreError> {
        self.tx.commit().await.map_err(persistence)
    }
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

/// Artifact storage in the `objects` table.
///
/// Deletions run on their own connection, outside any record transaction.
#[derive(Clone)]
pub struct PgObjectStore {
    pool: PgPool,
}

impl PgObjectStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn object_error(object_id: &str, err: sqlx::Error) -> CoreError {
    tracing::error!(object_id, error = %err, "Object store error");
    CoreError::ObjectStore {
        object_id: object_id.to_string(),
        message: err.to_string(),
    }
}

#[async_trait]
impl ObjectStore for PgObjectStore {
    async fn put(&self, object: NewObject) -> Result<StoredObject, CoreError> {
        let id = uuid::Uuid::now_v7().to_string();
        let row = ObjectRepo::create(
            &self.pool,
            &id,
            &object.file_name,
            &object.content_type,
            &object.created_by,
            &object.bytes,
        )
        .await
        .map_err(|e| object_error(&id, e))?;
        Ok(row.into())
    }

    async fn get(&self, id: &str) -> Result<Option<ObjectContent>, CoreError> {
        let row = ObjectRepo::find_by_id(&self.pool, id)
            .await
            .map_err(|e| object_error(id, e))?;
        Ok(row.map(ObjectContent::from))
    }

    async fn exists(&self, id: &str) -> Result<bool, CoreError> {
        ObjectRepo::exists(&self.pool, id)
            .await
            .map_err(|e| object_error(id, e))
    }

    async fn delete(&self, id: &str) -> Result<Deletion, CoreError> {
        let removed = ObjectRepo::delete(&self.pool, id)
            .await
            .map_err(|e| object_error(id, e))?;
        Ok(if removed {
            Deletion::Removed
        } else {
            Deletion::AlreadyAbsent
        })
    }
}

// ---------------------------------------------------------------------------
// Users and windows
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find(&self, open_id: &str) -> Result<Option<Actor>, CoreError> {
        let row = UserRepo::find_by_open_id(&self.pool, open_id)
            .await
            .map_err(persistence)?;
        Ok(row.map(Actor::from))
    }
}

/// Window configuration in the `window_settings` table. Every load reads
/// the latest committed rows.
#[derive(Clone)]
pub struct PgWindowStore {
    pool: PgPool,
}

impl PgWindowStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WindowStore for PgWindowStore {
    async fn load(&self) -> Result<Vec<TimeWindow>, CoreError> {
        let rows = WindowRepo::list(&self.pool).await.map_err(persistence)?;
        Ok(rows.into_iter().map(TimeWindow::from).collect())
    }

    async fn replace(&self, windows: &[TimeWindow]) -> Result<(), CoreError> {
        WindowRepo::replace_all(&self.pool, windows)
            .await
            .map_err(persistence)
    }
}
