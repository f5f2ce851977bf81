//! Collaborator contracts the lifecycle engine relies on.
//!
//! The engine never talks to a database directly. The `lpms-db` crate
//! implements these traits on PostgreSQL; [`crate::memory`] provides
//! in-process implementations.

use async_trait::async_trait;

use crate::analysis::{AnalysisFilter, StatusCountRow};
use crate::error::CoreError;
use crate::pagination::PageRequest;
use crate::reserve::{NewReserve, ReserveFilter, ReserveProject};
use crate::types::DbId;
use crate::window::TimeWindow;

/// A caller identity together with its administrator flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub open_id: String,
    pub is_admin: bool,
}

impl Actor {
    /// The listing scope this actor is entitled to.
    pub fn list_scope(&self) -> ListScope {
        if self.is_admin {
            ListScope::All
        } else {
            ListScope::OwnedBy(self.open_id.clone())
        }
    }
}

/// Which records a listing may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListScope {
    All,
    OwnedBy(String),
}

impl ListScope {
    pub fn allows(&self, record: &ReserveProject) -> bool {
        match self {
            ListScope::All => true,
            ListScope::OwnedBy(owner) => &record.created_by == owner,
        }
    }
}

/// Record persistence.
#[async_trait]
pub trait ReserveStore: Send + Sync {
    /// Open a unit of work. Dropping it without [`ReserveTx::commit`] rolls
    /// every change back.
    async fn begin(&self) -> Result<Box<dyn ReserveTx>, CoreError>;

    /// Read a record outside any unit of work.
    async fn get(&self, id: DbId) -> Result<Option<ReserveProject>, CoreError>;

    /// Count and fetch one page of records, ordered by `created_at DESC, id DESC`.
    async fn list(
        &self,
        filter: &ReserveFilter,
        page: PageRequest,
        scope: &ListScope,
    ) -> Result<(i64, Vec<ReserveProject>), CoreError>;

    /// Grouped `(bucket, status, count)` rows, ordered by bucket then status.
    async fn aggregate(&self, filter: &AnalysisFilter) -> Result<Vec<StatusCountRow>, CoreError>;
}

/// A unit of work over the record table.
#[async_trait]
pub trait ReserveTx: Send {
    /// Insert a new `Draft` record owned by `actor`.
    async fn insert(&mut self, input: &NewReserve, actor: &str)
        -> Result<ReserveProject, CoreError>;

    /// Read a record and hold it against concurrent writers until the unit
    /// of work ends.
    async fn lock(&mut self, id: DbId) -> Result<Option<ReserveProject>, CoreError>;

    /// Write every mutable column of `record`, returning the stored row.
    async fn save(&mut self, record: &ReserveProject) -> Result<ReserveProject, CoreError>;

    /// Hold the claim on `object_id` until the unit of work ends and return
    /// the id of a record other than `except` that already references it.
    async fn referencing(
        &mut self,
        object_id: &str,
        except: Option<DbId>,
    ) -> Result<Option<DbId>, CoreError>;

    /// Remove a record. Returns `false` if no row existed.
    async fn remove(&mut self, id: DbId) -> Result<bool, CoreError>;

    async fn commit(self: Box<Self>) -> Result<(), CoreError>;
}

/// Looks up caller identities.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find(&self, open_id: &str) -> Result<Option<Actor>, CoreError>;
}

/// Holds the committed window configuration.
#[async_trait]
pub trait WindowStore: Send + Sync {
    async fn load(&self) -> Result<Vec<TimeWindow>, CoreError>;

    /// Atomically replace the whole configuration.
    async fn replace(&self, windows: &[TimeWindow]) -> Result<(), CoreError>;
}
