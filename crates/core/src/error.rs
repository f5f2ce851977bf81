use crate::reserve::ReserveStatus;
use crate::types::DbId;

/// Stable, transport-independent classification of a [`CoreError`].
///
/// The API layer maps each kind to an HTTP status and error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidTransition,
    WindowClosed,
    InvalidWindowConfig,
    InvalidArgument,
    ObjectStore,
    Persistence,
    Unmarshal,
    UnknownActor,
    Unauthorized,
    Forbidden,
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Invalid transition for reserve project {id}: {from} -> {to}")]
    InvalidTransition {
        id: DbId,
        from: ReserveStatus,
        to: ReserveStatus,
    },

    #[error("The submission window is closed")]
    WindowClosed,

    #[error("Invalid window configuration: {0}")]
    InvalidWindowConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Object store error for object '{object_id}': {message}")]
    ObjectStore { object_id: String, message: String },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Unmarshal error: {0}")]
    Unmarshal(String),

    #[error("Unknown actor: {0}")]
    UnknownActor(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A bulk operation stopped at `failed_id`. The `completed` records that
    /// precede it in the id list stay applied.
    #[error("Bulk operation stopped at id {failed_id} after {completed} record(s): {source}")]
    BulkAborted {
        failed_id: DbId,
        completed: usize,
        #[source]
        source: Box<CoreError>,
    },
}

impl CoreError {
    /// The stable kind of this error. A [`CoreError::BulkAborted`] reports the
    /// kind of the per-record failure that stopped it.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            CoreError::WindowClosed => ErrorKind::WindowClosed,
            CoreError::InvalidWindowConfig(_) => ErrorKind::InvalidWindowConfig,
            CoreError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            CoreError::ObjectStore { .. } => ErrorKind::ObjectStore,
            CoreError::Persistence(_) => ErrorKind::Persistence,
            CoreError::Unmarshal(_) => ErrorKind::Unmarshal,
            CoreError::UnknownActor(_) => ErrorKind::UnknownActor,
            CoreError::Unauthorized(_) => ErrorKind::Unauthorized,
            CoreError::Forbidden(_) => ErrorKind::Forbidden,
            CoreError::BulkAborted { source, .. } => source.kind(),
        }
    }

    /// Shorthand for a missing reserve project.
    pub fn reserve_not_found(id: DbId) -> Self {
        CoreError::NotFound {
            entity: "ReserveProject",
            id,
        }
    }
}
