use std::sync::Arc;

use lpms_core::lifecycle::LifecycleEngine;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// The lifecycle engine and its collaborators.
    pub engine: Arc<LifecycleEngine>,
    /// Database pool, used for health reporting. `None` when the engine runs
    /// on in-memory collaborators.
    pub pool: Option<lpms_db::DbPool>,
    /// Server configuration (accessed by middleware and handlers).
    pub config: Arc<ServerConfig>,
}
