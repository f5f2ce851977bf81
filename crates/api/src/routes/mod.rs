pub mod health;
pub mod objects;
pub mod reserve;
pub mod window;

use axum::Router;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /reserves        reserve records, transitions, bulk operations, analysis
/// /inspect/window  submission window configuration
/// /objects         artifact upload and download
/// ```
pub fn api_routes(config: &ServerConfig) -> Router<AppState> {
    Router::new()
        .nest("/reserves", reserve::router())
        .nest("/inspect/window", window::router())
        .nest("/objects", objects::router(config.max_upload_bytes))
}
