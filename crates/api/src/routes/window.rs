//! Route definitions for the submission window configuration.
//!
//! Mounted at `/inspect/window` by `api_routes()`.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::window;
use crate::state::AppState;

/// ```text
/// GET    /settings  -> get_window_settings
/// PUT    /setting   -> set_window_settings (admin only)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/settings", get(window::get_window_settings))
        .route("/setting", put(window::set_window_settings))
}
