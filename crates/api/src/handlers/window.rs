//! Handlers for the submission window configuration.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use lpms_core::window::TimeWindow;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for replacing the window configuration.
#[derive(Debug, Deserialize)]
pub struct WindowSettingsInput {
    pub windows: Vec<TimeWindow>,
}

/// GET /inspect/window/settings
pub async fn get_window_settings(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let windows = state.engine.window_settings().await?;
    Ok(Json(DataResponse { data: windows }))
}

/// PUT /inspect/window/setting
///
/// Replaces the whole configuration. Administrators only; an empty list
/// closes the gate.
pub async fn set_window_settings(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<WindowSettingsInput>,
) -> AppResult<impl IntoResponse> {
    let windows = state
        .engine
        .set_window_settings(&auth.open_id, &input.windows)
        .await?;
    Ok(Json(DataResponse { data: windows }))
}
