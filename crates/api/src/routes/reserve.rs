//! Route definitions for reserve project records.
//!
//! Mounted at `/reserves` by `api_routes()`. Static segments (`batch`,
//! `analysis`) take precedence over `{id}`.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::reserve;
use crate::state::AppState;

/// Reserve project routes.
///
/// ```text
/// POST   /                    -> create_reserve
/// GET    /                    -> list_reserves
/// GET    /analysis            -> data_analysis
/// DELETE /batch?ids=          -> multi_delete_reserves
/// POST   /batch/submission    -> multi_submission
/// GET    /{id}                -> get_reserve
/// PUT    /{id}                -> update_reserve
/// DELETE /{id}                -> delete_reserve
/// POST   /{id}/refer          -> refer
/// POST   /{id}/submission     -> submission
/// POST   /{id}/out-storage    -> out_storage
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(reserve::create_reserve).get(reserve::list_reserves),
        )
        .route("/analysis", get(reserve::data_analysis))
        .route("/batch", delete(reserve::multi_delete_reserves))
        .route("/batch/submission", post(reserve::multi_submission))
        .route(
            "/{id}",
            get(reserve::get_reserve)
                .put(reserve::update_reserve)
                .delete(reserve::delete_reserve),
        )
        .route("/{id}/refer", post(reserve::refer))
        .route("/{id}/submission", post(reserve::submission))
        .route("/{id}/out-storage", post(reserve::out_storage))
}
