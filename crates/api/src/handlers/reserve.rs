//! Handlers for reserve project records.
//!
//! Every endpoint requires authentication. State changes go through the
//! lifecycle engine; bulk endpoints go through the bulk coordinator and are
//! fail-fast without rollback.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use lpms_core::analysis::AnalysisFilter;
use lpms_core::bulk::BulkCoordinator;
use lpms_core::reserve::{NewReserve, ReservePatch, TransitionFlags};
use lpms_core::types::DbId;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::{IdsParams, ReserveListParams};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// POST /reserves
pub async fn create_reserve(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<NewReserve>,
) -> AppResult<impl IntoResponse> {
    let record = state.engine.create(&auth.open_id, input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: record })))
}

/// GET /reserves
///
/// Administrators see every record; everyone else sees their own.
pub async fn list_reserves(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ReserveListParams>,
) -> AppResult<impl IntoResponse> {
    let (filter, page) = params.into_parts()?;
    let result = state.engine.list(&auth.open_id, &filter, page).await?;
    Ok(Json(DataResponse { data: result }))
}

/// GET /reserves/{id}
pub async fn get_reserve(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let record = state.engine.get(id).await?;
    Ok(Json(DataResponse { data: record }))
}

/// PUT /reserves/{id}
///
/// Replaced or cleared artifacts are deleted before the record is written.
pub async fn update_reserve(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(patch): Json<ReservePatch>,
) -> AppResult<impl IntoResponse> {
    let record = state.engine.update(&auth.open_id, id, patch).await?;
    Ok(Json(DataResponse { data: record }))
}

/// DELETE /reserves/{id}
pub async fn delete_reserve(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.engine.delete(&auth.open_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /reserves/batch?ids=1,2,3
pub async fn multi_delete_reserves(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<IdsParams>,
) -> AppResult<impl IntoResponse> {
    let outcome = BulkCoordinator::new(&state.engine)
        .multi_delete(&auth.open_id, &params.ids)
        .await?;
    Ok(Json(DataResponse { data: outcome }))
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// POST /reserves/{id}/refer
pub async fn refer(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let record = state.engine.refer(&auth.open_id, id).await?;
    Ok(Json(DataResponse { data: record }))
}

/// POST /reserves/{id}/submission
pub async fn submission(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(flags): Json<TransitionFlags>,
) -> AppResult<impl IntoResponse> {
    let record = state.engine.submission(&auth.open_id, id, flags).await?;
    Ok(Json(DataResponse { data: record }))
}

/// POST /reserves/batch/submission?ids=1,2,3
pub async fn multi_submission(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<IdsParams>,
) -> AppResult<impl IntoResponse> {
    let outcome = BulkCoordinator::new(&state.engine)
        .multi_submission(&auth.open_id, &params.ids)
        .await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /reserves/{id}/out-storage
pub async fn out_storage(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(flags): Json<TransitionFlags>,
) -> AppResult<impl IntoResponse> {
    let record = state.engine.out_storage(&auth.open_id, id, flags).await?;
    Ok(Json(DataResponse { data: record }))
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// GET /reserves/analysis?group_by=&from=&to=&project_type=&level=
pub async fn data_analysis(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<AnalysisFilter>,
) -> AppResult<impl IntoResponse> {
    let buckets = state.engine.data_analysis(&filter).await?;
    Ok(Json(DataResponse { data: buckets }))
}
