//! Handlers for the `/spaces` resource (bookable club spaces).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveTime;
use clubhouse_core::error::CoreError;
use clubhouse_core::types::DbId;
use clubhouse_db::models::space::{CreateSpace, Space, UpdateSpace};
use clubhouse_db::repositories::SpaceRepo;
use clubhouse_db::DbPool;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::query::IncludeInactiveParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/spaces
pub async fn list_spaces(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(params): Query<IncludeInactiveParams>,
) -> AppResult<Json<DataResponse<Vec<Space>>>> {
    let spaces = SpaceRepo::list(&state.pool, params.include_inactive).await?;
    Ok(Json(DataResponse { data: spaces }))
}

/// GET /api/v1/spaces/{id}
pub async fn get_space(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Space>>> {
    let space = find_space(&state.pool, id).await?;
    Ok(Json(DataResponse { data: space }))
}

/// POST /api/v1/spaces
pub async fn create_space(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(input): Json<CreateSpace>,
) -> AppResult<(StatusCode, Json<DataResponse<Space>>)> {
    input.validate()?;
    if let (Some(opens), Some(closes)) = (input.opens_at, input.closes_at) {
        ensure_hours(opens, closes)?;
    }
    let space = SpaceRepo::create(&state.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: space })))
}

/// PUT /api/v1/spaces/{id}
pub async fn update_space(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateSpace>,
) -> AppResult<Json<DataResponse<Space>>> {
    input.validate()?;

    let current = find_space(&state.pool, id).await?;
    ensure_hours(
        input.opens_at.unwrap_or(current.opens_at),
        input.closes_at.unwrap_or(current.closes_at),
    )?;

    let space = SpaceRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Space", id }))?;
    Ok(Json(DataResponse { data: space }))
}

/// DELETE /api/v1/spaces/{id}
///
/// Soft-deactivates; existing reservations are kept.
pub async fn deactivate_space(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let deactivated = SpaceRepo::deactivate(&state.pool, id).await?;
    if !deactivated {
        return Err(AppError::Core(CoreError::NotFound { entity: "Space", id }));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn find_space(pool: &DbPool, id: DbId) -> AppResult<Space> {
    SpaceRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Space", id }))
}

fn ensure_hours(opens_at: NaiveTime, closes_at: NaiveTime) -> AppResult<()> {
    if opens_at >= closes_at {
        return Err(AppError::Core(CoreError::Validation(
            "opens_at must be before closes_at".into(),
        )));
    }
    Ok(())
}
