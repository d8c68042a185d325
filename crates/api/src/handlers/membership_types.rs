//! Handlers for the `/membership-types` resource (fee plans).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use clubhouse_core::error::CoreError;
use clubhouse_core::types::DbId;
use clubhouse_db::models::membership_type::{
    CreateMembershipType, MembershipType, UpdateMembershipType,
};
use clubhouse_db::repositories::MembershipTypeRepo;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::query::IncludeInactiveParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/membership-types
pub async fn list_membership_types(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(params): Query<IncludeInactiveParams>,
) -> AppResult<Json<DataResponse<Vec<MembershipType>>>> {
    let types = MembershipTypeRepo::list(&state.pool, params.include_inactive).await?;
    Ok(Json(DataResponse { data: types }))
}

/// GET /api/v1/membership-types/{id}
pub async fn get_membership_type(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<MembershipType>>> {
    let membership_type = MembershipTypeRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "MembershipType",
            id,
        }))?;
    Ok(Json(DataResponse {
        data: membership_type,
    }))
}

/// POST /api/v1/membership-types
pub async fn create_membership_type(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(input): Json<CreateMembershipType>,
) -> AppResult<(StatusCode, Json<DataResponse<MembershipType>>)> {
    input.validate()?;
    let membership_type = MembershipTypeRepo::create(&state.pool, &input).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: membership_type,
        }),
    ))
}

/// PUT /api/v1/membership-types/{id}
pub async fn update_membership_type(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateMembershipType>,
) -> AppResult<Json<DataResponse<MembershipType>>> {
    input.validate()?;
    let membership_type = MembershipTypeRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "MembershipType",
            id,
        }))?;
    Ok(Json(DataResponse {
        data: membership_type,
    }))
}

/// DELETE /api/v1/membership-types/{id}
///
/// Soft-deactivates; existing memberships keep their plan.
pub async fn deactivate_membership_type(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let deactivated = MembershipTypeRepo::deactivate(&state.pool, id).await?;
    if !deactivated {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "MembershipType",
            id,
        }));
    }
    Ok(StatusCode::NO_CONTENT)
}
