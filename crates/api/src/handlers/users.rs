//! Handlers for the `/users` resource (club members and dependents).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use clubhouse_core::error::CoreError;
use clubhouse_core::membership::{ensure_active, validate_relationship, RELATIONSHIP_TITULAR};
use clubhouse_core::types::DbId;
use clubhouse_db::models::user::{CreateUser, UpdateUser, User, UserListParams};
use clubhouse_db::repositories::{MembershipTypeRepo, UserRepo};
use clubhouse_db::DbPool;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::access::{linked_user, load_membership, membership_state};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireStaff;
use crate::query::page;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/users
///
/// Filter by membership, search by name or document number.
pub async fn list_users(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Query(params): Query<UserListParams>,
) -> AppResult<Json<DataResponse<Vec<User>>>> {
    let (limit, offset) = page(params.limit, params.offset);
    let users = UserRepo::list(&state.pool, &params, limit, offset).await?;
    Ok(Json(DataResponse { data: users }))
}

/// POST /api/v1/users
pub async fn create_user(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Json(input): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<DataResponse<User>>)> {
    input.validate()?;
    let user = create_member(&state.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: user })))
}

/// GET /api/v1/users/me
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<User>>> {
    let user = linked_user(&state.pool, &auth).await?;
    Ok(Json(DataResponse { data: user }))
}

/// GET /api/v1/users/{id}
///
/// Staff see anyone; members see people on their own membership.
pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<User>>> {
    let user = find_user(&state.pool, id).await?;

    if !auth.is_staff() {
        let me = linked_user(&state.pool, &auth).await?;
        let same_membership = me.membership_id.is_some() && me.membership_id == user.membership_id;
        if me.id != user.id && !same_membership {
            return Err(AppError::Core(CoreError::Forbidden(
                "You do not have access to this user".into(),
            )));
        }
    }

    Ok(Json(DataResponse { data: user }))
}

/// PUT /api/v1/users/{id}
///
/// Members may edit their own contact data only.
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateUser>,
) -> AppResult<Json<DataResponse<User>>> {
    input.validate()?;

    if !auth.is_staff() {
        let me = linked_user(&state.pool, &auth).await?;
        if me.id != id {
            return Err(AppError::Core(CoreError::Forbidden(
                "You can only update your own profile".into(),
            )));
        }
        if input.relationship.is_some() || input.is_active.is_some() {
            return Err(AppError::Core(CoreError::Forbidden(
                "Only staff can change relationship or active status".into(),
            )));
        }
    }

    if let Some(relationship) = input.relationship.as_deref() {
        validate_relationship(relationship)?;
    }

    let user = UserRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;

    Ok(Json(DataResponse { data: user }))
}

/// DELETE /api/v1/users/{id}
pub async fn deactivate_user(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let deactivated = UserRepo::deactivate(&state.pool, id).await?;
    if !deactivated {
        return Err(AppError::Core(CoreError::NotFound { entity: "User", id }));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) async fn find_user(pool: &DbPool, id: DbId) -> AppResult<User> {
    UserRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))
}

/// Insert a user, enforcing membership rules when one is given.
///
/// Dependents need an active membership with a free slot under its plan.
pub(crate) async fn create_member(pool: &DbPool, input: &CreateUser) -> AppResult<User> {
    let relationship = input.relationship.as_deref().unwrap_or(RELATIONSHIP_TITULAR);
    validate_relationship(relationship)?;

    let mut dependent_cap = None;
    if let Some(membership_id) = input.membership_id {
        let membership = load_membership(pool, membership_id).await?;
        ensure_active(membership_state(&membership)?)?;

        if relationship != RELATIONSHIP_TITULAR {
            let plan = MembershipTypeRepo::find_by_id(pool, membership.membership_type_id)
                .await?
                .ok_or(AppError::Core(CoreError::NotFound {
                    entity: "MembershipType",
                    id: membership.membership_type_id,
                }))?;
            dependent_cap = Some((membership_id, plan.max_dependents));
        }
    } else if relationship != RELATIONSHIP_TITULAR {
        return Err(AppError::Core(CoreError::Validation(
            "Dependents must belong to a membership".into(),
        )));
    }

    if UserRepo::find_by_document(pool, &input.document_number)
        .await?
        .is_some()
    {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "A user with document number {} already exists",
            input.document_number
        ))));
    }

    let user = match dependent_cap {
        Some((membership_id, max_dependents)) => {
            UserRepo::create_dependent(pool, input, membership_id, max_dependents)
                .await?
                .ok_or_else(|| {
                    AppError::Core(CoreError::Conflict(format!(
                        "Membership already has the maximum of {max_dependents} dependent(s)"
                    )))
                })?
        }
        None => UserRepo::create(pool, input).await?,
    };
    tracing::info!(
        user_id = user.id,
        membership_id = ?user.membership_id,
        relationship = %user.relationship,
        "User created"
    );
    Ok(user)
}
