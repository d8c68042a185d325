//! Handlers for the `/memberships` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use clubhouse_core::error::CoreError;
use clubhouse_core::membership::{
    plan_transition, MembershipAction, TransitionContext, RELATIONSHIP_TITULAR,
};
use clubhouse_core::types::DbId;
use clubhouse_db::models::bill::{Bill, BillListParams};
use clubhouse_db::models::membership::{
    AccountStatus, Membership, MembershipDetail, MembershipListParams, UpdateMembership,
};
use clubhouse_db::models::user::{CreateUser, User};
use clubhouse_db::repositories::membership_repo::StateChange;
use clubhouse_db::repositories::{
    BillRepo, ClubConfigRepo, MembershipRepo, MembershipTypeRepo, UserRepo,
};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::access::{ensure_membership_access, load_membership, membership_state, today};
use crate::handlers::users::create_member;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireAdmin, RequireStaff};
use crate::query::page;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for the direct transition endpoints.
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub reason: Option<String>,
    /// Required when suspending.
    pub suspend_until: Option<NaiveDate>,
}

/// GET /api/v1/memberships
pub async fn list_memberships(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Query(params): Query<MembershipListParams>,
) -> AppResult<Json<DataResponse<Vec<Membership>>>> {
    let (limit, offset) = page(params.limit, params.offset);
    let memberships = MembershipRepo::list(&state.pool, &params, limit, offset).await?;
    Ok(Json(DataResponse { data: memberships }))
}

/// GET /api/v1/memberships/{id}
///
/// Membership with its plan name and members (titular first).
pub async fn get_membership(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<MembershipDetail>>> {
    ensure_membership_access(&state.pool, &auth, id).await?;
    let membership = load_membership(&state.pool, id).await?;

    let membership_type_name =
        MembershipTypeRepo::find_by_id(&state.pool, membership.membership_type_id)
            .await?
            .map(|t| t.name)
            .unwrap_or_default();
    let members = UserRepo::list_by_membership(&state.pool, id).await?;

    Ok(Json(DataResponse {
        data: MembershipDetail {
            membership,
            membership_type_name,
            members,
        },
    }))
}

/// PUT /api/v1/memberships/{id}
///
/// Change the plan or the membership discount.
pub async fn update_membership(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateMembership>,
) -> AppResult<Json<DataResponse<Membership>>> {
    input.validate()?;

    if let Some(type_id) = input.membership_type_id {
        let plan = MembershipTypeRepo::find_by_id(&state.pool, type_id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "MembershipType",
                id: type_id,
            }))?;
        if !plan.is_active {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Membership type '{}' is not active",
                plan.name
            ))));
        }
    }

    let membership = MembershipRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Membership",
            id,
        }))?;
    Ok(Json(DataResponse { data: membership }))
}

/// POST /api/v1/memberships/{id}/members
///
/// Add a dependent to the membership, capped by the plan's `max_dependents`.
pub async fn add_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<DataResponse<User>>)> {
    input.validate()?;
    ensure_membership_access(&state.pool, &auth, id).await?;

    let relationship = input.relationship.clone().ok_or_else(|| {
        AppError::Core(CoreError::Validation(
            "relationship is required for a dependent".into(),
        ))
    })?;
    if relationship == RELATIONSHIP_TITULAR {
        return Err(AppError::Core(CoreError::Validation(
            "A membership has exactly one titular; add dependents only".into(),
        )));
    }

    let dependent = CreateUser {
        membership_id: Some(id),
        relationship: Some(relationship),
        // Members cannot attach login accounts to people.
        account_id: if auth.is_staff() { input.account_id } else { None },
        ..input
    };

    let user = create_member(&state.pool, &dependent).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: user })))
}

/// POST /api/v1/memberships/{id}/suspend
pub async fn suspend(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<TransitionRequest>,
) -> AppResult<Json<DataResponse<Membership>>> {
    apply_transition(&state, id, MembershipAction::Suspend, input).await
}

/// POST /api/v1/memberships/{id}/disaffiliate
pub async fn disaffiliate(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<TransitionRequest>,
) -> AppResult<Json<DataResponse<Membership>>> {
    apply_transition(&state, id, MembershipAction::Disaffiliate, input).await
}

/// POST /api/v1/memberships/{id}/reactivate
pub async fn reactivate(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<TransitionRequest>,
) -> AppResult<Json<DataResponse<Membership>>> {
    apply_transition(&state, id, MembershipAction::Reactivate, input).await
}

/// GET /api/v1/memberships/{id}/bills
pub async fn list_membership_bills(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Query(params): Query<BillListParams>,
) -> AppResult<Json<DataResponse<Vec<Bill>>>> {
    ensure_membership_access(&state.pool, &auth, id).await?;
    load_membership(&state.pool, id).await?;

    let (limit, offset) = page(params.limit, params.offset);
    let params = BillListParams {
        membership_id: Some(id),
        ..params
    };
    let bills = BillRepo::list(&state.pool, &params, limit, offset).await?;
    Ok(Json(DataResponse { data: bills }))
}

/// GET /api/v1/memberships/{id}/account-status
///
/// Pending and overdue totals plus the delinquency flag.
pub async fn account_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<AccountStatus>>> {
    ensure_membership_access(&state.pool, &auth, id).await?;
    load_membership(&state.pool, id).await?;

    let config = ClubConfigRepo::get(&state.pool).await?;
    let status = MembershipRepo::account_status(&state.pool, id, config.delinquency_threshold).await?;
    Ok(Json(DataResponse { data: status }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn apply_transition(
    state: &AppState,
    id: DbId,
    action: MembershipAction,
    input: TransitionRequest,
) -> AppResult<Json<DataResponse<Membership>>> {
    let membership = load_membership(&state.pool, id).await?;
    let from = membership_state(&membership)?;
    let overdue_bills = BillRepo::count_overdue(&state.pool, id).await?;

    let to = plan_transition(
        TransitionContext {
            state: from,
            overdue_bills,
            suspend_until: input.suspend_until,
            today: today(),
        },
        action,
    )?;

    let change = StateChange {
        from,
        to,
        suspended_until: input.suspend_until.filter(|_| action == MembershipAction::Suspend),
        reason: input.reason.as_deref(),
    };

    let updated = MembershipRepo::change_state(&state.pool, id, &change)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "Membership state changed concurrently; retry".into(),
            ))
        })?;

    tracing::info!(
        membership_id = id,
        from = %from,
        to = %to,
        "Membership transitioned"
    );

    Ok(Json(DataResponse { data: updated }))
}
