//! Handlers for the `/member-requests` resource (suspension,
//! disaffiliation and reactivation requests).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use clubhouse_core::billing::devolution_cents;
use clubhouse_core::error::CoreError;
use clubhouse_core::membership::{plan_transition, MembershipAction, TransitionContext};
use clubhouse_core::status::RequestStatus;
use clubhouse_core::types::DbId;
use clubhouse_db::models::change_request::{
    ChangeRequestListParams, CreateChangeRequest, MemberChangeRequest,
};
use clubhouse_db::models::membership::Membership;
use clubhouse_db::repositories::change_request_repo::{NewChangeRequest, Review};
use clubhouse_db::repositories::membership_repo::StateChange;
use clubhouse_db::repositories::{BillRepo, ChangeRequestRepo, ClubConfigRepo};
use clubhouse_db::DbPool;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::access::{
    ensure_membership_access, load_membership, membership_state, own_membership_id, today,
};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::query::page;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for approve / reject.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewRequest {
    pub review_notes: Option<String>,
}

/// Result of an approved request.
#[derive(Debug, Serialize)]
pub struct ApprovedChange {
    pub request: MemberChangeRequest,
    pub membership: Membership,
}

/// POST /api/v1/member-requests
///
/// Members file for their own membership; staff must name one.
pub async fn create_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateChangeRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<MemberChangeRequest>>)> {
    input.validate()?;
    let action = MembershipAction::from_request_kind(&input.kind)?;

    let membership_id = if auth.is_staff() {
        input.membership_id.ok_or_else(|| {
            AppError::Core(CoreError::Validation("membership_id is required".into()))
        })?
    } else {
        let own = own_membership_id(&state.pool, &auth).await?;
        if input.membership_id.is_some_and(|id| id != own) {
            return Err(AppError::Core(CoreError::Forbidden(
                "You can only file requests for your own membership".into(),
            )));
        }
        own
    };

    let membership = load_membership(&state.pool, membership_id).await?;

    // Overdue bills only block the reactivation itself, at approval.
    plan_transition(
        TransitionContext {
            state: membership_state(&membership)?,
            overdue_bills: 0,
            suspend_until: input.suspend_until,
            today: today(),
        },
        action,
    )?;

    let request = ChangeRequestRepo::create(
        &state.pool,
        &NewChangeRequest {
            membership_id,
            requested_by: auth.account_id,
            kind: input.kind.clone(),
            reason: input.reason.trim().to_string(),
            suspend_until: input.suspend_until,
        },
    )
    .await?;

    tracing::info!(
        request_id = request.id,
        membership_id,
        kind = %request.kind,
        "Member change request filed"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: request })))
}

/// GET /api/v1/member-requests
///
/// Members only see requests for their own membership.
pub async fn list_requests(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ChangeRequestListParams>,
) -> AppResult<Json<DataResponse<Vec<MemberChangeRequest>>>> {
    let (limit, offset) = page(params.limit, params.offset);
    let params = if auth.is_staff() {
        params
    } else {
        ChangeRequestListParams {
            membership_id: Some(own_membership_id(&state.pool, &auth).await?),
            ..params
        }
    };
    let requests = ChangeRequestRepo::list(&state.pool, &params, limit, offset).await?;
    Ok(Json(DataResponse { data: requests }))
}

/// GET /api/v1/member-requests/{id}
pub async fn get_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<MemberChangeRequest>>> {
    let request = find_request(&state.pool, id).await?;
    ensure_membership_access(&state.pool, &auth, request.membership_id).await?;
    Ok(Json(DataResponse { data: request }))
}

/// POST /api/v1/member-requests/{id}/approve
///
/// Applies the transition. A disaffiliation records the devolution owed on
/// the paid admission fee.
pub async fn approve_request(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    body: Option<Json<ReviewRequest>>,
) -> AppResult<Json<DataResponse<ApprovedChange>>> {
    let input = body.map(|Json(review)| review).unwrap_or_default();
    let request = find_pending(&state.pool, id).await?;
    let action = MembershipAction::from_request_kind(&request.kind)?;

    let membership = load_membership(&state.pool, request.membership_id).await?;
    let from = membership_state(&membership)?;
    let overdue_bills = BillRepo::count_overdue(&state.pool, membership.id).await?;

    let to = plan_transition(
        TransitionContext {
            state: from,
            overdue_bills,
            suspend_until: request.suspend_until,
            today: today(),
        },
        action,
    )?;

    let devolution = if action == MembershipAction::Disaffiliate {
        let config = ClubConfigRepo::get(&state.pool).await?;
        let paid = BillRepo::paid_admission_cents(&state.pool, membership.id).await?;
        devolution_cents(paid, config.devolution_rate_percent)
    } else {
        0
    };

    let review = Review {
        reviewed_by: admin.account_id,
        review_notes: input.review_notes.as_deref(),
    };
    let change = StateChange {
        from,
        to,
        suspended_until: request.suspend_until.filter(|_| action == MembershipAction::Suspend),
        reason: Some(request.reason.as_str()),
    };

    let (request, membership) =
        ChangeRequestRepo::approve(&state.pool, id, &review, &change, devolution)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::Conflict(format!(
                    "Request {id} is no longer pending or the membership state changed"
                )))
            })?;

    tracing::info!(
        request_id = id,
        membership_id = membership.id,
        from = %from,
        to = %to,
        devolution_cents = devolution,
        "Membership transitioned"
    );

    Ok(Json(DataResponse {
        data: ApprovedChange {
            request,
            membership,
        },
    }))
}

/// POST /api/v1/member-requests/{id}/reject
pub async fn reject_request(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    body: Option<Json<ReviewRequest>>,
) -> AppResult<Json<DataResponse<MemberChangeRequest>>> {
    let input = body.map(|Json(review)| review).unwrap_or_default();
    find_pending(&state.pool, id).await?;

    let review = Review {
        reviewed_by: admin.account_id,
        review_notes: input.review_notes.as_deref(),
    };
    let request = ChangeRequestRepo::reject(&state.pool, id, &review)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(format!(
                "Request {id} is no longer pending"
            )))
        })?;

    Ok(Json(DataResponse { data: request }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_request(pool: &DbPool, id: DbId) -> AppResult<MemberChangeRequest> {
    ChangeRequestRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "MemberChangeRequest",
            id,
        }))
}

async fn find_pending(pool: &DbPool, id: DbId) -> AppResult<MemberChangeRequest> {
    let request = find_request(pool, id).await?;
    if request.status_id != RequestStatus::Pending.id() {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Request {id} is no longer pending"
        ))));
    }
    Ok(request)
}
