//! Handlers for the `/membership-applications` resource.
//!
//! Submission is public. An application must name
//! [`REQUIRED_RECOMMENDERS`] titular members in good standing; the same
//! check runs again at approval since standings change while the
//! application waits.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Duration;
use clubhouse_core::billing::DEFAULT_PAYMENT_TERM_DAYS;
use clubhouse_core::error::CoreError;
use clubhouse_core::recommendation::{
    validate_recommender_ids, validate_recommenders, RecommenderSnapshot, REQUIRED_RECOMMENDERS,
};
use clubhouse_core::status::RequestStatus;
use clubhouse_core::types::DbId;
use clubhouse_db::models::application::{
    ApplicationDetail, ApplicationListParams, CreateApplication, MembershipApplication,
    NewRecommendation,
};
use clubhouse_db::models::bill::Bill;
use clubhouse_db::models::membership::Membership;
use clubhouse_db::models::user::User;
use clubhouse_db::repositories::application_repo::ApprovalPlan;
use clubhouse_db::repositories::{ApplicationRepo, ClubConfigRepo, MembershipTypeRepo, UserRepo};
use clubhouse_db::DbPool;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::access::today;
use crate::middleware::rbac::{RequireAdmin, RequireStaff};
use crate::query::page;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for approve / reject.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewRequest {
    pub review_notes: Option<String>,
}

/// Rows created by an approval.
#[derive(Debug, Serialize)]
pub struct ApprovalResponse {
    pub application: MembershipApplication,
    pub membership: Membership,
    pub titular: User,
    pub admission_bill: Option<Bill>,
}

/// POST /api/v1/membership-applications
///
/// Public. Schema validation first, then recommender eligibility.
pub async fn submit_application(
    State(state): State<AppState>,
    Json(input): Json<CreateApplication>,
) -> AppResult<(StatusCode, Json<DataResponse<ApplicationDetail>>)> {
    input.validate()?;
    validate_recommender_ids(&input.recommender_user_ids)?;

    let plan = MembershipTypeRepo::find_by_id(&state.pool, input.membership_type_id)
        .await?
        .filter(|t| t.is_active)
        .ok_or_else(|| {
            AppError::Core(CoreError::Validation(format!(
                "Membership type {} does not exist or is not active",
                input.membership_type_id
            )))
        })?;

    if UserRepo::find_by_document(&state.pool, &input.document_number)
        .await?
        .is_some()
    {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Document number {} already belongs to a member",
            input.document_number
        ))));
    }

    let snapshots = eligible_recommenders(&state.pool, &input.recommender_user_ids).await?;
    let recommendations: Vec<NewRecommendation> = snapshots
        .iter()
        .filter_map(|s| {
            s.membership_id.map(|membership_id| NewRecommendation {
                user_id: s.user_id,
                membership_id,
            })
        })
        .collect();

    let application = ApplicationRepo::create(&state.pool, &input, &recommendations).await?;
    tracing::info!(
        application_id = application.id,
        membership_type = %plan.name,
        "Membership application submitted"
    );

    let detail = load_detail(&state.pool, application.id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: detail })))
}

/// GET /api/v1/membership-applications
pub async fn list_applications(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Query(params): Query<ApplicationListParams>,
) -> AppResult<Json<DataResponse<Vec<MembershipApplication>>>> {
    let (limit, offset) = page(params.limit, params.offset);
    let applications = ApplicationRepo::list(&state.pool, &params, limit, offset).await?;
    Ok(Json(DataResponse { data: applications }))
}

/// GET /api/v1/membership-applications/{id}
pub async fn get_application(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ApplicationDetail>>> {
    let detail = load_detail(&state.pool, id).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// POST /api/v1/membership-applications/{id}/approve
///
/// Creates the membership, its titular user, and an admission bill when
/// the plan charges one.
pub async fn approve_application(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    body: Option<Json<ReviewRequest>>,
) -> AppResult<Json<DataResponse<ApprovalResponse>>> {
    let input = body.map(|Json(review)| review).unwrap_or_default();
    let application = find_pending(&state.pool, id).await?;

    let recommender_ids: Vec<DbId> = ApplicationRepo::list_recommendations(&state.pool, id)
        .await?
        .iter()
        .map(|r| r.recommender_user_id)
        .collect();
    eligible_recommenders(&state.pool, &recommender_ids).await?;

    let membership_type =
        MembershipTypeRepo::find_by_id(&state.pool, application.membership_type_id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "MembershipType",
                id: application.membership_type_id,
            }))?;

    let started_on = today();
    let plan = ApprovalPlan {
        reviewed_by: admin.account_id,
        review_notes: input.review_notes,
        started_on,
        admission_fee_cents: membership_type.admission_fee_cents,
        admission_due_date: started_on + Duration::days(DEFAULT_PAYMENT_TERM_DAYS),
    };

    let outcome = ApplicationRepo::approve(&state.pool, id, &plan)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Conflict(not_pending_message(id))))?;

    tracing::info!(
        application_id = id,
        membership_id = outcome.membership.id,
        membership_code = %outcome.membership.code,
        admission_bill = ?outcome.admission_bill.as_ref().map(|b| b.id),
        approved_by = admin.account_id,
        "Membership application approved"
    );

    Ok(Json(DataResponse {
        data: ApprovalResponse {
            application: outcome.application,
            membership: outcome.membership,
            titular: outcome.titular,
            admission_bill: outcome.admission_bill,
        },
    }))
}

/// POST /api/v1/membership-applications/{id}/reject
pub async fn reject_application(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    body: Option<Json<ReviewRequest>>,
) -> AppResult<Json<DataResponse<MembershipApplication>>> {
    let input = body.map(|Json(review)| review).unwrap_or_default();
    find_pending(&state.pool, id).await?;

    let application = ApplicationRepo::reject(
        &state.pool,
        id,
        admin.account_id,
        input.review_notes.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::Core(CoreError::Conflict(not_pending_message(id))))?;

    tracing::info!(
        application_id = id,
        rejected_by = admin.account_id,
        "Membership application rejected"
    );
    Ok(Json(DataResponse { data: application }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load and validate recommenders, reporting unknown ids first.
async fn eligible_recommenders(
    pool: &DbPool,
    user_ids: &[DbId],
) -> AppResult<Vec<RecommenderSnapshot>> {
    let snapshots = ApplicationRepo::recommender_snapshots(pool, user_ids).await?;

    let missing: Vec<String> = user_ids
        .iter()
        .filter(|id| !snapshots.iter().any(|s| s.user_id == **id))
        .map(|id| id.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Unknown recommender user id(s): {}; {REQUIRED_RECOMMENDERS} existing members are required",
            missing.join(", ")
        ))));
    }

    let config = ClubConfigRepo::get(pool).await?;
    validate_recommenders(&snapshots, config.min_recommender_months, today())?;
    Ok(snapshots)
}

async fn load_detail(pool: &DbPool, id: DbId) -> AppResult<ApplicationDetail> {
    ApplicationRepo::find_detail(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "MembershipApplication",
            id,
        }))
}

async fn find_pending(pool: &DbPool, id: DbId) -> AppResult<MembershipApplication> {
    let application = ApplicationRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "MembershipApplication",
            id,
        }))?;
    if application.status_id != RequestStatus::Pending.id() {
        return Err(AppError::Core(CoreError::Conflict(not_pending_message(id))));
    }
    Ok(application)
}

fn not_pending_message(id: DbId) -> String {
    format!("Application {id} is no longer pending")
}
