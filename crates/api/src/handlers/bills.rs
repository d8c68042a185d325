//! Handlers for the `/bills` resource.
//!
//! Writes are staff-only. Members can read bills of their own membership.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Duration;
use clubhouse_core::billing::{
    due_date, ensure_cancellable, ensure_editable, ensure_payable, line_amount, period_start,
    validate_kind, DEFAULT_PAYMENT_TERM_DAYS, KIND_OTHER,
};
use clubhouse_core::error::CoreError;
use clubhouse_core::types::DbId;
use clubhouse_db::models::bill::{
    Bill, BillListParams, BillWithDetails, CancelBill, CreateBill, CreateBillDetail,
    GenerateBills, GenerationSummary, NewBill, NewBillDetail, PayBill,
};
use clubhouse_db::repositories::bill_repo::MonthlyRun;
use clubhouse_db::repositories::{BillRepo, ClubConfigRepo};
use clubhouse_db::DbPool;
use validator::Validate;

use crate::background::billing_sweep::{self, SweepReport};
use crate::error::{AppError, AppResult};
use crate::handlers::access::{
    ensure_membership_access, load_membership, own_membership_id, today,
};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireStaff;
use crate::query::page;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/bills/generate
///
/// Issue the monthly fee bill of `period` for every billable membership
/// that does not have one yet.
pub async fn generate_monthly(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Json(input): Json<GenerateBills>,
) -> AppResult<Json<DataResponse<GenerationSummary>>> {
    let config = ClubConfigRepo::get(&state.pool).await?;
    let period = period_start(input.period);

    let run = MonthlyRun {
        period,
        issued_on: today(),
        due_date: due_date(period, config.due_day_of_month),
        suspended_fee_percent: config.suspended_fee_percent,
    };
    let summary = BillRepo::generate_monthly(&state.pool, &run).await?;

    tracing::info!(
        period = %period,
        created = summary.created,
        skipped = summary.skipped,
        run_by = staff.account_id,
        "Monthly bills generated"
    );
    Ok(Json(DataResponse { data: summary }))
}

/// POST /api/v1/bills
///
/// Issue a manual bill. Line amounts are computed here; totals are
/// aggregated by the repository.
pub async fn create_bill(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Json(input): Json<CreateBill>,
) -> AppResult<(StatusCode, Json<DataResponse<BillWithDetails>>)> {
    input.validate()?;

    let kind = input.kind.as_deref().unwrap_or(KIND_OTHER);
    validate_kind(kind)?;

    let issued_on = today();
    let due = input
        .due_date
        .unwrap_or(issued_on + Duration::days(DEFAULT_PAYMENT_TERM_DAYS));
    if due < issued_on {
        return Err(AppError::Core(CoreError::Validation(
            "due_date must not be in the past".into(),
        )));
    }

    load_membership(&state.pool, input.membership_id).await?;

    let details = input
        .details
        .iter()
        .map(new_detail)
        .collect::<AppResult<Vec<_>>>()?;

    let header = NewBill {
        membership_id: input.membership_id,
        kind: kind.to_string(),
        period: None,
        issued_on,
        due_date: due,
        notes: input.notes.clone(),
    };
    let bill = BillRepo::create(&state.pool, &header, &details).await?;
    tracing::info!(
        bill_id = bill.id,
        membership_id = bill.membership_id,
        kind = %bill.kind,
        total_cents = bill.total_cents,
        "Bill issued"
    );

    let bill = load_with_details(&state.pool, bill.id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: bill })))
}

/// GET /api/v1/bills
///
/// Members are restricted to their own membership.
pub async fn list_bills(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<BillListParams>,
) -> AppResult<Json<DataResponse<Vec<Bill>>>> {
    let (limit, offset) = page(params.limit, params.offset);
    let params = if auth.is_staff() {
        params
    } else {
        BillListParams {
            membership_id: Some(own_membership_id(&state.pool, &auth).await?),
            ..params
        }
    };
    let bills = BillRepo::list(&state.pool, &params, limit, offset).await?;
    Ok(Json(DataResponse { data: bills }))
}

/// GET /api/v1/bills/{id}
pub async fn get_bill(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BillWithDetails>>> {
    let bill = load_with_details(&state.pool, id).await?;
    ensure_membership_access(&state.pool, &auth, bill.bill.membership_id).await?;
    Ok(Json(DataResponse { data: bill }))
}

/// POST /api/v1/bills/{id}/details
pub async fn add_detail(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Path(id): Path<DbId>,
    Json(input): Json<CreateBillDetail>,
) -> AppResult<(StatusCode, Json<DataResponse<BillWithDetails>>)> {
    input.validate()?;
    let bill = find_bill(&state.pool, id).await?;
    ensure_editable(bill.status_id)?;

    let detail = new_detail(&input)?;
    let config = ClubConfigRepo::get(&state.pool).await?;
    BillRepo::add_detail(&state.pool, id, &detail, config.mora_rate_percent)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Conflict(not_editable_message(id))))?;

    let bill = load_with_details(&state.pool, id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: bill })))
}

/// DELETE /api/v1/bills/{id}/details/{detail_id}
pub async fn delete_detail(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Path((id, detail_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<BillWithDetails>>> {
    let bill = find_bill(&state.pool, id).await?;
    ensure_editable(bill.status_id)?;

    let config = ClubConfigRepo::get(&state.pool).await?;
    BillRepo::delete_detail(&state.pool, id, detail_id, config.mora_rate_percent)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "BillDetail",
            id: detail_id,
        }))?;

    let bill = load_with_details(&state.pool, id).await?;
    Ok(Json(DataResponse { data: bill }))
}

/// POST /api/v1/bills/{id}/recalculate
pub async fn recalculate(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BillWithDetails>>> {
    let bill = find_bill(&state.pool, id).await?;
    ensure_editable(bill.status_id)?;

    let config = ClubConfigRepo::get(&state.pool).await?;
    BillRepo::recalculate(&state.pool, id, config.mora_rate_percent)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Conflict(not_editable_message(id))))?;

    let bill = load_with_details(&state.pool, id).await?;
    Ok(Json(DataResponse { data: bill }))
}

/// POST /api/v1/bills/{id}/pay
pub async fn pay_bill(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<DbId>,
    Json(input): Json<PayBill>,
) -> AppResult<Json<DataResponse<Bill>>> {
    input.validate()?;
    let bill = find_bill(&state.pool, id).await?;
    ensure_payable(bill.status_id)?;

    let paid = BillRepo::pay(&state.pool, id, &input)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(format!(
                "Bill {id} changed status and cannot be paid"
            )))
        })?;

    tracing::info!(
        bill_id = id,
        total_cents = paid.total_cents,
        method = %input.payment_method,
        recorded_by = staff.account_id,
        "Bill paid"
    );
    Ok(Json(DataResponse { data: paid }))
}

/// POST /api/v1/bills/{id}/cancel
///
/// Paid bills record a devolution at the configured rate.
pub async fn cancel_bill(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<DbId>,
    Json(input): Json<CancelBill>,
) -> AppResult<Json<DataResponse<Bill>>> {
    input.validate()?;
    let bill = find_bill(&state.pool, id).await?;
    ensure_cancellable(bill.status_id)?;

    let config = ClubConfigRepo::get(&state.pool).await?;
    let cancelled = BillRepo::cancel(
        &state.pool,
        id,
        input.reason.trim(),
        config.devolution_rate_percent,
    )
    .await?
    .ok_or_else(|| {
        AppError::Core(CoreError::Conflict(format!("Bill {id} is already cancelled")))
    })?;

    tracing::info!(
        bill_id = id,
        devolution_cents = cancelled.devolution_cents,
        cancelled_by = staff.account_id,
        "Bill cancelled"
    );
    Ok(Json(DataResponse { data: cancelled }))
}

/// POST /api/v1/bills/mark-overdue
///
/// Run the billing sweep now instead of waiting for the background task.
pub async fn run_sweep(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
) -> AppResult<Json<DataResponse<SweepReport>>> {
    let report = billing_sweep::sweep_once(&state.pool).await?;
    Ok(Json(DataResponse { data: report }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_detail(input: &CreateBillDetail) -> AppResult<NewBillDetail> {
    let quantity = input.quantity.unwrap_or(1);
    let discount_percent = input.discount_percent.unwrap_or(0);
    let amount = line_amount(quantity, input.unit_price_cents, discount_percent)?;
    Ok(NewBillDetail {
        description: input.description.trim().to_string(),
        quantity,
        unit_price_cents: input.unit_price_cents,
        discount_percent,
        amount_cents: amount.net,
    })
}

async fn find_bill(pool: &DbPool, id: DbId) -> AppResult<Bill> {
    BillRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Bill", id }))
}

async fn load_with_details(pool: &DbPool, id: DbId) -> AppResult<BillWithDetails> {
    BillRepo::find_with_details(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Bill", id }))
}

fn not_editable_message(id: DbId) -> String {
    format!("Bill {id} can no longer be modified")
}
