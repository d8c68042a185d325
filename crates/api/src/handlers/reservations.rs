//! Handlers for the `/reservations` resource and its inscriptions.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use clubhouse_core::billing::{is_delinquent, DEFAULT_PAYMENT_TERM_DAYS, KIND_RESERVATION};
use clubhouse_core::error::CoreError;
use clubhouse_core::membership::ensure_active;
use clubhouse_core::reservation::{
    can_cancel, reservation_total_cents, validate_date, validate_inscription_target,
    validate_slot, SpaceHours,
};
use clubhouse_core::status::ReservationStatus;
use clubhouse_core::types::DbId;
use clubhouse_db::models::bill::{NewBill, NewBillDetail};
use clubhouse_db::models::reservation::{
    CreateInscription, CreateReservation, NewReservation, Reservation, ReservationInscription,
    ReservationListParams,
};
use clubhouse_db::repositories::{
    BillRepo, ClubConfigRepo, InscriptionRepo, ReservationRepo, UserRepo,
};
use clubhouse_db::DbPool;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::access::{
    ensure_membership_access, linked_user, load_membership, membership_state, own_membership_id,
    today,
};
use crate::handlers::spaces::find_space;
use crate::handlers::users::find_user;
use crate::middleware::auth::AuthUser;
use crate::query::page;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/reservations
///
/// Members reserve as themselves; staff reserve on behalf of `reserved_by`.
/// A priced slot issues a reservation bill in the same transaction.
pub async fn create_reservation(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateReservation>,
) -> AppResult<(StatusCode, Json<DataResponse<Reservation>>)> {
    input.validate()?;

    // 1. Resolve who is reserving.
    let reserver = if auth.is_staff() {
        let user_id = input.reserved_by.ok_or_else(|| {
            AppError::Core(CoreError::Validation("reserved_by is required".into()))
        })?;
        find_user(&state.pool, user_id).await?
    } else {
        linked_user(&state.pool, &auth).await?
    };
    let membership_id = reserver.membership_id.ok_or_else(|| {
        AppError::Core(CoreError::Validation(format!(
            "User {} does not belong to a membership",
            reserver.id
        )))
    })?;

    // 2. Membership must be active and in good standing.
    let config = ClubConfigRepo::get(&state.pool).await?;
    let membership = load_membership(&state.pool, membership_id).await?;
    ensure_active(membership_state(&membership)?)?;
    let overdue = BillRepo::count_overdue(&state.pool, membership_id).await?;
    if is_delinquent(overdue, config.delinquency_threshold) {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Membership {} is delinquent with {overdue} overdue bill(s)",
            membership.code
        ))));
    }

    // 3. Space and slot.
    let space = find_space(&state.pool, input.space_id).await?;
    if !space.is_active {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Space '{}' is not available for reservations",
            space.name
        ))));
    }
    validate_date(input.reservation_date, today())?;
    validate_slot(
        input.start_time,
        input.end_time,
        SpaceHours {
            opens_at: space.opens_at,
            closes_at: space.closes_at,
            max_hours: config.max_reservation_hours,
        },
    )?;

    let total_cents =
        reservation_total_cents(space.price_per_hour_cents, input.start_time, input.end_time);

    let charge = (total_cents > 0).then(|| {
        let issued_on = today();
        (
            NewBill {
                membership_id,
                kind: KIND_RESERVATION.to_string(),
                period: None,
                issued_on,
                due_date: issued_on + Duration::days(DEFAULT_PAYMENT_TERM_DAYS),
                notes: None,
            },
            NewBillDetail {
                description: format!(
                    "Reservation of {} on {} {}-{}",
                    space.name,
                    input.reservation_date,
                    input.start_time.format("%H:%M"),
                    input.end_time.format("%H:%M")
                ),
                quantity: 1,
                unit_price_cents: total_cents,
                discount_percent: 0,
                amount_cents: total_cents,
            },
        )
    });

    let new_reservation = NewReservation {
        space_id: space.id,
        membership_id,
        reserved_by: reserver.id,
        reservation_date: input.reservation_date,
        start_time: input.start_time,
        end_time: input.end_time,
        total_cents,
        notes: input.notes.clone(),
    };

    let reservation = ReservationRepo::create(&state.pool, &new_reservation, charge)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "Time slot overlaps an existing reservation".into(),
            ))
        })?;

    tracing::info!(
        reservation_id = reservation.id,
        space_id = space.id,
        membership_id,
        bill_id = ?reservation.bill_id,
        "Reservation created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: reservation })))
}

/// GET /api/v1/reservations
///
/// Members only see their own membership's reservations.
pub async fn list_reservations(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ReservationListParams>,
) -> AppResult<Json<DataResponse<Vec<Reservation>>>> {
    let (limit, offset) = page(params.limit, params.offset);
    let params = if auth.is_staff() {
        params
    } else {
        ReservationListParams {
            membership_id: Some(own_membership_id(&state.pool, &auth).await?),
            ..params
        }
    };
    let reservations = ReservationRepo::list(&state.pool, &params, limit, offset).await?;
    Ok(Json(DataResponse { data: reservations }))
}

/// GET /api/v1/reservations/{id}
pub async fn get_reservation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Reservation>>> {
    let reservation = find_reservation(&state.pool, id).await?;
    ensure_membership_access(&state.pool, &auth, reservation.membership_id).await?;
    Ok(Json(DataResponse { data: reservation }))
}

/// POST /api/v1/reservations/{id}/cancel
///
/// Inside the notice window only staff may cancel. The linked bill is
/// cancelled too, with devolution when it was already paid.
pub async fn cancel_reservation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Reservation>>> {
    let reservation = find_reservation(&state.pool, id).await?;
    ensure_membership_access(&state.pool, &auth, reservation.membership_id).await?;
    ensure_confirmed(&reservation)?;

    let config = ClubConfigRepo::get(&state.pool).await?;
    if !auth.is_staff() {
        let starts_at = reservation.reservation_date.and_time(reservation.start_time);
        if !can_cancel(starts_at, Utc::now().naive_utc(), config.reservation_cancel_hours) {
            return Err(AppError::Core(CoreError::Forbidden(format!(
                "Reservations can only be cancelled at least {} hour(s) in advance",
                config.reservation_cancel_hours
            ))));
        }
    }

    let cancelled = ReservationRepo::cancel(&state.pool, id, config.devolution_rate_percent)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(format!(
                "Reservation {id} is already cancelled"
            )))
        })?;

    tracing::info!(
        reservation_id = id,
        cancelled_by = auth.account_id,
        "Reservation cancelled"
    );
    Ok(Json(DataResponse { data: cancelled }))
}

/// GET /api/v1/reservations/{id}/inscriptions
pub async fn list_inscriptions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ReservationInscription>>>> {
    let reservation = find_reservation(&state.pool, id).await?;
    ensure_membership_access(&state.pool, &auth, reservation.membership_id).await?;

    let inscriptions = InscriptionRepo::list_for_reservation(&state.pool, id).await?;
    Ok(Json(DataResponse { data: inscriptions }))
}

/// POST /api/v1/reservations/{id}/inscriptions
///
/// Register a member (`user_id`) or a guest (`guest_name`), up to the
/// space capacity.
pub async fn add_inscription(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<CreateInscription>,
) -> AppResult<(StatusCode, Json<DataResponse<ReservationInscription>>)> {
    input.validate()?;
    validate_inscription_target(input.user_id, input.guest_name.as_deref())?;

    let reservation = find_reservation(&state.pool, id).await?;
    ensure_membership_access(&state.pool, &auth, reservation.membership_id).await?;
    ensure_confirmed(&reservation)?;

    if let Some(user_id) = input.user_id {
        if UserRepo::find_by_id(&state.pool, user_id).await?.is_none() {
            return Err(AppError::Core(CoreError::Validation(format!(
                "User {user_id} does not exist"
            ))));
        }
    }

    let space = find_space(&state.pool, reservation.space_id).await?;
    let inscription = InscriptionRepo::add_to_reservation(&state.pool, id, space.capacity, &input)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(format!(
                "Capacity of {} has been reached",
                space.capacity
            )))
        })?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: inscription })))
}

/// DELETE /api/v1/reservations/{id}/inscriptions/{inscription_id}
pub async fn remove_inscription(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, inscription_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    let reservation = find_reservation(&state.pool, id).await?;
    ensure_membership_access(&state.pool, &auth, reservation.membership_id).await?;

    let removed = InscriptionRepo::remove_from_reservation(&state.pool, id, inscription_id).await?;
    if !removed {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "ReservationInscription",
            id: inscription_id,
        }));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_reservation(pool: &DbPool, id: DbId) -> AppResult<Reservation> {
    ReservationRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Reservation",
            id,
        }))
}

fn ensure_confirmed(reservation: &Reservation) -> AppResult<()> {
    if reservation.status_id != ReservationStatus::Confirmed.id() {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Reservation {} is cancelled",
            reservation.id
        ))));
    }
    Ok(())
}
