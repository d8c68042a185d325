//! Handlers for the `/events` resource and event inscriptions.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use clubhouse_core::billing::{DEFAULT_PAYMENT_TERM_DAYS, KIND_EVENT};
use clubhouse_core::error::CoreError;
use clubhouse_core::membership::ensure_active;
use clubhouse_core::status::EventStatus;
use clubhouse_core::types::{DbId, Timestamp};
use clubhouse_db::models::bill::{NewBill, NewBillDetail};
use clubhouse_db::models::event::{
    CreateEvent, Event, EventInscription, EventListParams, EventSummary, UpdateEvent,
};
use clubhouse_db::repositories::{ClubConfigRepo, EventRepo, InscriptionRepo};
use clubhouse_db::DbPool;
use serde::Serialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::access::{linked_user, load_membership, membership_state, today};
use crate::handlers::spaces::find_space;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireStaff;
use crate::query::page;
use crate::response::DataResponse;
use crate::state::AppState;

/// Result of cancelling an event.
#[derive(Debug, Serialize)]
pub struct CancelledEvent {
    pub event: Event,
    pub cancelled_inscriptions: u64,
}

/// GET /api/v1/events
pub async fn list_events(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(params): Query<EventListParams>,
) -> AppResult<Json<DataResponse<Vec<EventSummary>>>> {
    let (limit, offset) = page(params.limit, params.offset);
    let events = EventRepo::list(&state.pool, &params, limit, offset).await?;
    Ok(Json(DataResponse { data: events }))
}

/// GET /api/v1/events/{id}
pub async fn get_event(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<EventSummary>>> {
    let summary = find_summary(&state.pool, id).await?;
    Ok(Json(DataResponse { data: summary }))
}

/// POST /api/v1/events
pub async fn create_event(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Json(input): Json<CreateEvent>,
) -> AppResult<(StatusCode, Json<DataResponse<Event>>)> {
    input.validate()?;
    ensure_times(input.starts_at, input.ends_at)?;
    if input.starts_at <= Utc::now() {
        return Err(AppError::Core(CoreError::Validation(
            "starts_at must be in the future".into(),
        )));
    }
    if let Some(space_id) = input.space_id {
        find_space(&state.pool, space_id).await?;
    }

    let event = EventRepo::create(&state.pool, &input, staff.account_id).await?;
    tracing::info!(event_id = event.id, created_by = staff.account_id, "Event created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: event })))
}

/// PUT /api/v1/events/{id}
///
/// Only scheduled events can change; capacity cannot drop below the
/// current inscriptions.
pub async fn update_event(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateEvent>,
) -> AppResult<Json<DataResponse<Event>>> {
    input.validate()?;
    let current = find_summary(&state.pool, id).await?;
    ensure_scheduled(&current.event)?;

    ensure_times(
        input.starts_at.unwrap_or(current.event.starts_at),
        input.ends_at.unwrap_or(current.event.ends_at),
    )?;
    if let Some(capacity) = input.capacity {
        if (capacity as i64) < current.inscribed {
            return Err(AppError::Core(CoreError::Conflict(format!(
                "Capacity {capacity} is below the {} current inscription(s)",
                current.inscribed
            ))));
        }
    }
    if let Some(space_id) = input.space_id {
        find_space(&state.pool, space_id).await?;
    }

    let event = EventRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Event", id }))?;
    Ok(Json(DataResponse { data: event }))
}

/// POST /api/v1/events/{id}/cancel
///
/// Cancels the event, removes every inscription and cancels their bills.
pub async fn cancel_event(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<CancelledEvent>>> {
    let current = find_event(&state.pool, id).await?;
    ensure_scheduled(&current)?;

    let config = ClubConfigRepo::get(&state.pool).await?;
    let (event, cancelled_inscriptions) =
        EventRepo::cancel(&state.pool, id, config.devolution_rate_percent)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::Conflict(format!("Event {id} is already cancelled")))
            })?;

    tracing::info!(
        event_id = id,
        cancelled_inscriptions,
        cancelled_by = staff.account_id,
        "Event cancelled"
    );
    Ok(Json(DataResponse {
        data: CancelledEvent {
            event,
            cancelled_inscriptions,
        },
    }))
}

/// GET /api/v1/events/{id}/inscriptions
pub async fn list_inscriptions(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<EventInscription>>>> {
    find_event(&state.pool, id).await?;
    let inscriptions = InscriptionRepo::list_for_event(&state.pool, id).await?;
    Ok(Json(DataResponse { data: inscriptions }))
}

/// POST /api/v1/events/{id}/inscriptions
///
/// Enroll the caller. A priced event issues an event bill to the caller's
/// membership.
pub async fn inscribe(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<(StatusCode, Json<DataResponse<EventInscription>>)> {
    let event = find_event(&state.pool, id).await?;
    ensure_scheduled(&event)?;
    if event.starts_at <= Utc::now() {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Event '{}' has already started",
            event.title
        ))));
    }

    let user = linked_user(&state.pool, &auth).await?;
    let membership_id = user.membership_id.ok_or_else(|| {
        AppError::Core(CoreError::Forbidden(
            "Account does not belong to a membership".into(),
        ))
    })?;
    let membership = load_membership(&state.pool, membership_id).await?;
    ensure_active(membership_state(&membership)?)?;

    if InscriptionRepo::find_event_inscription(&state.pool, id, user.id)
        .await?
        .is_some()
    {
        return Err(AppError::Core(CoreError::Conflict(
            "You are already inscribed in this event".into(),
        )));
    }

    let charge = (event.price_cents > 0).then(|| {
        let issued_on = today();
        (
            NewBill {
                membership_id,
                kind: KIND_EVENT.to_string(),
                period: None,
                issued_on,
                due_date: issued_on + Duration::days(DEFAULT_PAYMENT_TERM_DAYS),
                notes: None,
            },
            NewBillDetail {
                description: format!("Inscription to {} ({})", event.title, user.full_name()),
                quantity: 1,
                unit_price_cents: event.price_cents,
                discount_percent: 0,
                amount_cents: event.price_cents,
            },
        )
    });

    let inscription =
        InscriptionRepo::add_to_event(&state.pool, id, user.id, membership_id, event.capacity, charge)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::Conflict(format!(
                    "Capacity of {} has been reached",
                    event.capacity
                )))
            })?;

    tracing::info!(
        event_id = id,
        user_id = user.id,
        bill_id = ?inscription.bill_id,
        "Event inscription created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: inscription })))
}

/// DELETE /api/v1/events/{id}/inscriptions
///
/// Withdraw the caller from the event; the inscription bill is cancelled.
pub async fn withdraw(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let event = find_event(&state.pool, id).await?;
    ensure_scheduled(&event)?;

    let user = linked_user(&state.pool, &auth).await?;
    let inscription = InscriptionRepo::find_event_inscription(&state.pool, id, user.id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "You are not inscribed in this event".into(),
            ))
        })?;

    let config = ClubConfigRepo::get(&state.pool).await?;
    let removed = InscriptionRepo::cancel_event_inscription(
        &state.pool,
        inscription.id,
        config.devolution_rate_percent,
    )
    .await?;
    if !removed {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "EventInscription",
            id: inscription.id,
        }));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_event(pool: &DbPool, id: DbId) -> AppResult<Event> {
    EventRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Event", id }))
}

async fn find_summary(pool: &DbPool, id: DbId) -> AppResult<EventSummary> {
    EventRepo::find_summary(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Event", id }))
}

fn ensure_scheduled(event: &Event) -> AppResult<()> {
    if event.status_id != EventStatus::Scheduled.id() {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Event '{}' is cancelled",
            event.title
        ))));
    }
    Ok(())
}

fn ensure_times(starts_at: Timestamp, ends_at: Timestamp) -> AppResult<()> {
    if starts_at >= ends_at {
        return Err(AppError::Core(CoreError::Validation(
            "starts_at must be before ends_at".into(),
        )));
    }
    Ok(())
}
