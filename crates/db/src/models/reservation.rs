//! Reservation and reservation inscription models and DTOs.

use chrono::{NaiveDate, NaiveTime};
use clubhouse_core::status::StatusId;
use clubhouse_core::types::{Cents, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `reservations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Reservation {
    pub id: DbId,
    pub space_id: DbId,
    pub membership_id: DbId,
    pub reserved_by: DbId,
    pub reservation_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status_id: StatusId,
    pub total_cents: Cents,
    pub bill_id: Option<DbId>,
    pub notes: Option<String>,
    pub cancelled_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `reservation_inscriptions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReservationInscription {
    pub id: DbId,
    pub reservation_id: DbId,
    pub user_id: Option<DbId>,
    pub guest_name: Option<String>,
    pub guest_document: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for creating a reservation.
///
/// `reserved_by` is only honoured for staff; members always reserve as
/// themselves.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReservation {
    pub space_id: DbId,
    pub reserved_by: Option<DbId>,
    pub reservation_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Fully resolved reservation ready to insert.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub space_id: DbId,
    pub membership_id: DbId,
    pub reserved_by: DbId,
    pub reservation_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub total_cents: Cents,
    pub notes: Option<String>,
}

/// DTO for adding an inscription: a registered user or a guest.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateInscription {
    pub user_id: Option<DbId>,
    #[validate(length(min = 1, max = 200))]
    pub guest_name: Option<String>,
    #[validate(length(max = 20))]
    pub guest_document: Option<String>,
}

/// Query filter for reservation listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationListParams {
    pub space_id: Option<DbId>,
    pub membership_id: Option<DbId>,
    pub date: Option<NaiveDate>,
    pub status_id: Option<StatusId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
